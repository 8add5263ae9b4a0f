//! Node configuration.
//!
//! Loaded from a JSON file when a path is given, or from `GARNET_*`
//! environment variables otherwise. The core only interprets the ban
//! channel prefix/count/capacity; everything else is connection plumbing.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Oper credentials for the post-welcome handshake.
#[derive(Debug, Clone, Deserialize)]
pub struct OperConfig {
    pub name: String,
    pub password: String,
}

/// Configuration for a garnet node.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// Network endpoint, `host:port`.
    pub server: String,

    /// Nickname; also the default username and realname.
    pub nickname: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub realname: Option<String>,

    /// Server password (PASS), if any.
    #[serde(default)]
    pub password: Option<String>,

    /// Channels to sit in besides the ban channels.
    #[serde(default)]
    pub channels: Vec<String>,

    /// Oper credentials; oper-up is skipped when absent.
    #[serde(default)]
    pub oper: Option<OperConfig>,

    /// Ban channel name prefix, e.g. `#garnet-invex-`.
    pub banchan_prefix: String,

    /// Number of pooled ban channels.
    pub banchan_count: usize,

    /// Per-channel ban capacity.
    pub banchan_capacity: usize,

    /// Raw-line template for the operational log; `{message}` is
    /// substituted. Absent means tracing only.
    #[serde(default)]
    pub log: Option<String>,
}

impl NodeConfig {
    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Build from `GARNET_*` environment variables with the same defaults
    /// the file form has.
    pub fn from_env() -> Result<Self> {
        let server = require_env("GARNET_SERVER")?;
        let nickname = require_env("GARNET_NICKNAME")?;

        let channels = std::env::var("GARNET_CHANNELS")
            .map(|s| {
                s.split(',')
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let oper = match (
            std::env::var("GARNET_OPER_NAME").ok(),
            std::env::var("GARNET_OPER_PASSWORD").ok(),
        ) {
            (Some(name), Some(password)) => Some(OperConfig { name, password }),
            _ => None,
        };

        Ok(Self {
            server,
            nickname,
            username: std::env::var("GARNET_USERNAME").ok(),
            realname: std::env::var("GARNET_REALNAME").ok(),
            password: std::env::var("GARNET_PASSWORD").ok(),
            channels,
            oper,
            banchan_prefix: std::env::var("GARNET_BANCHAN_PREFIX")
                .unwrap_or_else(|_| "#garnet-invex-".to_string()),
            banchan_count: parse_env("GARNET_BANCHAN_COUNT", 8)?,
            banchan_capacity: parse_env("GARNET_BANCHAN_CAPACITY", 48)?,
            log: std::env::var("GARNET_LOG").ok(),
        })
    }

    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.nickname)
    }

    pub fn realname(&self) -> &str {
        self.realname.as_deref().unwrap_or(&self.nickname)
    }

    /// Pooled channel names: prefix plus zero-padded index, ascending.
    pub fn ban_channels(&self) -> Vec<String> {
        (0..self.banchan_count)
            .map(|i| format!("{}{:02}", self.banchan_prefix, i))
            .collect()
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| Error::Config(format!("{key} is not set")))
}

fn parse_env(key: &str, default: usize) -> Result<usize> {
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|_| Error::Config(format!("{key} must be a number"))),
        Err(_) => Ok(default),
    }
}
