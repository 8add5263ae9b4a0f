//! The garnet node.
//!
//! Startup sequence, ban-list collection, and the dispatch loop. One read
//! loop drives everything: registration replies set up the session, the
//! final end-of-banlist for the pooled channels triggers the engine's
//! bootstrap inline, and channel traffic is classified into notifications
//! for the incremental handlers. Nothing else mutates the engine.

use std::collections::{HashMap, HashSet};

use garnet_engine::{ChannelBans, EngineConfig, InvexEngine};
use garnet_proto::{
    casefold, classify, strip_formatting, Line, RPL_BANLIST, RPL_ENDOFBANLIST, RPL_WELCOME,
    RPL_YOUREOPER,
};
use tracing::{debug, info};

use crate::config::NodeConfig;
use crate::conn::Connection;
use crate::error::{Error, Result};

/// Accumulates 367 replies per pooled channel until each 368 arrives.
#[derive(Debug, Default)]
struct BanListCollector {
    pending: HashMap<String, Vec<String>>,
    complete: HashSet<String>,
}

impl BanListCollector {
    fn record(&mut self, channel: &str, mask: &str) {
        self.pending
            .entry(channel.to_string())
            .or_default()
            .push(mask.to_string());
    }

    /// Mark a channel's list fully known. Returns how many are.
    fn finish(&mut self, channel: &str) -> usize {
        self.pending.entry(channel.to_string()).or_default();
        self.complete.insert(channel.to_string());
        self.complete.len()
    }

    /// Drain into engine input, in `order`.
    fn into_channel_bans(mut self, order: &[String]) -> Vec<ChannelBans> {
        order
            .iter()
            .map(|channel| ChannelBans {
                channel: channel.clone(),
                masks: self.pending.remove(channel).unwrap_or_default(),
            })
            .collect()
    }
}

/// Channel targets on this network start with `#` or `&`.
fn is_channel(target: &str) -> bool {
    target.starts_with('#') || target.starts_with('&')
}

/// A garnet node instance.
pub struct Node {
    config: NodeConfig,
    engine: InvexEngine,
    /// Casefolded pooled channel names, configuration order.
    ban_channels: Vec<String>,
    collector: BanListCollector,
}

impl Node {
    /// Create a node; the engine starts uninitialized until bootstrap.
    pub fn new(config: NodeConfig) -> Self {
        let ban_channels: Vec<String> = config
            .ban_channels()
            .iter()
            .map(|channel| casefold(channel))
            .collect();
        let engine = InvexEngine::new(EngineConfig {
            ban_channels: ban_channels.clone(),
            capacity: config.banchan_capacity,
            log_template: config.log.clone(),
        });
        Self {
            config,
            engine,
            ban_channels,
            collector: BanListCollector::default(),
        }
    }

    /// Connect, register, and run the dispatch loop until the connection
    /// goes away. State is rebuilt from scratch on the next run.
    pub async fn run(mut self) -> Result<()> {
        info!("connecting to {}", self.config.server);
        let mut conn = Connection::connect(&self.config.server).await?;
        self.register(&mut conn).await?;

        loop {
            let Some(line) = conn.read_line().await? else {
                return Err(Error::ConnectionClosed);
            };
            self.handle_line(&mut conn, line).await?;
        }
    }

    async fn register(&self, conn: &mut Connection) -> Result<()> {
        if let Some(password) = &self.config.password {
            conn.send_line(&Line::cmd("PASS", &[password])).await?;
        }
        conn.send_line(&Line::cmd("NICK", &[&self.config.nickname]))
            .await?;
        conn.send_line(&Line::cmd(
            "USER",
            &[self.config.username(), "0", "*", self.config.realname()],
        ))
        .await?;
        Ok(())
    }

    fn is_ban_channel(&self, channel: &str) -> bool {
        self.ban_channels.iter().any(|c| c == channel)
    }

    async fn handle_line(&mut self, conn: &mut Connection, line: Line) -> Result<()> {
        match line.command.as_str() {
            "PING" => {
                let params: Vec<&str> = line.params.iter().map(String::as_str).collect();
                conn.send_line(&Line::cmd("PONG", &params)).await?;
            }
            RPL_WELCOME => self.on_welcome(conn).await?,
            RPL_YOUREOPER => info!("oper privileges granted"),
            RPL_BANLIST => {
                if let (Some(channel), Some(mask)) = (line.params.get(1), line.params.get(2)) {
                    let channel = casefold(channel);
                    if self.is_ban_channel(&channel) {
                        self.collector.record(&channel, mask);
                    }
                }
            }
            RPL_ENDOFBANLIST => {
                if let Some(channel) = line.params.get(1) {
                    let channel = casefold(channel);
                    // Reconciliation runs exactly once; a later re-query
                    // of a ban list must not re-enter it.
                    if self.is_ban_channel(&channel) && !self.engine.is_bootstrapped() {
                        let known = self.collector.finish(&channel);
                        if known == self.ban_channels.len() {
                            self.run_bootstrap(conn).await?;
                        }
                    }
                }
            }
            "PRIVMSG" => self.on_privmsg(conn, &line).await?,
            _ => {}
        }
        Ok(())
    }

    async fn on_welcome(&mut self, conn: &mut Connection) -> Result<()> {
        // Callers-only umbrella mode; service notices still get through.
        conn.send_line(&Line::cmd("MODE", &[&self.config.nickname, "+g"]))
            .await?;
        if let Some(oper) = &self.config.oper {
            conn.send_line(&Line::cmd("OPER", &[&oper.name, &oper.password]))
                .await?;
        }
        for channel in self.config.channels.iter().chain(&self.config.ban_channels()) {
            conn.send_line(&Line::cmd("JOIN", &[channel])).await?;
        }
        // Request the ban lists the pool is sized from.
        for channel in self.config.ban_channels() {
            conn.send_line(&Line::cmd("MODE", &[&channel, "+b"])).await?;
        }
        Ok(())
    }

    async fn run_bootstrap(&mut self, conn: &mut Connection) -> Result<()> {
        info!(
            "ban lists known for all {} pooled channels; reconciling",
            self.ban_channels.len()
        );
        let live =
            std::mem::take(&mut self.collector).into_channel_bans(&self.ban_channels);
        let report = self.engine.bootstrap(conn, &live).await?;
        info!(
            "reconciled: {} added, {} removed, {} unassigned",
            report.added, report.removed, report.unassigned
        );
        Ok(())
    }

    async fn on_privmsg(&mut self, conn: &mut Connection, line: &Line) -> Result<()> {
        let (Some(target), Some(text)) = (line.params.first(), line.params.get(1)) else {
            return Ok(());
        };
        if !is_channel(target) {
            return Ok(());
        }
        let Some(nick) = line.source_nick() else {
            return Ok(());
        };
        if casefold(nick) == casefold(&self.config.nickname) {
            return Ok(());
        }

        let reference = strip_formatting(&format!("{nick} {text}"));
        let Some(notification) = classify(&reference) else {
            return Ok(());
        };
        debug!("dispatching {notification:?}");
        self.engine.handle(conn, notification).await?;
        Ok(())
    }
}
