//! IRC line model.
//!
//! A minimal tokenizer for the RFC 1459 wire form: an optional `:source`
//! prefix, a command, space-separated parameters, and an optional trailing
//! parameter introduced by ` :`.

use std::fmt;

/// One parsed protocol line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Message source (server name or `nick!user@host`), without the colon.
    pub source: Option<String>,
    /// Command word or three-digit numeric, exactly as received.
    pub command: String,
    /// Positional parameters; a trailing parameter is the last entry.
    pub params: Vec<String>,
}

impl Line {
    /// Build an outbound line from a command and parameters.
    pub fn cmd(command: &str, params: &[&str]) -> Self {
        Self {
            source: None,
            command: command.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Parse a raw line, without its CRLF.
    ///
    /// Returns `None` for empty or command-less input; never panics on
    /// malformed lines.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim_end_matches(['\r', '\n']);
        let mut rest = raw;

        let mut source = None;
        if let Some(prefixed) = rest.strip_prefix(':') {
            let (src, tail) = prefixed.split_once(' ')?;
            source = Some(src.to_string());
            rest = tail.trim_start_matches(' ');
        }

        if rest.is_empty() {
            return None;
        }

        let (command, mut tail) = match rest.split_once(' ') {
            Some((command, tail)) => (command.to_string(), tail),
            None => (rest.to_string(), ""),
        };

        let mut params = Vec::new();
        loop {
            tail = tail.trim_start_matches(' ');
            if tail.is_empty() {
                break;
            }
            if let Some(trailing) = tail.strip_prefix(':') {
                params.push(trailing.to_string());
                break;
            }
            match tail.split_once(' ') {
                Some((param, next)) => {
                    params.push(param.to_string());
                    tail = next;
                }
                None => {
                    params.push(tail.to_string());
                    break;
                }
            }
        }

        Some(Self {
            source,
            command,
            params,
        })
    }

    /// Nickname component of the source, if any.
    pub fn source_nick(&self) -> Option<&str> {
        self.source.as_deref().and_then(|s| s.split('!').next())
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(source) = &self.source {
            write!(f, ":{source} ")?;
        }
        write!(f, "{}", self.command)?;
        let last = self.params.len().saturating_sub(1);
        for (i, param) in self.params.iter().enumerate() {
            if i == last && (param.is_empty() || param.contains(' ') || param.starts_with(':')) {
                write!(f, " :{param}")?;
            } else {
                write!(f, " {param}")?;
            }
        }
        Ok(())
    }
}
