//! Transport seams.
//!
//! The engine emits protocol lines and collects multi-line service replies
//! through these two interfaces. Sockets, framing, reconnects and
//! keepalives all live behind them, which is also what makes the engine
//! testable without a network.

use async_trait::async_trait;
use garnet_proto::Line;
use regex::Regex;

use crate::error::Result;

/// A matched reply from [`MessageWaiter::wait_for`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wait {
    /// Index into the pattern slice that matched.
    pub pattern: usize,
    /// The stripped, casefolded notice text.
    pub text: String,
}

/// Emit one protocol line.
#[async_trait]
pub trait CommandSink {
    /// Send `line` to the network. The engine assumes at-least-eventual
    /// delivery and never retries; a failure here propagates to the
    /// operation that triggered the send.
    async fn send(&mut self, line: Line) -> Result<()>;
}

/// Block until a notice from `source` matches one of `patterns`.
#[async_trait]
pub trait MessageWaiter {
    /// Returns which pattern matched and the stripped, casefolded text.
    ///
    /// Traffic that matches nothing is dropped, not an error; the
    /// transport keeps servicing keepalives while the engine waits.
    async fn wait_for(&mut self, source: &str, patterns: &[&Regex]) -> Result<Wait>;
}
