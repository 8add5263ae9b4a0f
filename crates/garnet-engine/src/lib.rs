//! Garnet invex engine
//!
//! The stateful core of garnet: a membership store and a capacity-bounded
//! slot pool, reconciled against the network once at startup and kept
//! consistent per-notification afterwards. Transport is abstracted behind
//! two traits ([`CommandSink`] to emit a line, [`MessageWaiter`] to
//! collect a bounded multi-line reply) so the whole engine runs against
//! in-memory fakes in tests.

mod engine;
mod error;
mod io;

pub use engine::{BootstrapReport, ChannelBans, EngineConfig, InvexEngine};
pub use error::{Error, Result};
pub use io::{CommandSink, MessageWaiter, Wait};
