//! TCP line transport.
//!
//! A thin wrapper over a split tokio `TcpStream`: CRLF-framed lines in and
//! out, raw traffic echoed at `trace` level. Implements the engine's
//! [`CommandSink`] and [`MessageWaiter`] seams; while the engine waits for
//! service replies, keepalives keep being answered here so the connection
//! survives a slow directory listing.

use async_trait::async_trait;
use garnet_engine::{CommandSink, Error as EngineError, MessageWaiter, Wait};
use garnet_proto::{casefold, strip_formatting, Line};
use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::trace;

/// One live server connection.
pub struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Connection {
    /// Connect to `server` (`host:port`).
    pub async fn connect(server: &str) -> std::io::Result<Self> {
        let stream = TcpStream::connect(server).await?;
        let (read, write) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read),
            writer: write,
        })
    }

    /// Read the next parseable line. `Ok(None)` on a clean EOF.
    pub async fn read_line(&mut self) -> std::io::Result<Option<Line>> {
        let mut buf = String::new();
        loop {
            buf.clear();
            let n = self.reader.read_line(&mut buf).await?;
            if n == 0 {
                return Ok(None);
            }
            trace!("< {}", buf.trim_end());
            if let Some(line) = Line::parse(&buf) {
                return Ok(Some(line));
            }
        }
    }

    /// Write one line with CRLF framing.
    pub async fn send_line(&mut self, line: &Line) -> std::io::Result<()> {
        let raw = line.to_string();
        trace!("> {raw}");
        self.writer.write_all(raw.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        Ok(())
    }
}

#[async_trait]
impl CommandSink for Connection {
    async fn send(&mut self, line: Line) -> garnet_engine::Result<()> {
        self.send_line(&line).await?;
        Ok(())
    }
}

#[async_trait]
impl MessageWaiter for Connection {
    async fn wait_for(&mut self, source: &str, patterns: &[&Regex]) -> garnet_engine::Result<Wait> {
        let source = casefold(source);
        loop {
            let Some(line) = self.read_line().await? else {
                return Err(EngineError::TransportClosed("service reply"));
            };
            if line.command == "PING" {
                let params: Vec<&str> = line.params.iter().map(String::as_str).collect();
                self.send_line(&Line::cmd("PONG", &params)).await?;
                continue;
            }
            if line.command != "NOTICE" {
                continue;
            }
            if !line.source_nick().is_some_and(|nick| casefold(nick) == source) {
                continue;
            }
            let Some(text) = line.params.get(1) else {
                continue;
            };
            let text = casefold(&strip_formatting(text));
            if let Some(pattern) = patterns.iter().position(|p| p.is_match(&text)) {
                return Ok(Wait { pattern, text });
            }
        }
    }
}
