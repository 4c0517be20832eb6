//! Response framing over the debugger's unstructured stdout
//!
//! The debugger has no message framing, so every command is followed by an
//! `echo` of a fixed marker. The debugger prints it back as `/*MARKER*/`,
//! optionally behind its `>` prompt. A line ends the response only when,
//! with the terminator, leading prompt characters and surrounding
//! whitespace removed, it equals that text exactly.

use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use super::command::DebuggerCommand;

/// Marker echoed after every synchronous command
pub const SENTINEL_MARKER: &str = "MDB_HARNESS_SYNC_5E1F7A";

/// Completion detector for one session
#[derive(Debug, Clone)]
pub struct Sentinel {
    marker: String,
    echoed: String,
}

impl Default for Sentinel {
    fn default() -> Self {
        Self::new(SENTINEL_MARKER)
    }
}

impl Sentinel {
    pub fn new(marker: &str) -> Self {
        Self {
            marker: marker.to_string(),
            echoed: format!("/*{}*/", marker),
        }
    }

    /// The command appended after each request
    pub fn command(&self) -> DebuggerCommand {
        DebuggerCommand::Echo(self.marker.clone())
    }

    /// Text the debugger prints for the echo command
    pub fn echoed(&self) -> &str {
        &self.echoed
    }

    pub fn matches(&self, line: &str) -> bool {
        line.trim_end_matches(['\n', '\r'])
            .trim_start_matches('>')
            .trim()
            == self.echoed
    }
}

/// How reading a response ended
#[derive(Debug, PartialEq, Eq)]
pub enum FrameEnd {
    /// The sentinel line was seen
    Sentinel,
    /// The stream closed first
    Eof,
}

/// Read lines into `lines` until the sentinel line or end of stream
///
/// Lines keep their terminators. The sentinel itself is not stored. Output
/// is decoded lossily since simulator output may contain stray bytes.
pub async fn read_frame<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    sentinel: &Sentinel,
    lines: &mut Vec<String>,
) -> io::Result<FrameEnd> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let bytes_read = reader.read_until(b'\n', &mut buf).await?;
        if bytes_read == 0 {
            return Ok(FrameEnd::Eof);
        }

        let line = String::from_utf8_lossy(&buf).into_owned();
        tracing::trace!(line = line.trim_end(), "debugger >>>");

        if sentinel.matches(&line) {
            return Ok(FrameEnd::Sentinel);
        }
        lines.push(line);
    }
}
