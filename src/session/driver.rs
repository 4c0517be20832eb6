//! Synchronous request/response over the debugger's pipes
//!
//! The debugger reads commands on stdin and writes free-form text on
//! stdout. [`SessionDriver::execute`] turns that into one call per command
//! by appending a sentinel echo and collecting output until it comes back.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{ChildStderr, Command};
use tokio::time::timeout;

use crate::common::config::Config;
use crate::common::{Error, Result};

use super::command::DebuggerCommand;
use super::framing::{self, FrameEnd, Sentinel};
use super::process::{DebuggerProcess, ProcessState};

type Writer = Box<dyn AsyncWrite + Unpin + Send>;
type Reader = Box<dyn AsyncBufRead + Unpin + Send>;

/// How long to wait for an exit code after stdout closed unexpectedly
const EXIT_CODE_GRACE: Duration = Duration::from_secs(1);

/// Owner of the debugger process and its pipes
///
/// Only one command can be in flight; `&mut self` on every operation
/// keeps callers serialized.
pub struct SessionDriver {
    process: Box<dyn DebuggerProcess>,
    writer: Writer,
    reader: Reader,
    sentinel: Sentinel,
    command_timeout: Duration,
}

impl SessionDriver {
    /// Spawn the debugger and wait until it accepts commands
    ///
    /// The debugger prints no explicit ready message; the configured marker
    /// is a diagnostic it writes to stderr once its console is up.
    pub async fn start(config: &Config) -> Result<Self> {
        let program = config.debugger_program()?;
        tracing::info!(program = %program.display(), "Starting debugger");

        let mut child = Command::new(&program)
            .args(&config.debugger.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::Startup(format!("Failed to start {}: {}", program.display(), e))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Startup("Failed to get debugger stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Startup("Failed to get debugger stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::Startup("Failed to get debugger stderr".to_string()))?;

        let mut stderr = BufReader::new(stderr);
        let startup = config.timeouts.startup();
        let ready = timeout(
            startup,
            wait_ready(&mut stderr, &config.debugger.ready_marker),
        )
        .await;

        match ready {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = child.kill().await;
                return Err(e);
            }
            Err(_) => {
                let _ = child.kill().await;
                return Err(Error::Startup(format!(
                    "Debugger did not report readiness within {} seconds",
                    startup.as_secs()
                )));
            }
        }

        tracing::debug!(pid = ?child.id(), "Debugger is ready");
        tokio::spawn(drain_stderr(stderr));

        Ok(Self::from_parts(
            Box::new(child),
            Box::new(BufWriter::new(stdin)),
            Box::new(BufReader::new(stdout)),
            config.timeouts.command(),
        ))
    }

    /// Build a driver over already-connected streams
    pub fn from_parts(
        process: Box<dyn DebuggerProcess>,
        writer: Writer,
        reader: Reader,
        command_timeout: Duration,
    ) -> Self {
        Self {
            process,
            writer,
            reader,
            sentinel: Sentinel::default(),
            command_timeout,
        }
    }

    /// Default deadline for a command to complete
    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    /// Whether the debugger process is still running
    pub fn is_alive(&mut self) -> bool {
        matches!(self.process.poll_state(), Ok(ProcessState::Running))
    }

    /// Send a command (possibly several lines) and collect its output
    pub async fn execute(&mut self, command: &str) -> Result<Vec<String>> {
        self.execute_with_timeout(command, self.command_timeout)
            .await
    }

    /// Like [`execute`](Self::execute) with an explicit deadline
    ///
    /// Exceeding the deadline leaves the stream out of sync, so it is
    /// reported as [`Error::ProtocolTimeout`] and the session must be
    /// abandoned.
    pub async fn execute_with_timeout(
        &mut self,
        command: &str,
        deadline: Duration,
    ) -> Result<Vec<String>> {
        self.ensure_alive()?;

        let payload = format!(
            "{}\n{}\n",
            command.trim_end_matches(['\n', '\r']),
            self.sentinel.command()
        );
        tracing::debug!(command = command.trim_end(), "debugger <<<");
        self.write(&payload).await?;

        let mut lines = Vec::new();
        let outcome = timeout(
            deadline,
            framing::read_frame(&mut self.reader, &self.sentinel, &mut lines),
        )
        .await;

        match outcome {
            Ok(Ok(FrameEnd::Sentinel)) => Ok(lines),
            Ok(Ok(FrameEnd::Eof)) => {
                let code = timeout(EXIT_CODE_GRACE, self.process.wait())
                    .await
                    .ok()
                    .and_then(|r| r.ok())
                    .flatten();
                tracing::error!(?code, "Debugger closed its output mid-command");
                Err(Error::ProcessDead { code })
            }
            Ok(Err(e)) => Err(Error::Io(e)),
            Err(_) => Err(Error::ProtocolTimeout {
                timeout_ms: u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
                output: lines.concat(),
            }),
        }
    }

    /// Quit the debugger and wait for it to exit
    ///
    /// No sentinel is sent since the process will not answer it.
    pub async fn shutdown(&mut self) -> Result<Option<i32>> {
        self.ensure_alive()?;
        tracing::debug!("debugger <<< quit");
        self.write(&format!("{}\n", DebuggerCommand::Quit)).await?;
        let code = self.process.wait().await?;
        tracing::info!(?code, "Debugger exited");
        Ok(code)
    }

    /// Terminate the debugger without the quit handshake
    pub async fn kill(&mut self) {
        if let Err(e) = self.process.kill().await {
            tracing::warn!(error = %e, "Failed to kill debugger");
        }
    }

    fn ensure_alive(&mut self) -> Result<()> {
        match self.process.poll_state()? {
            ProcessState::Running => Ok(()),
            ProcessState::Exited(code) => Err(Error::ProcessDead { code }),
        }
    }

    async fn write(&mut self, payload: &str) -> Result<()> {
        self.writer.write_all(payload.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

/// Read stderr until a line containing `marker` appears
async fn wait_ready(stderr: &mut BufReader<ChildStderr>, marker: &str) -> Result<()> {
    let mut line = String::new();
    loop {
        line.clear();
        let bytes_read = stderr.read_line(&mut line).await.map_err(|e| {
            Error::Startup(format!("Failed to read debugger stderr: {}", e))
        })?;

        if bytes_read == 0 {
            return Err(Error::Startup(
                "Debugger closed its error stream before it was ready".to_string(),
            ));
        }

        tracing::debug!(line = line.trim_end(), "debugger stderr");
        if line.contains(marker) {
            return Ok(());
        }
    }
}

/// Keep stderr flowing into the log so the debugger never blocks on it
async fn drain_stderr(mut stderr: BufReader<ChildStderr>) {
    let mut line = String::new();
    loop {
        line.clear();
        match stderr.read_line(&mut line).await {
            Ok(0) | Err(_) => break,
            Ok(_) => tracing::debug!(line = line.trim_end(), "debugger stderr"),
        }
    }
}
