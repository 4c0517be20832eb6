//! In-memory debugger double for unit tests
//!
//! Pipes are `tokio::io::duplex` pairs; a responder task answers each
//! command line through a closure and echoes the sentinel back.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

use super::driver::SessionDriver;
use super::process::{DebuggerProcess, ProcessState};

/// Process whose state the test controls
#[derive(Clone)]
pub(crate) struct FakeProcess {
    state: Arc<Mutex<ProcessState>>,
}

impl FakeProcess {
    pub(crate) fn running() -> Self {
        Self {
            state: Arc::new(Mutex::new(ProcessState::Running)),
        }
    }

    pub(crate) fn exit(&self, code: i32) {
        *self.state.lock().unwrap() = ProcessState::Exited(Some(code));
    }

    pub(crate) fn state(&self) -> ProcessState {
        *self.state.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl DebuggerProcess for FakeProcess {
    fn poll_state(&mut self) -> std::io::Result<ProcessState> {
        Ok(self.state())
    }

    /// Gives a responder a moment to act on `quit` before exiting cleanly
    async fn wait(&mut self) -> std::io::Result<Option<i32>> {
        for _ in 0..20 {
            if let ProcessState::Exited(code) = self.state() {
                return Ok(code);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.exit(0);
        Ok(Some(0))
    }

    async fn kill(&mut self) -> std::io::Result<()> {
        self.exit(-9);
        Ok(())
    }
}

/// Every command line the fake debugger received, sentinel echoes excluded
#[derive(Clone, Default)]
pub(crate) struct Transcript(Arc<Mutex<Vec<String>>>);

impl Transcript {
    pub(crate) fn commands(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, command: &str) -> usize {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == command)
            .count()
    }

    fn push(&self, command: &str) {
        self.0.lock().unwrap().push(command.to_string());
    }
}

/// Driver connected to a pair of raw pipes the test drives by hand
pub(crate) fn raw_driver(
    process: FakeProcess,
    timeout: Duration,
) -> (SessionDriver, DuplexStream, DuplexStream) {
    let (client_in, server_in) = tokio::io::duplex(64 * 1024);
    let (server_out, client_out) = tokio::io::duplex(64 * 1024);
    let driver = SessionDriver::from_parts(
        Box::new(process),
        Box::new(client_in),
        Box::new(BufReader::new(client_out)),
        timeout,
    );
    (driver, server_in, server_out)
}

/// Driver talking to a responder that answers each command via `respond`
///
/// `quit` makes the fake process exit with code 0.
pub(crate) fn scripted_driver<F>(respond: F) -> (SessionDriver, FakeProcess, Transcript)
where
    F: FnMut(&str) -> String + Send + 'static,
{
    let process = FakeProcess::running();
    let transcript = Transcript::default();
    let (driver, server_in, server_out) = raw_driver(process.clone(), Duration::from_secs(5));
    tokio::spawn(serve(
        server_in,
        server_out,
        respond,
        process.clone(),
        transcript.clone(),
    ));
    (driver, process, transcript)
}

async fn serve<F>(
    stdin: DuplexStream,
    mut stdout: DuplexStream,
    mut respond: F,
    process: FakeProcess,
    transcript: Transcript,
) where
    F: FnMut(&str) -> String + Send + 'static,
{
    let mut reader = BufReader::new(stdin);
    let mut line = String::new();
    let mut pending = String::new();

    while reader.read_line(&mut line).await.unwrap_or(0) > 0 {
        let command = line.trim();
        if let Some(marker) = command.strip_prefix("echo ") {
            pending.push_str(&format!("/*{}*/\n", marker));
            if stdout.write_all(pending.as_bytes()).await.is_err() {
                break;
            }
            pending.clear();
        } else if command == "quit" {
            transcript.push(command);
            process.exit(0);
            break;
        } else if !command.is_empty() {
            transcript.push(command);
            pending.push_str(&respond(command));
        }
        line.clear();
    }
}
