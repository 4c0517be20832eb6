//! Lifecycle handle for the debugger child process

use std::io;

use async_trait::async_trait;
use tokio::process::Child;

/// Observed state of the debugger process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    /// Exited, with its exit code when it had one
    Exited(Option<i32>),
}

/// The parts of a child process the driver needs besides its pipes
#[async_trait]
pub trait DebuggerProcess: Send {
    /// Check for exit without blocking
    fn poll_state(&mut self) -> io::Result<ProcessState>;

    /// Block until the process exits and return its exit code
    async fn wait(&mut self) -> io::Result<Option<i32>>;

    /// Force the process to terminate
    async fn kill(&mut self) -> io::Result<()>;
}

#[async_trait]
impl DebuggerProcess for Child {
    fn poll_state(&mut self) -> io::Result<ProcessState> {
        Ok(match self.try_wait()? {
            Some(status) => ProcessState::Exited(status.code()),
            None => ProcessState::Running,
        })
    }

    async fn wait(&mut self) -> io::Result<Option<i32>> {
        Child::wait(self).await.map(|status| status.code())
    }

    async fn kill(&mut self) -> io::Result<()> {
        Child::kill(self).await
    }
}
