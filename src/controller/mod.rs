//! Typed debugging operations on top of the session driver
//!
//! Each operation issues one (possibly multi-line) command and interprets
//! the reply. Nothing is retried here: a timeout or a rejected command is
//! returned to the caller as-is.

pub mod parse;

use std::time::Duration;

use crate::common::{Error, Result};
use crate::session::command::batch;
use crate::session::{DebuggerCommand, SessionDriver, WatchpointSpec};

/// Debugging operations over one session
pub struct ExecutionController {
    driver: SessionDriver,
    /// Set once the target has been started with `run`
    running: bool,
    reset_target: String,
}

impl ExecutionController {
    pub fn new(driver: SessionDriver, reset_target: impl Into<String>) -> Self {
        Self {
            driver,
            running: false,
            reset_target: reset_target.into(),
        }
    }

    /// Whether the next run resumes with `continue`
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn driver_mut(&mut self) -> &mut SessionDriver {
        &mut self.driver
    }

    /// Send a command verbatim and return its output
    pub async fn raw(&mut self, command: &str) -> Result<Vec<String>> {
        self.driver.execute(command).await
    }

    async fn send(&mut self, commands: &[DebuggerCommand]) -> Result<Vec<String>> {
        self.driver.execute(&batch(commands)).await
    }

    /// Run or continue, then wait at most `timeout_ms` for the target to halt
    ///
    /// The wait is part of the same command, so the reply always ends.
    pub async fn run_for(&mut self, timeout_ms: u64) -> Result<Vec<String>> {
        let start = if self.running {
            DebuggerCommand::Continue
        } else {
            DebuggerCommand::Run
        };
        let script = batch(&[start, DebuggerCommand::Wait(timeout_ms)]);
        let deadline = self.driver.command_timeout() + Duration::from_millis(timeout_ms);

        let lines = self.driver.execute_with_timeout(&script, deadline).await?;
        self.running = true;
        Ok(lines)
    }

    /// Run until a breakpoint is hit and return its address
    pub async fn run_until_breakpoint_or_timeout(&mut self, timeout_ms: u64) -> Result<String> {
        let lines = self.run_for(timeout_ms).await?;
        match parse::breakpoint_address(&lines) {
            Some(address) => {
                tracing::debug!(%address, "Breakpoint hit");
                Ok(address)
            }
            None => Err(Error::RunTimeout {
                timeout_ms,
                output: lines.concat(),
            }),
        }
    }

    pub async fn set_breakpoint(&mut self, address: &str) -> Result<Vec<String>> {
        self.send(&[DebuggerCommand::Break(address.to_string())])
            .await
    }

    /// Replace all breakpoints with a single one, in one command
    pub async fn set_only_breakpoint(&mut self, address: &str) -> Result<Vec<String>> {
        self.send(&[
            DebuggerCommand::Delete,
            DebuggerCommand::Break(address.to_string()),
        ])
        .await
    }

    pub async fn clear_breakpoints(&mut self) -> Result<Vec<String>> {
        self.send(&[DebuggerCommand::Delete]).await
    }

    /// Read a variable or address as an integer of `word_size` bytes
    pub async fn read_variable(&mut self, name: &str, word_size: u8) -> Result<i64> {
        let command = DebuggerCommand::Print {
            datasize: word_size,
            name: name.to_string(),
        };
        let wire = command.to_string();
        let lines = self.send(&[command]).await?;
        parse::variable_value(name, &wire, &lines)
    }

    pub async fn set_watchpoint(&mut self, spec: &WatchpointSpec) -> Result<Vec<String>> {
        let lines = self.send(&[DebuggerCommand::Watch(spec.clone())]).await?;
        if parse::watch_rejected(&lines) {
            return Err(Error::Watchpoint {
                spec: spec.to_string(),
                output: lines.concat(),
            });
        }
        Ok(lines)
    }

    pub async fn set_stimulus_file(&mut self, path: &str) -> Result<Vec<String>> {
        let lines = self
            .send(&[DebuggerCommand::Stim(Some(path.to_string()))])
            .await?;
        if parse::stimulus_rejected(&lines) {
            return Err(Error::InvalidStimulus {
                path: path.to_string(),
                output: lines.concat(),
            });
        }
        Ok(lines)
    }

    pub async fn clear_stimulus(&mut self) -> Result<Vec<String>> {
        self.send(&[DebuggerCommand::Stim(None)]).await
    }

    /// Step to the next source line, entering calls
    pub async fn single_step(&mut self) -> Result<Vec<String>> {
        self.send(&[DebuggerCommand::Step]).await
    }

    /// Step to the next source line, treating calls as one step
    pub async fn step_over(&mut self) -> Result<Vec<String>> {
        self.send(&[DebuggerCommand::Next]).await
    }

    pub async fn step_instructions(&mut self, count: u32) -> Result<Vec<String>> {
        self.send(&[DebuggerCommand::StepI(count)]).await
    }

    /// Cycles counted by the simulator stopwatch
    pub async fn read_cycle_count(&mut self) -> Result<u64> {
        let command = DebuggerCommand::Stopwatch;
        let lines = self.send(&[command.clone()]).await?;
        parse::cycle_count(&lines)
            .ok_or_else(|| Error::unexpected_output(&command.to_string(), &lines))
    }

    /// Halt, drop breakpoints and stimulus, and reset the target
    pub async fn reset_and_halt(&mut self) -> Result<Vec<String>> {
        let lines = self
            .send(&[
                DebuggerCommand::Halt,
                DebuggerCommand::Delete,
                DebuggerCommand::Stim(None),
                DebuggerCommand::Reset(self.reset_target.clone()),
            ])
            .await?;
        self.running = false;
        Ok(lines)
    }
}
