//! Commands understood by the debugger process
//!
//! Every command the harness issues is built here so the wire spelling of
//! each one lives in a single place. Commands render to a single line
//! without a terminator; [`batch`] joins several into one write.

use std::fmt;
use std::path::PathBuf;

/// Access that triggers a watchpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    /// Break on writes only
    #[serde(alias = "w", alias = "W")]
    Write,
    /// Break on reads and writes
    #[serde(alias = "rw", alias = "RW")]
    ReadWrite,
}

impl AccessMode {
    fn as_wire(self) -> &'static str {
        match self {
            AccessMode::Write => "W",
            AccessMode::ReadWrite => "RW",
        }
    }
}

/// A data breakpoint: target location, access mode and optional trigger value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchpointSpec {
    /// Address or variable name
    pub target: String,
    pub access: AccessMode,
    /// Only break when this value is written/read
    pub value: Option<i64>,
}

impl WatchpointSpec {
    pub fn new(target: impl Into<String>, access: AccessMode) -> Self {
        Self {
            target: target.into(),
            access,
            value: None,
        }
    }

    pub fn with_value(mut self, value: i64) -> Self {
        self.value = Some(value);
        self
    }
}

impl fmt::Display for WatchpointSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.target, self.access.as_wire())?;
        if let Some(value) = self.value {
            write!(f, ":{}", value)?;
        }
        Ok(())
    }
}

/// A single debugger command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebuggerCommand {
    /// Load the firmware image
    Program(PathBuf),
    /// Start execution from reset
    Run,
    /// Resume execution
    Continue,
    /// Block until the target halts or `ms` elapse
    Wait(u64),
    /// Instruction breakpoint at an address
    Break(String),
    /// Remove all breakpoints
    Delete,
    /// Read a variable or address with an explicit word size
    Print { datasize: u8, name: String },
    Watch(WatchpointSpec),
    /// Attach a stimulus file, or detach the current one with `None`
    Stim(Option<String>),
    Halt,
    /// Hardware reset of the given kind (e.g. `MCLR`)
    Reset(String),
    Step,
    Next,
    StepI(u32),
    Stopwatch,
    Quit,
    Echo(String),
    /// Anything else, passed through verbatim
    Raw(String),
}

impl fmt::Display for DebuggerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DebuggerCommand::Program(path) => write!(f, "program \"{}\"", path.display()),
            DebuggerCommand::Run => f.write_str("run"),
            DebuggerCommand::Continue => f.write_str("continue"),
            DebuggerCommand::Wait(ms) => write!(f, "wait {}", ms),
            DebuggerCommand::Break(address) => write!(f, "break *{}", address),
            DebuggerCommand::Delete => f.write_str("delete"),
            DebuggerCommand::Print { datasize, name } => {
                write!(f, "print /datasize:{} {}", datasize, name)
            }
            DebuggerCommand::Watch(spec) => write!(f, "watch {}", spec),
            DebuggerCommand::Stim(Some(path)) => write!(f, "stim \"{}\"", path.trim()),
            DebuggerCommand::Stim(None) => f.write_str("stim"),
            DebuggerCommand::Halt => f.write_str("halt"),
            DebuggerCommand::Reset(target) => write!(f, "reset {}", target),
            DebuggerCommand::Step => f.write_str("step"),
            DebuggerCommand::Next => f.write_str("next"),
            DebuggerCommand::StepI(n) => write!(f, "stepi {}", n),
            DebuggerCommand::Stopwatch => f.write_str("stopwatch"),
            DebuggerCommand::Quit => f.write_str("quit"),
            DebuggerCommand::Echo(text) => write!(f, "echo {}", text),
            DebuggerCommand::Raw(text) => f.write_str(text.trim_end()),
        }
    }
}

/// Join commands into one newline-separated script
pub fn batch(commands: &[DebuggerCommand]) -> String {
    commands
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_spelling() {
        assert_eq!(DebuggerCommand::Break("1FDAA".into()).to_string(), "break *1FDAA");
        assert_eq!(
            DebuggerCommand::Print {
                datasize: 2,
                name: "counter".into()
            }
            .to_string(),
            "print /datasize:2 counter"
        );
        assert_eq!(
            DebuggerCommand::Stim(Some(" input.scl \n".into())).to_string(),
            "stim \"input.scl\""
        );
        assert_eq!(DebuggerCommand::Reset("MCLR".into()).to_string(), "reset MCLR");
    }

    #[test]
    fn test_watchpoint_spec() {
        let spec = WatchpointSpec::new("PORTB", AccessMode::Write);
        assert_eq!(spec.to_string(), "PORTB W");
        let spec = WatchpointSpec::new("0x2F0", AccessMode::ReadWrite).with_value(7);
        assert_eq!(spec.to_string(), "0x2F0 RW:7");
    }

    #[test]
    fn test_batch_is_one_script() {
        let script = batch(&[DebuggerCommand::Continue, DebuggerCommand::Wait(500)]);
        assert_eq!(script, "continue\nwait 500");
    }
}
