//! Debugger session: process ownership and command framing

pub mod command;
mod driver;
pub mod framing;
mod process;

pub use command::{AccessMode, DebuggerCommand, WatchpointSpec};
pub use driver::SessionDriver;
pub use process::{DebuggerProcess, ProcessState};

#[cfg(test)]
pub(crate) mod mock;
