//! YAML test suites
//!
//! A suite names the firmware artifacts, the debugger prelude and the
//! breakpoints, then lists tests as sequences of steps. Every test runs on
//! the same debugger session through [`crate::harness::TestHarness`].

mod config;
mod runner;

pub use config::*;
pub use runner::{run_suite, ScenarioTest};
