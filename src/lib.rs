//! mdb-harness - firmware tests driven through the MPLAB debugger
//!
//! This library drives the debugger's command line over pipes, resolves
//! breakpoint labels from build artifacts, and runs isolated tests on a
//! single simulator session.

pub mod cli;
pub mod commands;
pub mod common;
pub mod controller;
pub mod harness;
pub mod session;
pub mod symbols;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use harness::{RunReport, TestHarness, TestOutcome};
