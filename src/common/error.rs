//! Error types for the test harness
//!
//! Every failure that comes from interpreting debugger output carries the
//! raw output so a failed test report shows what the debugger actually said.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === Session Errors ===
    #[error("Debugger failed to start: {0}")]
    Startup(String),

    #[error("Debugger process is dead (exit code {})", fmt_code(.code))]
    ProcessDead { code: Option<i32> },

    #[error("No completion marker from debugger after {timeout_ms} ms; session is out of sync")]
    ProtocolTimeout { timeout_ms: u64, output: String },

    // === Symbol Resolution Errors ===
    #[error("Label \"{name}\" is defined multiple times (lines {first} and {second})")]
    DuplicateLabel {
        name: String,
        first: usize,
        second: usize,
    },

    #[error("Breakpoints not found in map file: {}", .names.join(", "))]
    UnresolvedBreakpoint { names: Vec<String> },

    #[error("Breakpoint \"{name}\" is ambiguous: {detail}")]
    AmbiguousBreakpoint { name: String, detail: String },

    // === Execution Errors ===
    #[error("Timeout reached after {timeout_ms} ms while waiting for a breakpoint")]
    RunTimeout { timeout_ms: u64, output: String },

    #[error("Symbol does not exist: {name}")]
    SymbolNotFound { name: String, output: String },

    #[error("Failed to set watchpoint '{spec}'")]
    Watchpoint { spec: String, output: String },

    #[error("Invalid stimulus file: {path}")]
    InvalidStimulus { path: String, output: String },

    #[error("Unexpected debugger output for '{command}'")]
    UnexpectedOutput { command: String, output: String },

    // === Harness Errors ===
    #[error("Initialization failed: {message}")]
    Initialization { message: String, output: String },

    #[error("Required artifact '{}' does not exist", .path.display())]
    ArtifactMissing { path: PathBuf },

    #[error("Test assertion failed: {0}")]
    TestAssertion(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

fn fmt_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "unknown".to_string(), |c| c.to_string())
}

impl Error {
    /// Create a file read error
    pub fn file_read(path: &std::path::Path, error: io::Error) -> Self {
        Self::FileRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }

    /// Create an unexpected output error from raw lines
    pub fn unexpected_output(command: &str, lines: &[String]) -> Self {
        Self::UnexpectedOutput {
            command: command.to_string(),
            output: lines.concat(),
        }
    }

    /// Stable machine-readable code for reports
    pub fn code(&self) -> &'static str {
        match self {
            Error::Startup(_) => "STARTUP_ERROR",
            Error::ProcessDead { .. } => "PROCESS_DEAD",
            Error::ProtocolTimeout { .. } => "PROTOCOL_TIMEOUT",
            Error::DuplicateLabel { .. } => "DUPLICATE_LABEL",
            Error::UnresolvedBreakpoint { .. } => "UNRESOLVED_BREAKPOINT",
            Error::AmbiguousBreakpoint { .. } => "AMBIGUOUS_BREAKPOINT",
            Error::RunTimeout { .. } => "RUN_TIMEOUT",
            Error::SymbolNotFound { .. } => "SYMBOL_NOT_FOUND",
            Error::Watchpoint { .. } => "WATCHPOINT_ERROR",
            Error::InvalidStimulus { .. } => "INVALID_STIMULUS",
            Error::UnexpectedOutput { .. } => "UNEXPECTED_OUTPUT",
            Error::Initialization { .. } => "INITIALIZATION_ERROR",
            Error::ArtifactMissing { .. } => "ARTIFACT_MISSING",
            Error::TestAssertion(_) => "TEST_FAILED",
            Error::Config(_) | Error::ConfigParse(_) => "CONFIG_ERROR",
            Error::Io(_) | Error::FileRead { .. } => "IO_ERROR",
            Error::Json(_) => "JSON_ERROR",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the shared session can no longer be trusted after this error
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ProcessDead { .. } | Error::ProtocolTimeout { .. } | Error::Io(_)
        )
    }

    /// Raw debugger output attached to this error, if any
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            Error::ProtocolTimeout { output, .. }
            | Error::RunTimeout { output, .. }
            | Error::SymbolNotFound { output, .. }
            | Error::Watchpoint { output, .. }
            | Error::InvalidStimulus { output, .. }
            | Error::UnexpectedOutput { output, .. }
            | Error::Initialization { output, .. } => Some(output.as_str()),
            _ => None,
        }
    }
}
