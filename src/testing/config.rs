//! Test suite configuration types
//!
//! Defines the data structures for deserializing YAML test suites.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::common::paths::resolve_relative;
use crate::common::{Error, Result};
use crate::harness::{Artifacts, HarnessSetup};
use crate::session::{AccessMode, WatchpointSpec};

/// A complete test suite loaded from a YAML file
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct TestSuite {
    /// Name of the suite
    pub name: String,
    /// Optional description of what the suite covers
    pub description: Option<String>,
    /// Build outputs of the firmware under test
    pub artifacts: ArtifactPaths,
    /// Debugger commands sent before the program is loaded
    #[serde(default)]
    pub prelude: String,
    /// Labels to resolve before the debugger starts
    #[serde(default)]
    pub breakpoints: Vec<String>,
    /// Tests, run in order against one session
    pub tests: Vec<TestScenario>,
}

/// Artifact locations, relative to the suite file unless absolute
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ArtifactPaths {
    pub listing: PathBuf,
    pub map: PathBuf,
    pub program: PathBuf,
}

/// One test of a suite
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct TestScenario {
    pub name: String,
    pub description: Option<String>,
    pub steps: Vec<TestStep>,
}

/// A single test step in the execution flow
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case", deny_unknown_fields)]
pub enum TestStep {
    /// Add a breakpoint at a named label
    Break { at: String },
    /// Replace all breakpoints with one at a named label
    OnlyBreak { at: String },
    /// Remove all breakpoints
    ClearBreaks,
    /// Run or continue, optionally expecting a halt at a named breakpoint
    Run {
        /// Wait bound in milliseconds (default: `timeouts.run_default_ms`)
        timeout_ms: Option<u64>,
        /// Breakpoint name the target must halt at
        expect: Option<String>,
    },
    /// Read a variable and optionally compare it
    Read {
        name: String,
        /// Word size in bytes (default: 1)
        #[serde(default = "default_word_size")]
        size: u8,
        expect: Option<i64>,
    },
    /// Set a data watchpoint
    Watch {
        target: String,
        access: AccessMode,
        value: Option<i64>,
    },
    /// Attach a stimulus file, or detach with no path
    Stim { path: Option<PathBuf> },
    Step,
    Next,
    Stepi {
        #[serde(default = "default_instruction_count")]
        count: u32,
    },
    /// Read the stopwatch and check it against bounds
    Stopwatch { min: Option<u64>, max: Option<u64> },
    /// Send a raw debugger command
    Command {
        command: String,
        /// Expected substring in the output
        output_contains: Option<String>,
    },
}

fn default_word_size() -> u8 {
    1
}

fn default_instruction_count() -> u32 {
    1
}

impl TestStep {
    /// Watchpoint this step sets, if it is a `watch` step
    pub fn watchpoint(&self) -> Option<WatchpointSpec> {
        match self {
            TestStep::Watch {
                target,
                access,
                value,
            } => {
                let spec = WatchpointSpec::new(target.clone(), *access);
                Some(match value {
                    Some(v) => spec.with_value(*v),
                    None => spec,
                })
            }
            _ => None,
        }
    }
}

impl TestSuite {
    /// Load a suite and anchor its relative paths at the suite's directory
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
        let mut suite: TestSuite = serde_yaml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse test suite '{}': {}",
                path.display(),
                e
            ))
        })?;

        let base = path.parent().unwrap_or(Path::new("."));
        suite.anchor_paths(base);
        Ok(suite)
    }

    fn anchor_paths(&mut self, base: &Path) {
        let artifacts = &mut self.artifacts;
        artifacts.listing = resolve_relative(base, &artifacts.listing);
        artifacts.map = resolve_relative(base, &artifacts.map);
        artifacts.program = resolve_relative(base, &artifacts.program);

        for step in self.tests.iter_mut().flat_map(|t| t.steps.iter_mut()) {
            if let TestStep::Stim { path: Some(stim) } = step {
                *stim = resolve_relative(base, stim);
            }
        }
    }

    /// Harness setup for this suite
    pub fn harness_setup(&self) -> HarnessSetup {
        HarnessSetup {
            artifacts: Artifacts {
                listing: self.artifacts.listing.clone(),
                map: self.artifacts.map.clone(),
                program: self.artifacts.program.clone(),
            },
            prelude: self.prelude.clone(),
            breakpoints: self.breakpoints.clone(),
        }
    }
}
