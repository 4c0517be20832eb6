//! Test harness: one debugger session, many isolated tests
//!
//! A run resolves breakpoints, starts the debugger and loads the firmware,
//! then executes every test in order. The target is reset after each test
//! whatever its outcome, and the debugger is shut down once at the end.
//! Losing the session (process death or a framing timeout) stops the run;
//! the remaining tests are reported as skipped.

mod case;
mod report;
mod state;

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::time::Instant;

use futures_util::FutureExt;
use tracing::Instrument;

use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::controller::{parse, ExecutionController};
use crate::session::{DebuggerCommand, SessionDriver};
use crate::symbols::{BreakpointTable, SymbolResolver};

pub use case::{ensure, TestCase, TestContext};
pub use report::{RunReport, TestOutcome, TestResult};
pub use state::HarnessState;

/// Build artifacts a run needs
#[derive(Debug, Clone)]
pub struct Artifacts {
    /// Assembler listing with breakpoint labels
    pub listing: PathBuf,
    /// Map file correlating addresses with listing lines
    pub map: PathBuf,
    /// Firmware image loaded by the prelude
    pub program: PathBuf,
}

impl Artifacts {
    /// Fail with the first artifact that does not exist
    pub fn verify(&self) -> Result<()> {
        for path in [&self.listing, &self.map, &self.program] {
            if !path.exists() {
                return Err(Error::ArtifactMissing { path: path.clone() });
            }
        }
        Ok(())
    }
}

/// What to prepare before the first test
#[derive(Debug, Clone)]
pub struct HarnessSetup {
    pub artifacts: Artifacts,
    /// Debugger settings sent before the program is loaded
    pub prelude: String,
    /// Breakpoint labels the tests refer to
    pub breakpoints: Vec<String>,
}

/// Runs a list of tests against one debugger session
pub struct TestHarness {
    config: Config,
    setup: HarnessSetup,
    state: HarnessState,
}

impl TestHarness {
    pub fn new(config: Config, setup: HarnessSetup) -> Self {
        Self {
            config,
            setup,
            state: HarnessState::Uninitialized,
        }
    }

    pub fn state(&self) -> HarnessState {
        self.state
    }

    /// Run all tests, starting the configured debugger
    pub async fn run(&mut self, tests: &[Box<dyn TestCase>]) -> Result<RunReport> {
        let table = self.prepare()?;
        let driver = match SessionDriver::start(&self.config).await {
            Ok(driver) => driver,
            Err(e) => {
                self.state.advance(HarnessState::Aborted)?;
                return Err(e);
            }
        };
        self.run_session(driver, table, tests).await
    }

    /// Run all tests on a session that is already up
    pub async fn run_with_driver(
        &mut self,
        driver: SessionDriver,
        tests: &[Box<dyn TestCase>],
    ) -> Result<RunReport> {
        let table = self.prepare()?;
        self.run_session(driver, table, tests).await
    }

    /// Check artifacts and resolve breakpoints before any process exists
    fn prepare(&mut self) -> Result<BreakpointTable> {
        self.state.advance(HarnessState::Initializing)?;
        tracing::info!(
            listing = %self.setup.artifacts.listing.display(),
            map = %self.setup.artifacts.map.display(),
            "Resolving breakpoints"
        );

        let resolved = self.setup.artifacts.verify().and_then(|()| {
            SymbolResolver::new(&self.config.symbols.region_tag).resolve_files(
                &self.setup.artifacts.listing,
                &self.setup.artifacts.map,
                &self.setup.breakpoints,
            )
        });

        if resolved.is_err() {
            self.state.advance(HarnessState::Aborted)?;
        }
        resolved
    }

    async fn run_session(
        &mut self,
        driver: SessionDriver,
        table: BreakpointTable,
        tests: &[Box<dyn TestCase>],
    ) -> Result<RunReport> {
        let mut controller = ExecutionController::new(driver, &self.config.debugger.reset_target);

        if let Err(e) = self.load_program(&mut controller).await {
            controller.driver_mut().kill().await;
            self.state.advance(HarnessState::Aborted)?;
            return Err(e);
        }
        self.state.advance(HarnessState::Ready)?;

        let mut report = RunReport::default();
        for test in tests {
            if report.aborted.is_some() {
                report.results.push(TestResult::new(
                    test.name(),
                    test.description(),
                    TestOutcome::Skipped,
                    Default::default(),
                ));
                continue;
            }

            self.state.advance(HarnessState::RunningTest)?;
            let span = tracing::info_span!("test", name = test.name());
            let (result, lost) = run_one(&mut controller, &table, test.as_ref())
                .instrument(span)
                .await;
            report.results.push(result);

            match lost {
                None => self.state.advance(HarnessState::Ready)?,
                Some(reason) => {
                    tracing::error!(%reason, "Session lost, skipping remaining tests");
                    controller.driver_mut().kill().await;
                    self.state.advance(HarnessState::Aborted)?;
                    report.aborted = Some(reason);
                }
            }
        }

        if report.aborted.is_none() {
            self.state.advance(HarnessState::ShuttingDown)?;
            match controller.driver_mut().shutdown().await {
                Ok(code) => {
                    report.exit_code = code;
                    self.state.advance(HarnessState::Terminated)?;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Debugger shutdown failed");
                    report.aborted = Some(format!("Shutdown failed: {}", e));
                    self.state.advance(HarnessState::Aborted)?;
                }
            }
        }

        tracing::info!(
            passed = report.passed_count(),
            failed = report.failed_count(),
            skipped = report.skipped_count(),
            "Run finished"
        );
        Ok(report)
    }

    /// Send the prelude and load the firmware in one command
    async fn load_program(&self, controller: &mut ExecutionController) -> Result<()> {
        let script = prelude_script(&self.setup.prelude, &self.setup.artifacts.program);
        let deadline = self.config.timeouts.startup();
        let lines = controller
            .driver_mut()
            .execute_with_timeout(&script, deadline)
            .await?;

        if !parse::program_loaded(&lines) {
            return Err(Error::Initialization {
                message: format!(
                    "Couldn't load program '{}'",
                    self.setup.artifacts.program.display()
                ),
                output: lines.concat(),
            });
        }
        tracing::info!(program = %self.setup.artifacts.program.display(), "Program loaded");
        Ok(())
    }
}

fn prelude_script(prelude: &str, program: &Path) -> String {
    let load = DebuggerCommand::Program(program.to_path_buf()).to_string();
    let prelude = prelude.trim();
    if prelude.is_empty() {
        load
    } else {
        format!("{}\n{}", prelude, load)
    }
}

/// Run one test and reset the target afterwards
///
/// Returns the result and, when the session can no longer be used, the
/// reason. A panicking test counts as failed and is still followed by the
/// reset. A fatal error skips the reset since the stream is unusable.
async fn run_one(
    controller: &mut ExecutionController,
    table: &BreakpointTable,
    test: &dyn TestCase,
) -> (TestResult, Option<String>) {
    tracing::info!("Running test");

    let started = Instant::now();
    let outcome = {
        let mut ctx = TestContext {
            controller: &mut *controller,
            breakpoints: table,
        };
        AssertUnwindSafe(test.run(&mut ctx)).catch_unwind().await
    };
    let elapsed = started.elapsed();

    let mut lost = None;
    let outcome = match outcome {
        Ok(Ok(())) => {
            tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "Test passed");
            TestOutcome::Passed
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Test failed");
            if e.is_fatal() {
                lost = Some(e.to_string());
            }
            TestOutcome::from_error(&e)
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(%message, "Test panicked");
            TestOutcome::Failed {
                code: "TEST_PANICKED".to_string(),
                message: format!("Test panicked: {}", message),
                output: None,
            }
        }
    };

    if lost.is_none() {
        if let Err(e) = controller.reset_and_halt().await {
            tracing::error!(error = %e, "Reset after test failed");
            lost = Some(format!("Reset failed: {}", e));
        }
    }

    (
        TestResult::new(test.name(), test.description(), outcome, elapsed),
        lost,
    )
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
