//! Test runner implementation
//!
//! Turns suite scenarios into harness test cases. Each step maps onto one
//! controller operation; expectations become assertion failures.

use std::path::Path;

use async_trait::async_trait;

use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::harness::{ensure, RunReport, TestCase, TestContext, TestHarness};

use super::config::{TestScenario, TestStep, TestSuite};

/// A YAML scenario run as one harness test
pub struct ScenarioTest {
    scenario: TestScenario,
    /// Wait bound for `run` steps that give none
    default_run_ms: u64,
}

impl ScenarioTest {
    pub fn new(scenario: TestScenario, default_run_ms: u64) -> Self {
        Self {
            scenario,
            default_run_ms,
        }
    }
}

#[async_trait]
impl TestCase for ScenarioTest {
    fn name(&self) -> &str {
        &self.scenario.name
    }

    fn description(&self) -> Option<&str> {
        self.scenario.description.as_deref()
    }

    async fn run(&self, ctx: &mut TestContext<'_>) -> Result<()> {
        for (i, step) in self.scenario.steps.iter().enumerate() {
            let step_num = i + 1;
            tracing::debug!(step = step_num, ?step, "Executing step");
            execute_step(ctx, step, self.default_run_ms)
                .await
                .map_err(|e| match e {
                    Error::TestAssertion(message) => {
                        Error::TestAssertion(format!("Step {}: {}", step_num, message))
                    }
                    other => other,
                })?;
        }
        Ok(())
    }
}

/// Load a suite file and run every test in it
pub async fn run_suite(path: &Path, config: &Config) -> Result<RunReport> {
    let suite = TestSuite::load(path)?;
    tracing::info!(suite = %suite.name, tests = suite.tests.len(), "Loaded test suite");

    let setup = suite.harness_setup();
    let default_run_ms = config.timeouts.run_default_ms;
    let tests: Vec<Box<dyn TestCase>> = suite
        .tests
        .into_iter()
        .map(|scenario| Box::new(ScenarioTest::new(scenario, default_run_ms)) as Box<dyn TestCase>)
        .collect();

    let mut harness = TestHarness::new(config.clone(), setup);
    harness.run(&tests).await
}

/// Execute a single test step
async fn execute_step(
    ctx: &mut TestContext<'_>,
    step: &TestStep,
    default_run_ms: u64,
) -> Result<()> {
    match step {
        TestStep::Break { at } => ctx.break_at(at).await,
        TestStep::OnlyBreak { at } => ctx.only_break_at(at).await,
        TestStep::ClearBreaks => ctx.controller.clear_breakpoints().await.map(drop),
        TestStep::Run { timeout_ms, expect } => {
            let timeout_ms = timeout_ms.unwrap_or(default_run_ms);
            match expect {
                Some(expected) => {
                    let hit = ctx.run_to_breakpoint(timeout_ms).await?;
                    ensure(&hit == expected, || {
                        format!("Expected halt at '{}', halted at '{}'", expected, hit)
                    })
                }
                None => ctx.controller.run_for(timeout_ms).await.map(drop),
            }
        }
        TestStep::Read { name, size, expect } => {
            let value = ctx.controller.read_variable(name, *size).await?;
            tracing::debug!(%name, value, "Read variable");
            match expect {
                Some(expected) => ensure(value == *expected, || {
                    format!("Expected {} = {}, got {}", name, expected, value)
                }),
                None => Ok(()),
            }
        }
        TestStep::Watch { .. } => {
            let spec = step
                .watchpoint()
                .ok_or_else(|| Error::Internal("watch step without watchpoint".into()))?;
            ctx.controller.set_watchpoint(&spec).await.map(drop)
        }
        TestStep::Stim { path: Some(path) } => ctx
            .controller
            .set_stimulus_file(&path.display().to_string())
            .await
            .map(drop),
        TestStep::Stim { path: None } => ctx.controller.clear_stimulus().await.map(drop),
        TestStep::Step => ctx.controller.single_step().await.map(drop),
        TestStep::Next => ctx.controller.step_over().await.map(drop),
        TestStep::Stepi { count } => ctx.controller.step_instructions(*count).await.map(drop),
        TestStep::Stopwatch { min, max } => {
            let cycles = ctx.controller.read_cycle_count().await?;
            if let Some(min) = min {
                ensure(cycles >= *min, || {
                    format!("Expected at least {} cycles, counted {}", min, cycles)
                })?;
            }
            if let Some(max) = max {
                ensure(cycles <= *max, || {
                    format!("Expected at most {} cycles, counted {}", max, cycles)
                })?;
            }
            Ok(())
        }
        TestStep::Command {
            command,
            output_contains,
        } => {
            let output = ctx.controller.raw(command).await?.concat();
            match output_contains {
                Some(needle) => ensure(output.contains(needle.as_str()), || {
                    format!("Output of '{}' does not contain '{}'", command, needle)
                }),
                None => Ok(()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ExecutionController;
    use crate::session::mock::{scripted_driver, Transcript};
    use crate::symbols::{BreakpointTable, SymbolResolver};

    fn table() -> BreakpointTable {
        SymbolResolver::new("resetVec CODE")
            .resolve(
                "main_loop:\n nop\nisr_done:\n retfie\n",
                "1FD00 resetVec CODE >1:/fw.s\n1FD40 resetVec CODE >3:/fw.s\n",
                &["main_loop".to_string(), "isr_done".to_string()],
            )
            .unwrap()
    }

    fn simulator() -> (ExecutionController, Transcript) {
        let (driver, _process, transcript) = scripted_driver(|cmd| match cmd {
            c if c.starts_with("wait") => "Stop at\n\taddress:0x1fd00\n".to_string(),
            "print /datasize:2 counter" => "counter = 0x10\n".to_string(),
            "stopwatch" => "Stopwatch cycle count = 250 (25 us)\n".to_string(),
            "info" => "PIC18F46K22 simulator\n".to_string(),
            _ => String::new(),
        });
        (ExecutionController::new(driver, "MCLR"), transcript)
    }

    fn scenario(yaml: &str) -> ScenarioTest {
        ScenarioTest::new(serde_yaml::from_str(yaml).unwrap(), 1000)
    }

    async fn run(test: &ScenarioTest) -> (Result<()>, Transcript) {
        let (mut controller, transcript) = simulator();
        let table = table();
        let mut ctx = TestContext {
            controller: &mut controller,
            breakpoints: &table,
        };
        (test.run(&mut ctx).await, transcript)
    }

    #[tokio::test]
    async fn test_passing_scenario() {
        let test = scenario(
            r#"
name: reaches main loop
steps:
  - action: only_break
    at: main_loop
  - action: run
    expect: main_loop
  - action: read
    name: counter
    size: 2
    expect: 16
  - action: stopwatch
    min: 100
    max: 300
  - action: command
    command: info
    output_contains: simulator
"#,
        );
        let (result, transcript) = run(&test).await;
        result.unwrap();
        assert_eq!(
            transcript.commands(),
            vec![
                "delete",
                "break *1FD00",
                "run",
                "wait 1000",
                "print /datasize:2 counter",
                "stopwatch",
                "info"
            ]
        );
    }

    #[tokio::test]
    async fn test_wrong_breakpoint_names_step() {
        let test = scenario(
            r#"
name: expects isr
steps:
  - action: break
    at: isr_done
  - action: run
    timeout_ms: 50
    expect: isr_done
"#,
        );
        let (result, transcript) = run(&test).await;
        match result.unwrap_err() {
            Error::TestAssertion(message) => {
                assert!(message.starts_with("Step 2:"), "{}", message);
                assert!(message.contains("main_loop"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(transcript.count("wait 50"), 1);
    }

    #[tokio::test]
    async fn test_stopwatch_bound() {
        let test = scenario(
            r#"
name: too slow
steps:
  - action: stopwatch
    max: 100
"#,
        );
        let (result, _) = run(&test).await;
        assert!(matches!(result, Err(Error::TestAssertion(_))));
    }

    #[tokio::test]
    async fn test_unknown_breakpoint_fails_before_sending() {
        let test = scenario(
            r#"
name: typo
steps:
  - action: only_break
    at: main_lop
"#,
        );
        let (result, transcript) = run(&test).await;
        assert!(matches!(result, Err(Error::TestAssertion(_))));
        assert!(transcript.commands().is_empty());
    }

    #[tokio::test]
    async fn test_stepping_and_stimulus_steps() {
        let test = scenario(
            r#"
name: steps
steps:
  - action: stim
    path: /tmp/in.scl
  - action: step
  - action: next
  - action: stepi
    count: 4
  - action: stim
  - action: watch
    target: PORTB
    access: read_write
  - action: clear_breaks
"#,
        );
        let (result, transcript) = run(&test).await;
        result.unwrap();
        assert_eq!(
            transcript.commands(),
            vec![
                "stim \"/tmp/in.scl\"",
                "step",
                "next",
                "stepi 4",
                "stim",
                "watch PORTB RW",
                "delete"
            ]
        );
    }
}
