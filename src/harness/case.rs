//! Test case interface

use async_trait::async_trait;

use crate::common::{Error, Result};
use crate::controller::ExecutionController;
use crate::symbols::BreakpointTable;

/// What a test body gets to work with
///
/// The controller is shared by every test in the run; the harness resets
/// the target after each test, so a test may leave any state behind.
pub struct TestContext<'a> {
    pub controller: &'a mut ExecutionController,
    pub breakpoints: &'a BreakpointTable,
}

impl TestContext<'_> {
    /// Address of a named breakpoint
    pub fn address_of(&self, name: &str) -> Result<String> {
        self.breakpoints
            .address_of(name)
            .map(str::to_string)
            .ok_or_else(|| Error::TestAssertion(format!("Unknown breakpoint '{}'", name)))
    }

    /// Make `name` the only breakpoint
    pub async fn only_break_at(&mut self, name: &str) -> Result<()> {
        let address = self.address_of(name)?;
        self.controller.set_only_breakpoint(&address).await?;
        Ok(())
    }

    /// Add a breakpoint at `name`
    pub async fn break_at(&mut self, name: &str) -> Result<()> {
        let address = self.address_of(name)?;
        self.controller.set_breakpoint(&address).await?;
        Ok(())
    }

    /// Run until a breakpoint and return its name
    pub async fn run_to_breakpoint(&mut self, timeout_ms: u64) -> Result<String> {
        let address = self
            .controller
            .run_until_breakpoint_or_timeout(timeout_ms)
            .await?;
        self.breakpoints
            .name_of(&address)
            .map(str::to_string)
            .ok_or_else(|| {
                Error::TestAssertion(format!("Halted at unnamed address {}", address))
            })
    }
}

/// One independent test against the shared session
#[async_trait]
pub trait TestCase: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> Option<&str> {
        None
    }

    async fn run(&self, ctx: &mut TestContext<'_>) -> Result<()>;
}

/// Fail the current test with `message` unless `condition` holds
pub fn ensure(condition: bool, message: impl FnOnce() -> String) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(Error::TestAssertion(message()))
    }
}
