//! Per-test results and the run summary

use std::time::Duration;

use serde::Serialize;

use crate::common::Error;

/// How a single test ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TestOutcome {
    Passed,
    Failed {
        /// Stable error code, see [`Error::code`]
        code: String,
        message: String,
        /// Raw debugger output behind the failure
        #[serde(skip_serializing_if = "Option::is_none")]
        output: Option<String>,
    },
    /// Not run because the session was lost earlier
    Skipped,
}

impl TestOutcome {
    pub fn from_error(error: &Error) -> Self {
        TestOutcome::Failed {
            code: error.code().to_string(),
            message: error.to_string(),
            output: error.raw_output().map(str::to_string),
        }
    }
}

/// Result of one test
#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub outcome: TestOutcome,
    pub duration_ms: u64,
}

impl TestResult {
    pub fn new(
        name: &str,
        description: Option<&str>,
        outcome: TestOutcome,
        duration: Duration,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.map(str::to_string),
            outcome,
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn passed(&self) -> bool {
        self.outcome == TestOutcome::Passed
    }
}

/// Everything a run produced, in test order
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub results: Vec<TestResult>,
    /// Why the run stopped early, if it did
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
    /// Debugger exit code after a clean shutdown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

impl RunReport {
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, TestOutcome::Failed { .. }))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.outcome == TestOutcome::Skipped)
            .count()
    }

    /// True when every test passed and the session ended cleanly
    pub fn success(&self) -> bool {
        self.aborted.is_none() && self.results.iter().all(TestResult::passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_success() {
        let mut report = RunReport::default();
        report.results.push(TestResult::new(
            "a",
            None,
            TestOutcome::Passed,
            Duration::from_millis(3),
        ));
        assert!(report.success());

        let error = Error::RunTimeout {
            timeout_ms: 10,
            output: "Running\n".into(),
        };
        report.results.push(TestResult::new(
            "b",
            Some("waits"),
            TestOutcome::from_error(&error),
            Duration::ZERO,
        ));
        report
            .results
            .push(TestResult::new("c", None, TestOutcome::Skipped, Duration::ZERO));

        assert_eq!(report.passed_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.skipped_count(), 1);
        assert!(!report.success());
    }

    #[test]
    fn test_json_shape() {
        let error = Error::SymbolNotFound {
            name: "x".into(),
            output: "x = Symbol does not exist\n".into(),
        };
        let result = TestResult::new(
            "reads x",
            None,
            TestOutcome::from_error(&error),
            Duration::from_millis(12),
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["outcome"]["status"], "failed");
        assert_eq!(json["outcome"]["code"], "SYMBOL_NOT_FOUND");
        assert_eq!(json["outcome"]["output"], "x = Symbol does not exist\n");
        assert_eq!(json["duration_ms"], 12);
        assert!(json.get("description").is_none());
    }
}
