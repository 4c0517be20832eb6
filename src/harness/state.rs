//! Harness lifecycle states

use serde::Serialize;

use crate::common::{Error, Result};

/// Where a harness is in its single run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HarnessState {
    Uninitialized,
    Initializing,
    Ready,
    RunningTest,
    ShuttingDown,
    Terminated,
    /// The session was lost or never came up; no further commands are sent
    Aborted,
}

impl HarnessState {
    pub fn can_transition_to(self, next: HarnessState) -> bool {
        use HarnessState::{
            Aborted, Initializing, Ready, RunningTest, ShuttingDown, Terminated, Uninitialized,
        };
        matches!(
            (self, next),
            (Uninitialized, Initializing)
                | (Initializing, Ready)
                | (Initializing, Aborted)
                | (Ready, RunningTest)
                | (RunningTest, Ready)
                | (RunningTest, Aborted)
                | (Ready, ShuttingDown)
                | (ShuttingDown, Terminated)
                | (ShuttingDown, Aborted)
        )
    }

    /// Move to `next`, refusing transitions the lifecycle does not allow
    pub(super) fn advance(&mut self, next: HarnessState) -> Result<()> {
        if !self.can_transition_to(next) {
            return Err(Error::Internal(format!(
                "Invalid harness transition {:?} -> {:?}",
                self, next
            )));
        }
        tracing::trace!(from = ?self, to = ?next, "Harness state");
        *self = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_lifecycle() {
        let mut state = HarnessState::Uninitialized;
        for next in [
            HarnessState::Initializing,
            HarnessState::Ready,
            HarnessState::RunningTest,
            HarnessState::Ready,
            HarnessState::RunningTest,
            HarnessState::Ready,
            HarnessState::ShuttingDown,
            HarnessState::Terminated,
        ] {
            state.advance(next).unwrap();
        }
        assert_eq!(state, HarnessState::Terminated);
    }

    #[test]
    fn test_single_use() {
        let mut state = HarnessState::Terminated;
        assert!(state.advance(HarnessState::Initializing).is_err());
        assert_eq!(state, HarnessState::Terminated);
    }

    #[test]
    fn test_no_test_after_shutdown_starts() {
        assert!(!HarnessState::ShuttingDown.can_transition_to(HarnessState::RunningTest));
        assert!(!HarnessState::RunningTest.can_transition_to(HarnessState::ShuttingDown));
    }
}
