//! Step status and process exit codes

use serde::{Deserialize, Serialize};

/// Outcome of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Passed,
    PassedWithWarnings,
    /// Not applicable; counts as ok
    Skipped,
    Failed,
}

impl StepStatus {
    pub fn is_ok(&self) -> bool {
        !matches!(self, StepStatus::Failed)
    }

    /// Tag used in the human matrix
    pub fn label(&self) -> &'static str {
        match self {
            StepStatus::Passed => "PASS",
            StepStatus::PassedWithWarnings => "WARN",
            StepStatus::Skipped => "SKIP",
            StepStatus::Failed => "FAIL",
        }
    }
}

/// Process exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(i32)]
pub enum ExitCode {
    /// Every required step passed
    #[default]
    Success = 0,
    /// Promotion blocked: a required step failed or the gate could not run
    Blocked = 1,
    /// Bad input to a utility command (`compare`, `config`)
    Usage = 2,
}

impl ExitCode {
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExitCode::Success)
    }
}
