//! Execution outcome models

use crate::core::matrix::Combination;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of a single step for one combination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// All actions exited zero
    Success,
    /// An action failed (or a required service never became ready)
    Failure,
    /// The step's guard evaluated false for this combination
    Skipped,
}

/// Recorded outcome of one step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Step identifier (or `service:<name>` for a startup failure)
    pub step_id: String,

    pub status: StepStatus,

    /// Error text for failures
    #[serde(default)]
    pub error: Option<String>,

    /// Artifact locations declared by actions that ran to completion
    #[serde(default)]
    pub artifacts: Vec<PathBuf>,
}

impl StepOutcome {
    pub fn skipped(step_id: &str) -> Self {
        Self {
            step_id: step_id.to_string(),
            status: StepStatus::Skipped,
            error: None,
            artifacts: Vec::new(),
        }
    }

    pub fn success(step_id: &str, artifacts: Vec<PathBuf>) -> Self {
        Self {
            step_id: step_id.to_string(),
            status: StepStatus::Success,
            error: None,
            artifacts,
        }
    }

    pub fn failure(step_id: &str, error: String, artifacts: Vec<PathBuf>) -> Self {
        Self {
            step_id: step_id.to_string(),
            status: StepStatus::Failure,
            error: Some(error),
            artifacts,
        }
    }
}

/// Result of running all steps for one combination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub combination: Combination,

    /// Per-step outcomes in step declaration order
    pub outcomes: Vec<StepOutcome>,

    /// Whether the combination was cut short by cooperative
    /// cancellation ("never got to run to completion", distinct from
    /// "broke")
    pub cancelled: bool,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunResult {
    /// Cancelled before any step ran
    pub fn cancelled(combination: Combination) -> Self {
        let now = Utc::now();
        Self {
            combination,
            outcomes: Vec::new(),
            cancelled: true,
            started_at: now,
            finished_at: now,
        }
    }

    /// True iff no step outcome is a failure and the combination was
    /// not cancelled. Skipped steps do not count against success.
    pub fn passed(&self) -> bool {
        !self.cancelled && !self.has_failure()
    }

    pub fn has_failure(&self) -> bool {
        self.outcomes
            .iter()
            .any(|outcome| outcome.status == StepStatus::Failure)
    }

    pub fn elapsed_secs(&self) -> f64 {
        (self.finished_at - self.started_at)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}

/// Overall status of a matrix run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatrixStatus {
    Passed,
    Failed,
    Cancelled,
}

impl MatrixStatus {
    /// Non-zero exit iff the outcome is failure or cancelled
    pub fn exit_code(self) -> i32 {
        match self {
            MatrixStatus::Passed => 0,
            MatrixStatus::Failed | MatrixStatus::Cancelled => 1,
        }
    }
}
