//! Step domain model

use crate::core::config::{ActionConfig, StepConfig};
use crate::core::guard::Guard;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How a step failure affects the rest of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Halt the whole matrix run: in-flight combinations finish their
    /// current step, no new combinations start. Reserved for failures
    /// that make all further results meaningless.
    AbortPipeline,

    /// Stop processing further steps for this combination only;
    /// already-recorded outcomes are kept.
    AbortCombination,

    /// Record the failure but proceed to the next step (best-effort
    /// diagnostic steps).
    Continue,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::AbortCombination
    }
}

/// An opaque external command with an optionally declared artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    /// Shell command to invoke; the orchestrator observes only its
    /// exit status
    pub run: String,

    /// Declared artifact path (e.g., a coverage file); recorded, never
    /// interpreted by the executor
    pub artifact: Option<PathBuf>,
}

/// A single step in the matrix pipeline
#[derive(Debug, Clone)]
pub struct Step {
    /// Unique step identifier
    pub id: String,

    /// Ordered actions; the first failure decides the step outcome and
    /// abandons the rest
    pub actions: Vec<Action>,

    /// Optional guard; absent means the step runs for every combination
    pub guard: Option<Guard>,

    /// Policy applied when this step fails
    pub on_failure: FailurePolicy,
}

impl Step {
    /// Build a step from its configuration
    pub fn from_config(config: &StepConfig) -> Self {
        let actions = config
            .actions
            .iter()
            .map(|action: &ActionConfig| Action {
                run: action.run.clone(),
                artifact: action.artifact.clone(),
            })
            .collect();

        Step {
            id: config.id.clone(),
            actions,
            guard: config.when.clone(),
            on_failure: config.on_failure,
        }
    }
}
