//! Combination executor - runs the step sequence for one matrix cell

use crate::core::config::ServiceConfig;
use crate::core::guard;
use crate::core::matrix::Combination;
use crate::core::outcome::{RunResult, StepOutcome, StepStatus};
use crate::core::step::{FailurePolicy, Step};
use crate::execution::action::ActionRunner;
use crate::execution::cancel::CancelToken;
use crate::execution::service::{ServiceManager, ServiceProvider};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Executes all steps of a single combination.
///
/// Each combination gets its own execution context: its own service
/// instances and its own outcome list. Nothing here is shared for
/// mutation across concurrent combinations.
pub struct CombinationExecutor {
    runner: Arc<dyn ActionRunner>,
    services: ServiceManager,
}

impl CombinationExecutor {
    pub fn new(runner: Arc<dyn ActionRunner>, provider: Arc<dyn ServiceProvider>) -> Self {
        Self {
            runner,
            services: ServiceManager::new(provider),
        }
    }

    /// Run every step in declaration order for this combination.
    ///
    /// Services are acquired up front (guard-gated) and released on
    /// every exit path. The cancellation token is checked between
    /// steps only; a running action is never aborted mid-flight.
    pub async fn run(
        &self,
        combination: Combination,
        steps: &[Step],
        services: &[ServiceConfig],
        cancel: &CancelToken,
    ) -> RunResult {
        let started_at = Utc::now();
        info!("Running combination [{}]", combination.label());

        let mut outcomes: Vec<StepOutcome> = Vec::with_capacity(steps.len());
        let env = combination.env_vars();

        let handles = match self.services.acquire_all(services, &combination).await {
            Ok(handles) => handles,
            Err(err) => {
                // Isolated to this combination; the rest of the matrix
                // keeps running.
                warn!(
                    "Combination [{}] failed during service startup: {}",
                    combination.label(),
                    err
                );
                outcomes.push(StepOutcome::failure(
                    &format!("service:{}", err.service_name()),
                    err.to_string(),
                    Vec::new(),
                ));
                return RunResult {
                    combination,
                    outcomes,
                    cancelled: false,
                    started_at,
                    finished_at: Utc::now(),
                };
            }
        };

        let mut cancelled = false;
        for step in steps {
            if cancel.is_cancelled() {
                info!(
                    "Combination [{}] cancelled before step '{}'",
                    combination.label(),
                    step.id
                );
                cancelled = true;
                break;
            }

            if !guard::evaluate(step.guard.as_ref(), &combination) {
                debug!(
                    "Skipping step '{}' for [{}]: guard is false",
                    step.id,
                    combination.label()
                );
                outcomes.push(StepOutcome::skipped(&step.id));
                continue;
            }

            let outcome = self.run_step(step, &env).await;
            let failed = outcome.status == StepStatus::Failure;
            outcomes.push(outcome);

            if failed {
                match step.on_failure {
                    FailurePolicy::AbortPipeline => {
                        warn!(
                            "Step '{}' failed with abort-pipeline; cancelling the run",
                            step.id
                        );
                        cancel.cancel();
                        break;
                    }
                    FailurePolicy::AbortCombination => {
                        warn!(
                            "Step '{}' failed; aborting combination [{}]",
                            step.id,
                            combination.label()
                        );
                        break;
                    }
                    FailurePolicy::Continue => {
                        warn!("Step '{}' failed; continuing per policy", step.id);
                    }
                }
            }
        }

        ServiceManager::release_all(handles).await;

        RunResult {
            combination,
            outcomes,
            cancelled,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Execute a step's actions in order. The first failure decides the
    /// step outcome and the remaining actions are abandoned.
    async fn run_step(&self, step: &Step, env: &BTreeMap<String, String>) -> StepOutcome {
        debug!("Executing step '{}'", step.id);
        let mut artifacts = Vec::new();

        for action in &step.actions {
            match self
                .runner
                .run(&action.run, action.artifact.as_ref(), env)
                .await
            {
                Ok(report) if report.succeeded() => {
                    if let Some(artifact) = report.artifact {
                        artifacts.push(artifact);
                    }
                }
                Ok(report) => {
                    return StepOutcome::failure(
                        &step.id,
                        format!(
                            "action `{}` exited with status {}",
                            action.run, report.exit_code
                        ),
                        artifacts,
                    );
                }
                Err(err) => {
                    return StepOutcome::failure(
                        &step.id,
                        format!("action `{}` could not run: {}", action.run, err),
                        artifacts,
                    );
                }
            }
        }

        StepOutcome::success(&step.id, artifacts)
    }
}
