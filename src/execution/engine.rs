//! Matrix execution engine - schedules combinations and collects results

use crate::core::outcome::RunResult;
use crate::core::plan::MatrixPlan;
use crate::execution::action::ActionRunner;
use crate::execution::cancel::CancelToken;
use crate::execution::executor::CombinationExecutor;
use crate::execution::service::ServiceProvider;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};
use uuid::Uuid;

/// Strategy for scheduling combination execution.
///
/// Correctness holds in every mode: combinations are independent units
/// of work and the aggregator restores canonical order afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulingStrategy {
    /// One combination at a time, in enumeration order
    #[default]
    Sequential,

    /// All combinations concurrently
    Parallel,

    /// At most N combinations concurrently
    LimitedParallel(usize),
}

/// Events that can occur during a matrix run
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    MatrixStarted {
        run_id: Uuid,
        name: String,
        combinations: usize,
    },
    CombinationStarted {
        label: String,
    },
    CombinationFinished {
        label: String,
        passed: bool,
        cancelled: bool,
    },
    MatrixFinished {
        run_id: Uuid,
        passed: usize,
        failed: usize,
        cancelled: usize,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Main matrix execution engine
pub struct MatrixEngine {
    executor: Arc<CombinationExecutor>,
    strategy: SchedulingStrategy,
    handlers: Mutex<Vec<EventHandler>>,
}

impl MatrixEngine {
    pub fn new(
        runner: Arc<dyn ActionRunner>,
        services: Arc<dyn ServiceProvider>,
        strategy: SchedulingStrategy,
    ) -> Self {
        Self {
            executor: Arc::new(CombinationExecutor::new(runner, services)),
            strategy,
            handlers: Mutex::new(Vec::new()),
        }
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        if let Ok(mut handlers) = self.handlers.lock() {
            handlers.push(Arc::new(handler));
        }
    }

    fn emit(&self, event: ExecutionEvent) {
        if let Ok(handlers) = self.handlers.lock() {
            for handler in handlers.iter() {
                handler(event.clone());
            }
        }
    }

    /// Execute every combination in the plan.
    ///
    /// Results come back with one slot per combination, each written
    /// exactly once; combinations that never started after an
    /// abort-pipeline are recorded as cancelled so the final report
    /// still names every cell of the matrix.
    pub async fn execute(&self, plan: &MatrixPlan) -> Result<Vec<RunResult>, String> {
        let run_id = Uuid::new_v4();
        let total = plan.combinations.len();

        info!(
            "Starting matrix run: {} ({} combinations, {:?})",
            plan.name, total, self.strategy
        );
        self.emit(ExecutionEvent::MatrixStarted {
            run_id,
            name: plan.name.clone(),
            combinations: total,
        });

        let cancel = CancelToken::new();
        let mut slots: Vec<Option<RunResult>> = (0..total).map(|_| None).collect();

        match self.strategy {
            SchedulingStrategy::Sequential => {
                self.run_sequential(plan, &cancel, &mut slots).await;
            }
            SchedulingStrategy::Parallel => {
                self.run_parallel(plan, &cancel, &mut slots, None).await?;
            }
            SchedulingStrategy::LimitedParallel(max) => {
                self.run_parallel(plan, &cancel, &mut slots, Some(max.max(1)))
                    .await?;
            }
        }

        let results: Vec<RunResult> = slots
            .into_iter()
            .map(|slot| slot.ok_or_else(|| "combination result slot never filled".to_string()))
            .collect::<Result<_, _>>()?;

        let passed = results.iter().filter(|r| r.passed()).count();
        let cancelled = results.iter().filter(|r| r.cancelled).count();
        let failed = results.iter().filter(|r| r.has_failure()).count();

        info!(
            "Matrix run finished: {} passed, {} failed, {} cancelled",
            passed, failed, cancelled
        );
        self.emit(ExecutionEvent::MatrixFinished {
            run_id,
            passed,
            failed,
            cancelled,
        });

        Ok(results)
    }

    async fn run_sequential(
        &self,
        plan: &MatrixPlan,
        cancel: &CancelToken,
        slots: &mut [Option<RunResult>],
    ) {
        for (idx, combination) in plan.combinations.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!(
                    "Not starting combination [{}]: run cancelled",
                    combination.label()
                );
                slots[idx] = Some(RunResult::cancelled(combination.clone()));
                continue;
            }

            self.emit(ExecutionEvent::CombinationStarted {
                label: combination.label(),
            });

            let result = self
                .executor
                .run(combination.clone(), &plan.steps, &plan.services, cancel)
                .await;

            self.emit(ExecutionEvent::CombinationFinished {
                label: combination.label(),
                passed: result.passed(),
                cancelled: result.cancelled,
            });
            slots[idx] = Some(result);
        }
    }

    async fn run_parallel(
        &self,
        plan: &MatrixPlan,
        cancel: &CancelToken,
        slots: &mut [Option<RunResult>],
        max_workers: Option<usize>,
    ) -> Result<(), String> {
        let shared = Arc::new(plan.clone());
        let semaphore = max_workers.map(|max| Arc::new(Semaphore::new(max)));
        let mut tasks: JoinSet<(usize, RunResult)> = JoinSet::new();

        for (idx, combination) in plan.combinations.iter().cloned().enumerate() {
            let executor = self.executor.clone();
            let shared = shared.clone();
            let cancel = cancel.clone();
            let semaphore = semaphore.clone();

            self.emit(ExecutionEvent::CombinationStarted {
                label: combination.label(),
            });

            tasks.spawn(async move {
                let _permit = match &semaphore {
                    Some(semaphore) => match semaphore.clone().acquire_owned().await {
                        Ok(permit) => Some(permit),
                        Err(_) => return (idx, RunResult::cancelled(combination)),
                    },
                    None => None,
                };

                if cancel.is_cancelled() {
                    return (idx, RunResult::cancelled(combination));
                }

                let result = executor
                    .run(combination, &shared.steps, &shared.services, &cancel)
                    .await;
                (idx, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (idx, result) = joined.map_err(|e| format!("combination task failed: {}", e))?;
            self.emit(ExecutionEvent::CombinationFinished {
                label: result.combination.label(),
                passed: result.passed(),
                cancelled: result.cancelled,
            });
            slots[idx] = Some(result);
        }

        Ok(())
    }
}
