//! Test utility functions for matrixci

use matrixci::core::config::{MatrixConfig, ServiceConfig};
use matrixci::core::outcome::{MatrixStatus, RunResult, StepOutcome, StepStatus};
use matrixci::core::plan::MatrixPlan;
use matrixci::execution::{
    ActionError, ActionReport, ActionRunner, MatrixEngine, SchedulingStrategy, ServiceBackend,
    ServiceError, ServiceProvider,
};
use matrixci::report::{aggregate, CombinationReport, CombinationStatus, PipelineOutcome};

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Mock runner that fails a configured set of commands and logs every
/// invocation in order
pub struct MockRunner {
    failing: Vec<String>,
    calls: Mutex<Vec<String>>,
}

impl MockRunner {
    /// Commands containing any of the given fragments exit non-zero
    pub fn new(failing: &[&str]) -> Self {
        Self {
            failing: failing.iter().map(|f| f.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn all_passing() -> Self {
        Self::new(&[])
    }

    /// Every command invoked so far, in invocation order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ActionRunner for MockRunner {
    async fn run(
        &self,
        command: &str,
        artifact: Option<&PathBuf>,
        _env: &BTreeMap<String, String>,
    ) -> Result<ActionReport, ActionError> {
        self.calls.lock().unwrap().push(command.to_string());
        let exit_code = if self.failing.iter().any(|f| command.contains(f)) {
            1
        } else {
            0
        };
        Ok(ActionReport {
            exit_code,
            artifact: artifact.cloned(),
        })
    }
}

/// Mock service provider that counts lifecycle calls across every
/// backend it hands out
pub struct MockServices {
    ready: bool,
    starts: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
}

impl MockServices {
    /// Backends whose readiness probe succeeds immediately
    pub fn ready() -> Self {
        Self {
            ready: true,
            starts: Arc::new(AtomicUsize::new(0)),
            stops: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Backends that never become ready (startup timeout path)
    pub fn never_ready() -> Self {
        Self {
            ready: false,
            starts: Arc::new(AtomicUsize::new(0)),
            stops: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

struct MockServiceBackend {
    ready: bool,
    starts: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
}

#[async_trait]
impl ServiceBackend for MockServiceBackend {
    async fn start(&self) -> Result<(), ServiceError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        self.ready
    }

    async fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

impl ServiceProvider for MockServices {
    fn create(&self, _config: &ServiceConfig) -> Arc<dyn ServiceBackend> {
        // Backends share the provider's counters so tests can assert
        // totals across combinations
        Arc::new(MockServiceBackend {
            ready: self.ready,
            starts: self.starts.clone(),
            stops: self.stops.clone(),
        })
    }
}

/// Result of running a whole matrix in a test
pub struct MatrixTestResult {
    pub outcome: PipelineOutcome,
    pub results: Vec<RunResult>,
}

impl MatrixTestResult {
    pub fn is_passed(&self) -> bool {
        self.outcome.status == MatrixStatus::Passed
    }

    pub fn is_failed(&self) -> bool {
        self.outcome.status == MatrixStatus::Failed
    }

    /// Labels in report order
    pub fn labels(&self) -> Vec<String> {
        self.outcome
            .combinations
            .iter()
            .map(|c| c.label.clone())
            .collect()
    }

    /// Report entry for a combination label
    pub fn combination(&self, label: &str) -> &CombinationReport {
        self.outcome
            .combinations
            .iter()
            .find(|c| c.label == label)
            .unwrap_or_else(|| panic!("No combination '{}' in report", label))
    }

    /// Outcome of a step within a combination, if the step ran at all
    pub fn step(&self, label: &str, step_id: &str) -> Option<&StepOutcome> {
        self.combination(label)
            .steps
            .iter()
            .find(|s| s.step_id == step_id)
    }
}

/// Parse a matrix plan from YAML, panicking on invalid input
pub fn plan_from_yaml(yaml: &str) -> MatrixPlan {
    let config = MatrixConfig::from_yaml(yaml)
        .unwrap_or_else(|e| panic!("Failed to parse matrix YAML: {}", e));
    MatrixPlan::from_config(&config)
        .unwrap_or_else(|e| panic!("Failed to build matrix plan: {}", e))
}

/// Run a matrix with explicit runner, services and strategy
pub async fn run_matrix(
    yaml: &str,
    runner: Arc<MockRunner>,
    services: Arc<MockServices>,
    strategy: SchedulingStrategy,
) -> MatrixTestResult {
    let plan = plan_from_yaml(yaml);
    let engine = MatrixEngine::new(runner, services, strategy);
    let results = engine
        .execute(&plan)
        .await
        .expect("matrix execution should not abort");
    let outcome = aggregate(&plan.name, results.clone());
    MatrixTestResult { outcome, results }
}

/// Run a matrix sequentially with a mock runner that fails the given
/// command fragments
pub async fn run_matrix_with_mock(yaml: &str, failing: &[&str]) -> MatrixTestResult {
    run_matrix(
        yaml,
        Arc::new(MockRunner::new(failing)),
        Arc::new(MockServices::ready()),
        SchedulingStrategy::Sequential,
    )
    .await
}

/// Assert the whole matrix passed
pub fn assert_matrix_passed(result: &MatrixTestResult) {
    assert!(
        result.is_passed(),
        "Matrix should have passed:\n{}",
        result.outcome.render_summary()
    );
}

/// Assert the whole matrix failed
pub fn assert_matrix_failed(result: &MatrixTestResult) {
    assert!(
        result.is_failed(),
        "Matrix should have failed:\n{}",
        result.outcome.render_summary()
    );
}

/// Assert a combination finished with the given status
pub fn assert_combination_status(
    result: &MatrixTestResult,
    label: &str,
    expected: CombinationStatus,
) {
    let actual = result.combination(label).status;
    assert_eq!(
        actual, expected,
        "Combination [{}] should be {:?}, was {:?}:\n{}",
        label,
        expected,
        actual,
        result.outcome.render_summary()
    );
}

/// Assert a step's recorded status within a combination
pub fn assert_step_status(
    result: &MatrixTestResult,
    label: &str,
    step_id: &str,
    expected: StepStatus,
) {
    let step = result
        .step(label, step_id)
        .unwrap_or_else(|| panic!("Step '{}' not recorded for [{}]", step_id, label));
    assert_eq!(
        step.status, expected,
        "Step '{}' in [{}] should be {:?}, was {:?} ({:?})",
        step_id, label, expected, step.status, step.error
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
name: "helper test matrix"
axes:
  - name: v
    values: [a, b]
steps:
  - id: tests
    actions:
      - run: "cmd-tests"
"#;

    #[tokio::test]
    async fn test_run_matrix_with_mock_passing() {
        let result = run_matrix_with_mock(MINIMAL, &[]).await;
        assert_matrix_passed(&result);
        assert_eq!(result.labels(), vec!["v=a", "v=b"]);
        assert_step_status(&result, "v=a", "tests", StepStatus::Success);
    }

    #[tokio::test]
    async fn test_run_matrix_with_mock_failing() {
        let result = run_matrix_with_mock(MINIMAL, &["cmd-tests"]).await;
        assert_matrix_failed(&result);
        assert_combination_status(&result, "v=a", CombinationStatus::Failed);
        assert_combination_status(&result, "v=b", CombinationStatus::Failed);
    }
}
