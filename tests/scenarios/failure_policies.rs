//! Test: failure policies - abort-combination, continue, abort-pipeline

use crate::helpers::*;
use matrixci::core::outcome::StepStatus;
use matrixci::execution::SchedulingStrategy;
use matrixci::report::CombinationStatus;
use std::sync::Arc;

/// Default policy: a failed step aborts the rest of its combination but
/// leaves the other combinations alone
#[tokio::test]
async fn test_default_policy_aborts_only_the_combination() {
    let yaml = r#"
name: "isolated failure"
axes:
  - name: variant
    values: [base, adapter]
steps:
  - id: flaky
    when:
      variant: base
    actions:
      - run: "cmd-flaky"
  - id: after
    actions:
      - run: "cmd-after"
"#;

    let runner = Arc::new(MockRunner::new(&["cmd-flaky"]));
    let result = run_matrix(
        yaml,
        runner.clone(),
        Arc::new(MockServices::ready()),
        SchedulingStrategy::Sequential,
    )
    .await;

    assert_matrix_failed(&result);
    assert_combination_status(&result, "variant=base", CombinationStatus::Failed);
    assert_combination_status(&result, "variant=adapter", CombinationStatus::Passed);

    // 'after' never ran for the broken combination
    assert!(result.step("variant=base", "after").is_none());
    assert_step_status(&result, "variant=adapter", "after", StepStatus::Success);
    assert_eq!(runner.calls(), vec!["cmd-flaky", "cmd-after"]);
}

/// The continue policy records the failure and keeps going; the
/// combination still counts as failed overall
#[tokio::test]
async fn test_continue_policy_runs_remaining_steps() {
    let yaml = r#"
name: "diagnostic continue"
axes:
  - name: v
    values: [a]
steps:
  - id: diagnostics
    on_failure: continue
    actions:
      - run: "cmd-diag"
  - id: tests
    actions:
      - run: "cmd-tests"
"#;

    let result = run_matrix_with_mock(yaml, &["cmd-diag"]).await;

    assert_matrix_failed(&result);
    assert_step_status(&result, "v=a", "diagnostics", StepStatus::Failure);
    assert_step_status(&result, "v=a", "tests", StepStatus::Success);

    let error = result
        .step("v=a", "diagnostics")
        .and_then(|s| s.error.clone())
        .expect("failed step should carry an error");
    assert!(error.contains("exited with status 1"), "error was: {}", error);
}

/// abort-pipeline stops every combination that has not started yet
#[tokio::test]
async fn test_abort_pipeline_stops_the_whole_run() {
    let yaml = r#"
name: "poisoned cache"
axes:
  - name: v
    values: [a, b, c]
steps:
  - id: restore-cache
    on_failure: abort-pipeline
    actions:
      - run: "cmd-cache"
"#;

    let runner = Arc::new(MockRunner::new(&["cmd-cache"]));
    let result = run_matrix(
        yaml,
        runner.clone(),
        Arc::new(MockServices::ready()),
        SchedulingStrategy::Sequential,
    )
    .await;

    assert_matrix_failed(&result);
    assert_combination_status(&result, "v=a", CombinationStatus::Failed);
    assert_combination_status(&result, "v=b", CombinationStatus::Cancelled);
    assert_combination_status(&result, "v=c", CombinationStatus::Cancelled);

    // Only the first combination ever invoked an action
    assert_eq!(runner.call_count(), 1);
}

/// Three policies mixed in one combination: continue keeps going,
/// abort-combination cuts the tail off
#[tokio::test]
async fn test_mixed_policies_within_one_combination() {
    let yaml = r#"
name: "mixed policies"
axes:
  - name: v
    values: [a]
steps:
  - id: lint
    on_failure: continue
    actions:
      - run: "cmd-lint"
  - id: build
    on_failure: abort-combination
    actions:
      - run: "cmd-build"
  - id: tests
    actions:
      - run: "cmd-tests"
"#;

    let runner = Arc::new(MockRunner::new(&["cmd-lint", "cmd-build"]));
    let result = run_matrix(
        yaml,
        runner.clone(),
        Arc::new(MockServices::ready()),
        SchedulingStrategy::Sequential,
    )
    .await;

    assert_matrix_failed(&result);
    assert_step_status(&result, "v=a", "lint", StepStatus::Failure);
    assert_step_status(&result, "v=a", "build", StepStatus::Failure);
    assert!(result.step("v=a", "tests").is_none());
    assert_eq!(runner.calls(), vec!["cmd-lint", "cmd-build"]);
}
