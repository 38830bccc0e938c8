//! Test: artifact collection and coverage merging across a run

use crate::helpers::*;
use std::path::PathBuf;

fn temp_artifact(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("matrixci-test-{}-{}", std::process::id(), name))
}

/// Coverage from several artifacts is union-merged: a line covered in
/// any combination counts as covered overall
#[tokio::test]
async fn test_coverage_union_across_artifacts() {
    let unit = temp_artifact("unit.lcov");
    let adapter = temp_artifact("adapter.lcov");
    std::fs::write(&unit, "SF:src/app.py\nDA:1,1\nDA:2,0\nend_of_record\n").unwrap();
    std::fs::write(&adapter, "SF:src/app.py\nDA:2,4\nDA:7,1\nend_of_record\n").unwrap();

    let yaml = format!(
        r#"
name: "coverage merge"
axes:
  - name: v
    values: [a]
steps:
  - id: unit-tests
    actions:
      - run: "cmd-unit"
        artifact: "{}"
  - id: adapter-tests
    actions:
      - run: "cmd-adapter"
        artifact: "{}"
"#,
        unit.display(),
        adapter.display()
    );

    let result = run_matrix_with_mock(&yaml, &[]).await;
    std::fs::remove_file(&unit).ok();
    std::fs::remove_file(&adapter).ok();

    assert_matrix_passed(&result);
    let lines = &result.outcome.coverage.lines["src/app.py"];
    assert!(lines.contains(&1));
    assert!(lines.contains(&2));
    assert!(lines.contains(&7));
    assert_eq!(result.outcome.coverage.covered_lines(), 3);
}

/// A missing artifact is a warning on the combination, never a failure
#[tokio::test]
async fn test_missing_artifact_is_warning() {
    let yaml = r#"
name: "missing artifact"
axes:
  - name: v
    values: [a]
steps:
  - id: tests
    actions:
      - run: "cmd-tests"
        artifact: "/nonexistent/coverage.lcov"
"#;

    let result = run_matrix_with_mock(yaml, &[]).await;

    assert_matrix_passed(&result);
    let report = result.combination("v=a");
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("artifact"));
    assert!(result.outcome.coverage.is_empty());
}

/// Artifacts of failed steps are not collected, so a failing run
/// contributes no coverage
#[tokio::test]
async fn test_failed_step_contributes_no_coverage() {
    let lcov = temp_artifact("failed.lcov");
    std::fs::write(&lcov, "SF:src/app.py\nDA:1,1\nend_of_record\n").unwrap();

    let yaml = format!(
        r#"
name: "failed coverage"
axes:
  - name: v
    values: [a]
steps:
  - id: tests
    actions:
      - run: "cmd-fail-tests"
        artifact: "{}"
"#,
        lcov.display()
    );

    let result = run_matrix_with_mock(&yaml, &["cmd-fail-tests"]).await;
    std::fs::remove_file(&lcov).ok();

    assert_matrix_failed(&result);
    assert!(result.outcome.coverage.is_empty());
}

/// The JSON report carries the full attribute set per combination
#[tokio::test]
async fn test_json_report_names_attributes() {
    let yaml = r#"
name: "json report"
axes:
  - name: pyver
    values: ["3.7"]
  - name: variant
    values: [base]
steps:
  - id: tests
    actions:
      - run: "cmd-tests"
"#;

    let result = run_matrix_with_mock(yaml, &[]).await;
    let json = serde_json::to_value(&result.outcome).unwrap();

    assert_eq!(json["status"], "passed");
    assert_eq!(json["combinations"][0]["attributes"]["pyver"], "3.7");
    assert_eq!(json["combinations"][0]["attributes"]["variant"], "base");
    assert_eq!(json["combinations"][0]["steps"][0]["status"], "success");
}

/// The rendered summary names failing steps with their error text
#[tokio::test]
async fn test_summary_shows_failing_step_errors() {
    let yaml = r#"
name: "summary errors"
axes:
  - name: v
    values: [a, b]
steps:
  - id: build
    actions:
      - run: "cmd-build"
"#;

    let result = run_matrix_with_mock(yaml, &["cmd-build"]).await;
    let summary = result.outcome.render_summary();

    assert!(summary.contains("[v=a] failed"));
    assert!(summary.contains("step build:"));
    assert!(summary.contains("exited with status 1"));
}
