//! Result aggregation: pass/fail rollup and coverage merging

use crate::core::outcome::{MatrixStatus, RunResult, StepOutcome};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Problems encountered while merging artifacts. Never fatal: recorded
/// as a warning on the affected combination's report entry.
#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("artifact {path} is missing: {source}")]
    MissingArtifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("artifact {path} is malformed at line {line}")]
    MalformedArtifact { path: PathBuf, line: usize },
}

/// Merged line coverage: file path to the set of covered line numbers.
///
/// Merging is a union; a line covered by any combination counts as
/// covered overall (logical OR on conflicting inputs).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coverage {
    pub lines: BTreeMap<String, BTreeSet<u32>>,
}

impl Coverage {
    pub fn merge(&mut self, other: Coverage) {
        for (file, lines) in other.lines {
            self.lines.entry(file).or_default().extend(lines);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn covered_lines(&self) -> usize {
        self.lines.values().map(BTreeSet::len).sum()
    }

    /// Parse the LCOV subset produced by coverage tooling:
    /// `SF:<file>`, `DA:<line>,<count>`, `end_of_record`. Other record
    /// types are ignored. Only lines with a non-zero hit count are
    /// recorded, so merging stays a plain union.
    pub fn parse_lcov(text: &str, path: &Path) -> Result<Coverage, AggregationError> {
        let mut coverage = Coverage::default();
        let mut current_file: Option<String> = None;

        for (number, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if let Some(file) = line.strip_prefix("SF:") {
                current_file = Some(file.to_string());
            } else if let Some(data) = line.strip_prefix("DA:") {
                let malformed = || AggregationError::MalformedArtifact {
                    path: path.to_path_buf(),
                    line: number + 1,
                };

                let file = current_file.clone().ok_or_else(malformed)?;
                let (line_no, count) = data.split_once(',').ok_or_else(malformed)?;
                let line_no: u32 = line_no.trim().parse().map_err(|_| malformed())?;
                let count: u64 = count.trim().parse().map_err(|_| malformed())?;

                if count > 0 {
                    coverage.lines.entry(file).or_default().insert(line_no);
                }
            } else if line == "end_of_record" {
                current_file = None;
            }
        }

        Ok(coverage)
    }

    pub fn from_file(path: &Path) -> Result<Coverage, AggregationError> {
        let text =
            std::fs::read_to_string(path).map_err(|source| AggregationError::MissingArtifact {
                path: path.to_path_buf(),
                source,
            })?;
        Self::parse_lcov(&text, path)
    }
}

/// Per-combination entry of the final report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombinationStatus {
    Passed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinationReport {
    /// Full attribute set; failures are reproducible by hand from this,
    /// never from an opaque index
    pub attributes: BTreeMap<String, String>,
    pub label: String,
    pub status: CombinationStatus,
    pub steps: Vec<StepOutcome>,
    /// Artifact problems found during merge
    pub warnings: Vec<String>,
    pub elapsed_secs: f64,
}

/// The aggregated outcome of a whole matrix run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub name: String,
    pub status: MatrixStatus,
    pub combinations: Vec<CombinationReport>,
    pub coverage: Coverage,
}

impl PipelineOutcome {
    pub fn exit_code(&self) -> i32 {
        self.status.exit_code()
    }

    /// Deterministic textual summary, ordered by the canonical
    /// combination enumeration order so report diffs are stable across
    /// runs with different execution speed.
    pub fn render_summary(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{}: {} combinations, {}\n",
            self.name,
            self.combinations.len(),
            status_word(self.status)
        ));

        for report in &self.combinations {
            out.push_str(&format!(
                "  [{}] {}\n",
                report.label,
                combination_status_word(report.status)
            ));
            for step in &report.steps {
                if let Some(error) = &step.error {
                    out.push_str(&format!("      step {}: {}\n", step.step_id, error));
                }
            }
            for warning in &report.warnings {
                out.push_str(&format!("      warning: {}\n", warning));
            }
        }

        if !self.coverage.is_empty() {
            out.push_str(&format!(
                "coverage: {} lines covered across {} files\n",
                self.coverage.covered_lines(),
                self.coverage.lines.len()
            ));
        }

        out
    }
}

fn status_word(status: MatrixStatus) -> &'static str {
    match status {
        MatrixStatus::Passed => "passed",
        MatrixStatus::Failed => "failed",
        MatrixStatus::Cancelled => "cancelled",
    }
}

fn combination_status_word(status: CombinationStatus) -> &'static str {
    match status {
        CombinationStatus::Passed => "passed",
        CombinationStatus::Failed => "failed",
        CombinationStatus::Cancelled => "cancelled",
    }
}

/// Merge all run results into the final pipeline outcome.
///
/// Takes ownership only after every execution context has terminated.
/// Results are restored to canonical enumeration order, coverage
/// artifacts are read and union-merged, and artifact problems become
/// per-combination warnings.
pub fn aggregate(name: &str, mut results: Vec<RunResult>) -> PipelineOutcome {
    results.sort_by_key(|result| result.combination.ordinal());

    let mut coverage = Coverage::default();
    let mut combinations = Vec::with_capacity(results.len());
    let mut any_failure = false;
    let mut any_cancelled = false;

    for result in results {
        let mut warnings = Vec::new();

        for outcome in &result.outcomes {
            for artifact in &outcome.artifacts {
                match Coverage::from_file(artifact) {
                    Ok(parsed) => coverage.merge(parsed),
                    Err(err) => {
                        warn!(
                            "Artifact problem for [{}]: {}",
                            result.combination.label(),
                            err
                        );
                        warnings.push(err.to_string());
                    }
                }
            }
        }

        let status = combination_status(&result);
        match status {
            CombinationStatus::Failed => any_failure = true,
            CombinationStatus::Cancelled => any_cancelled = true,
            CombinationStatus::Passed => {}
        }

        combinations.push(CombinationReport {
            attributes: result.combination.attributes(),
            label: result.combination.label(),
            status,
            steps: result.outcomes.clone(),
            warnings,
            elapsed_secs: result.elapsed_secs(),
        });
    }

    let status = if any_failure {
        MatrixStatus::Failed
    } else if any_cancelled {
        MatrixStatus::Cancelled
    } else {
        MatrixStatus::Passed
    };

    PipelineOutcome {
        name: name.to_string(),
        status,
        combinations,
        coverage,
    }
}

fn combination_status(result: &RunResult) -> CombinationStatus {
    if result.has_failure() {
        CombinationStatus::Failed
    } else if result.cancelled {
        CombinationStatus::Cancelled
    } else {
        CombinationStatus::Passed
    }
}
