//! Matrix axes, combinations, expansion and exclusion filtering

use crate::core::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One independent dimension of the test matrix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    /// Axis name (e.g., "pyver")
    pub name: String,

    /// Ordered, unique permissible values
    pub values: Vec<String>,
}

/// One concrete assignment of values across all axes - a single cell
/// of the matrix. Immutable once produced by [`expand`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combination {
    /// Position in the canonical enumeration order
    ordinal: usize,

    /// (axis name, chosen value) in axis declaration order
    entries: Vec<(String, String)>,
}

impl Combination {
    /// Get the value chosen for an axis
    pub fn get(&self, axis: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == axis)
            .map(|(_, value)| value.as_str())
    }

    /// Position in the canonical enumeration order (first axis varies slowest)
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Entries in axis declaration order
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Human-readable label naming the full attribute set,
    /// e.g. `pyver=3.7, variant=base`
    pub fn label(&self) -> String {
        self.entries
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Attributes as a sorted map (for reports)
    pub fn attributes(&self) -> BTreeMap<String, String> {
        self.entries.iter().cloned().collect()
    }

    /// Attributes as environment variables for action invocation:
    /// `MATRIX_<AXIS>` with the axis name uppercased and
    /// non-alphanumeric characters mapped to `_`.
    pub fn env_vars(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|(name, value)| {
                let key: String = name
                    .chars()
                    .map(|c| {
                        if c.is_ascii_alphanumeric() {
                            c.to_ascii_uppercase()
                        } else {
                            '_'
                        }
                    })
                    .collect();
                (format!("MATRIX_{}", key), value.clone())
            })
            .collect()
    }
}

/// A partial mapping of axis names to values. A combination matches the
/// rule iff every entry in the rule equals the corresponding entry in
/// the combination.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExclusionRule {
    pub entries: BTreeMap<String, String>,
}

impl ExclusionRule {
    pub fn matches(&self, combination: &Combination) -> bool {
        self.entries
            .iter()
            .all(|(axis, value)| combination.get(axis) == Some(value.as_str()))
    }
}

/// Produce the full Cartesian product of the given axes.
///
/// Combinations are enumerated as nested iteration over axes in
/// declaration order: the first axis varies slowest. The enumeration
/// order is a stable property of the plan, independent of how
/// combinations are later scheduled.
pub fn expand(axes: &[Axis]) -> Result<Vec<Combination>, ConfigError> {
    for axis in axes {
        if axis.values.is_empty() {
            return Err(ConfigError::EmptyAxis {
                axis: axis.name.clone(),
            });
        }
    }

    let mut combinations = vec![Vec::new()];
    for axis in axes {
        let mut next = Vec::with_capacity(combinations.len() * axis.values.len());
        for partial in &combinations {
            for value in &axis.values {
                let mut entries: Vec<(String, String)> = partial.clone();
                entries.push((axis.name.clone(), value.clone()));
                next.push(entries);
            }
        }
        combinations = next;
    }

    Ok(combinations
        .into_iter()
        .enumerate()
        .map(|(ordinal, entries)| Combination { ordinal, entries })
        .collect())
}

/// Remove combinations matching at least one rule. Rules are evaluated
/// independently; there is no ordering dependency and no "undo"
/// semantics, so filtering is idempotent.
pub fn apply_exclusions(
    combinations: Vec<Combination>,
    rules: &[ExclusionRule],
) -> Vec<Combination> {
    combinations
        .into_iter()
        .filter(|combination| !rules.iter().any(|rule| rule.matches(combination)))
        .collect()
}
