//! Guard conditions gating steps and services per combination

use crate::core::matrix::Combination;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single comparison over one axis value.
///
/// The predicate set is deliberately closed: equality and set membership
/// are the only tests, there is no free-form expression evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GuardTest {
    /// The axis value must equal this string
    Equals(String),
    /// The axis value must be one of these strings
    OneOf(Vec<String>),
}

impl GuardTest {
    pub fn matches(&self, value: &str) -> bool {
        match self {
            GuardTest::Equals(expected) => value == expected,
            GuardTest::OneOf(alternatives) => alternatives.iter().any(|alt| alt == value),
        }
    }
}

/// A guard over a combination: a conjunction of per-axis clauses.
/// All clauses must hold for the guard to pass.
///
/// In YAML a guard is a mapping from axis name to either a single
/// value (equals) or a list of values (one-of):
///
/// ```yaml
/// when:
///   variant: adapter
///   pyver: ["3.7", "3.8"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Guard {
    pub clauses: BTreeMap<String, GuardTest>,
}

impl Guard {
    /// Evaluate the guard against a combination. Pure: no side effects,
    /// no dependence on execution order.
    ///
    /// A clause over an axis the combination does not carry fails; the
    /// configuration validator rejects such guards before any execution.
    pub fn evaluate(&self, combination: &Combination) -> bool {
        self.clauses.iter().all(|(axis, test)| {
            combination
                .get(axis)
                .is_some_and(|value| test.matches(value))
        })
    }

    /// Axis names referenced by this guard
    pub fn referenced_axes(&self) -> impl Iterator<Item = &str> {
        self.clauses.keys().map(String::as_str)
    }
}

/// Evaluate an optional guard: absence means "always run".
pub fn evaluate(guard: Option<&Guard>, combination: &Combination) -> bool {
    guard.map_or(true, |g| g.evaluate(combination))
}
