//! Matrix definition loaded from YAML

use crate::core::guard::{Guard, GuardTest};
use crate::core::matrix::{Axis, ExclusionRule};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration-time errors. All of these are detected before any
/// execution starts; a failed validation aborts with no partial run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("axis '{axis}' has no values")]
    EmptyAxis { axis: String },

    #[error("duplicate axis name '{axis}'")]
    DuplicateAxis { axis: String },

    #[error("axis '{axis}' lists value '{value}' more than once")]
    DuplicateValue { axis: String, value: String },

    #[error("{context} references undeclared axis '{axis}'")]
    UnknownAxis { context: String, axis: String },

    #[error("duplicate step id '{id}'")]
    DuplicateStep { id: String },

    #[error("step '{id}' has no actions")]
    EmptyStep { id: String },

    #[error("duplicate service name '{name}'")]
    DuplicateService { name: String },

    #[error("{context} has a one-of test with no alternatives")]
    EmptyOneOf { context: String },

    #[error("failed to read matrix definition: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse matrix definition: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Top-level matrix definition loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixConfig {
    /// Pipeline name
    pub name: String,

    /// Independent axes, in declaration order
    pub axes: Vec<Axis>,

    /// Exclusion rules: partial attribute maps removing combinations
    #[serde(default)]
    pub exclude: Vec<ExclusionRule>,

    /// Auxiliary services provisioned per combination when their guard holds
    #[serde(default)]
    pub services: Vec<ServiceConfig>,

    /// Ordered pipeline steps
    pub steps: Vec<StepConfig>,
}

/// Step configuration as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    /// Unique step identifier
    pub id: String,

    /// Optional guard; absent means the step always runs
    #[serde(default)]
    pub when: Option<Guard>,

    /// Failure policy (defaults to abort-combination)
    #[serde(default)]
    pub on_failure: crate::core::step::FailurePolicy,

    /// Ordered actions
    pub actions: Vec<ActionConfig>,
}

/// A single action within a step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionConfig {
    /// Shell command to run
    pub run: String,

    /// Artifact path the action is expected to produce (e.g., coverage)
    #[serde(default)]
    pub artifact: Option<PathBuf>,
}

/// Auxiliary service descriptor plus its guard condition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name; at most one live instance per name per combination
    pub name: String,

    /// Command that starts the service
    pub start: String,

    /// Readiness probe command, polled until it exits zero. Absent
    /// means the service counts as ready right after start.
    #[serde(default)]
    pub ready: Option<String>,

    /// Command that stops the service. Absent means the started
    /// process is terminated directly.
    #[serde(default)]
    pub stop: Option<String>,

    /// Startup timeout for the readiness probe
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,

    /// Interval between readiness probes
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Guard condition; absent means the service is required for every
    /// combination
    #[serde(default)]
    pub when: Option<Guard>,
}

fn default_startup_timeout_secs() -> u64 {
    30
}

fn default_poll_interval_ms() -> u64 {
    250
}

impl MatrixConfig {
    /// Load a matrix definition from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a matrix definition from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: MatrixConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the matrix definition.
    ///
    /// A rule or guard naming an undeclared axis is rejected here rather
    /// than silently never matching: a silent no-op exclusion is a common
    /// authoring mistake worth surfacing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut axis_names = HashSet::new();
        for axis in &self.axes {
            if axis.values.is_empty() {
                return Err(ConfigError::EmptyAxis {
                    axis: axis.name.clone(),
                });
            }
            if !axis_names.insert(axis.name.as_str()) {
                return Err(ConfigError::DuplicateAxis {
                    axis: axis.name.clone(),
                });
            }
            let mut seen = HashSet::new();
            for value in &axis.values {
                if !seen.insert(value.as_str()) {
                    return Err(ConfigError::DuplicateValue {
                        axis: axis.name.clone(),
                        value: value.clone(),
                    });
                }
            }
        }

        for (i, rule) in self.exclude.iter().enumerate() {
            Self::check_axes_known(
                &axis_names,
                rule.entries.keys(),
                format!("exclusion rule #{}", i + 1),
            )?;
        }

        let mut step_ids = HashSet::new();
        for step in &self.steps {
            if !step_ids.insert(step.id.as_str()) {
                return Err(ConfigError::DuplicateStep {
                    id: step.id.clone(),
                });
            }
            if step.actions.is_empty() {
                return Err(ConfigError::EmptyStep {
                    id: step.id.clone(),
                });
            }
            if let Some(guard) = &step.when {
                Self::check_guard(&axis_names, guard, format!("step '{}' guard", step.id))?;
            }
        }

        let mut service_names = HashSet::new();
        for service in &self.services {
            if !service_names.insert(service.name.as_str()) {
                return Err(ConfigError::DuplicateService {
                    name: service.name.clone(),
                });
            }
            if let Some(guard) = &service.when {
                Self::check_guard(
                    &axis_names,
                    guard,
                    format!("service '{}' guard", service.name),
                )?;
            }
        }

        Ok(())
    }

    fn check_guard(
        axis_names: &HashSet<&str>,
        guard: &Guard,
        context: String,
    ) -> Result<(), ConfigError> {
        Self::check_axes_known(axis_names, guard.clauses.keys(), context.clone())?;
        for test in guard.clauses.values() {
            if matches!(test, GuardTest::OneOf(alternatives) if alternatives.is_empty()) {
                return Err(ConfigError::EmptyOneOf { context });
            }
        }
        Ok(())
    }

    fn check_axes_known<'a>(
        axis_names: &HashSet<&str>,
        referenced: impl Iterator<Item = &'a String>,
        context: String,
    ) -> Result<(), ConfigError> {
        for axis in referenced {
            if !axis_names.contains(axis.as_str()) {
                return Err(ConfigError::UnknownAxis {
                    context,
                    axis: axis.clone(),
                });
            }
        }
        Ok(())
    }

    /// Exclusion rules as declared (accessor for reporting/tests)
    pub fn exclusions(&self) -> &[ExclusionRule] {
        &self.exclude
    }
}
