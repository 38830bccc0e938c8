//! Validated, expanded run plan

use crate::core::config::{ConfigError, MatrixConfig, ServiceConfig};
use crate::core::matrix::{apply_exclusions, expand, Combination};
use crate::core::step::Step;

/// The fully expanded and filtered plan for one matrix run.
///
/// Axes and exclusion rules are consumed once at plan construction;
/// the plan itself is immutable for the run. `combinations` holds the
/// canonical enumeration order reports are keyed by.
#[derive(Debug, Clone)]
pub struct MatrixPlan {
    pub name: String,
    pub combinations: Vec<Combination>,
    pub steps: Vec<Step>,
    pub services: Vec<ServiceConfig>,
}

impl MatrixPlan {
    /// Build the plan: validate, expand the Cartesian product, apply
    /// exclusions.
    pub fn from_config(config: &MatrixConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let combinations = apply_exclusions(expand(&config.axes)?, &config.exclude);
        let steps = config.steps.iter().map(Step::from_config).collect();

        Ok(MatrixPlan {
            name: config.name.clone(),
            combinations,
            steps,
            services: config.services.clone(),
        })
    }
}
