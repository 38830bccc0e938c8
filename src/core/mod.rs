//! Core domain models for the matrix orchestrator
//!
//! This module defines the fundamental data structures that represent
//! the test matrix, its configuration, and run outcomes.

pub mod config;
pub mod guard;
pub mod matrix;
pub mod outcome;
pub mod plan;
pub mod step;

pub use config::{ConfigError, MatrixConfig, ServiceConfig};
pub use guard::{Guard, GuardTest};
pub use matrix::{Axis, Combination, ExclusionRule};
pub use outcome::{MatrixStatus, RunResult, StepOutcome, StepStatus};
pub use plan::MatrixPlan;
pub use step::{Action, FailurePolicy, Step};
