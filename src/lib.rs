//! matrixci - a build-matrix execution orchestrator for CI jobs

pub mod cli;
pub mod core;
pub mod execution;
pub mod report;

// Re-export commonly used types
pub use crate::core::{
    Axis, Combination, ConfigError, ExclusionRule, FailurePolicy, Guard, MatrixConfig, MatrixPlan,
    MatrixStatus, RunResult, Step, StepOutcome, StepStatus,
};
pub use execution::{
    ActionRunner, CancelToken, ExecutionEvent, MatrixEngine, SchedulingStrategy, ServiceBackend,
    ServiceProvider, ShellRunner, ShellServiceProvider,
};
pub use report::{aggregate, Coverage, PipelineOutcome};
