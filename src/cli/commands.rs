//! CLI command definitions

use crate::execution::SchedulingStrategy;
use clap::Args;
use std::path::PathBuf;

/// Run the matrix
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to the matrix YAML file
    #[arg(short, long)]
    pub file: String,

    /// Scheduling strategy
    #[arg(long, value_enum, default_value = "sequential")]
    pub strategy: SchedulingStrategyArg,

    /// Worker cap for parallel-limited scheduling
    #[arg(long, default_value_t = 4)]
    pub workers: usize,

    /// Write the JSON report to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl RunCommand {
    pub fn scheduling_strategy(&self) -> SchedulingStrategy {
        match self.strategy {
            SchedulingStrategyArg::Sequential => SchedulingStrategy::Sequential,
            SchedulingStrategyArg::Parallel => SchedulingStrategy::Parallel,
            SchedulingStrategyArg::ParallelLimited => {
                SchedulingStrategy::LimitedParallel(self.workers)
            }
        }
    }
}

/// Validate a matrix definition
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to the matrix YAML file
    #[arg(short, long)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Show the combinations that would run
#[derive(Debug, Args, Clone)]
pub struct PlanCommand {
    /// Path to the matrix YAML file
    #[arg(short, long)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Scheduling strategy argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SchedulingStrategyArg {
    Sequential,
    Parallel,
    ParallelLimited,
}
