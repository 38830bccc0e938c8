//! Result aggregation and report rendering

pub mod aggregate;

pub use aggregate::{
    aggregate, AggregationError, CombinationReport, CombinationStatus, Coverage, PipelineOutcome,
};
