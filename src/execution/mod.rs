//! Matrix execution engine

pub mod action;
pub mod cancel;
pub mod engine;
pub mod executor;
pub mod service;

pub use action::{ActionError, ActionReport, ActionRunner, ShellRunner};
pub use cancel::CancelToken;
pub use engine::{EventHandler, ExecutionEvent, MatrixEngine, SchedulingStrategy};
pub use executor::CombinationExecutor;
pub use service::{
    ServiceBackend, ServiceError, ServiceHandle, ServiceManager, ServiceProvider,
    ShellServiceProvider,
};
