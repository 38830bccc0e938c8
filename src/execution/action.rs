//! Action invocation - opaque external commands

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, error};

/// Errors raised while trying to invoke an action. A non-zero exit is
/// not an error here; it is reported through [`ActionReport`].
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("failed to spawn action: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("action terminated by signal")]
    Terminated,
}

/// What the orchestrator observes about one action invocation:
/// the exit status and the declared artifact path, nothing else.
#[derive(Debug, Clone)]
pub struct ActionReport {
    pub exit_code: i32,
    pub artifact: Option<PathBuf>,
}

impl ActionReport {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Trait seam for action invocation - allows mock runners in tests
#[async_trait]
pub trait ActionRunner: Send + Sync {
    /// Run a command with the combination's attributes exposed as
    /// environment variables. Blocks until the command exits.
    async fn run(
        &self,
        command: &str,
        artifact: Option<&PathBuf>,
        env: &BTreeMap<String, String>,
    ) -> Result<ActionReport, ActionError>;
}

/// Production runner: invokes `sh -c <command>` via tokio
#[derive(Debug, Clone, Default)]
pub struct ShellRunner;

impl ShellRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ActionRunner for ShellRunner {
    async fn run(
        &self,
        command: &str,
        artifact: Option<&PathBuf>,
        env: &BTreeMap<String, String>,
    ) -> Result<ActionReport, ActionError> {
        debug!("Running action: {}", command);

        let status = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .envs(env)
            .status()
            .await?;

        let exit_code = match status.code() {
            Some(code) => code,
            None => {
                error!("Action terminated by signal: {}", command);
                return Err(ActionError::Terminated);
            }
        };

        debug!("Action exited with status {}: {}", exit_code, command);
        Ok(ActionReport {
            exit_code,
            artifact: artifact.cloned(),
        })
    }
}
