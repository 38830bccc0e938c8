//! Service lifecycle management
//!
//! Auxiliary background services (e.g., a database) are provisioned per
//! combination when their guard holds, held for the duration of that
//! combination's run, and stopped on every exit path. Concurrent
//! combinations get independently isolated instances; nothing is shared
//! across combinations.

use crate::core::config::ServiceConfig;
use crate::core::guard;
use crate::core::matrix::Combination;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Errors raised while provisioning a service
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("service '{name}' failed to start: {source}")]
    Start {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("service '{name}' did not become ready within {timeout_secs}s")]
    StartupTimeout { name: String, timeout_secs: u64 },

    #[error("service '{name}' is already live in this execution context")]
    DuplicateInstance { name: String },
}

impl ServiceError {
    /// Name of the service the error is about
    pub fn service_name(&self) -> &str {
        match self {
            ServiceError::Start { name, .. }
            | ServiceError::StartupTimeout { name, .. }
            | ServiceError::DuplicateInstance { name } => name,
        }
    }
}

/// Trait seam for a backing service. The orchestrator never speaks the
/// service's own protocol; it only starts, probes, and stops it.
#[async_trait]
pub trait ServiceBackend: Send + Sync {
    async fn start(&self) -> Result<(), ServiceError>;

    /// Readiness probe, polled until success or startup timeout
    async fn is_ready(&self) -> bool;

    /// Stop the service. Must be safe to call exactly once per started
    /// instance, on any exit path.
    async fn stop(&self);
}

/// Factory seam: builds a backend for a service descriptor. Tests plug
/// in mock backends here.
pub trait ServiceProvider: Send + Sync {
    fn create(&self, config: &ServiceConfig) -> Arc<dyn ServiceBackend>;
}

/// Scoped handle to an acquired service. A no-op handle is returned
/// when the requirement's guard evaluates false; releasing it does
/// nothing.
pub struct ServiceHandle {
    name: String,
    backend: Option<Arc<dyn ServiceBackend>>,
}

impl std::fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("name", &self.name)
            .field("live", &self.backend.is_some())
            .finish()
    }
}

impl ServiceHandle {
    fn noop(name: &str) -> Self {
        Self {
            name: name.to_string(),
            backend: None,
        }
    }

    fn live(name: &str, backend: Arc<dyn ServiceBackend>) -> Self {
        Self {
            name: name.to_string(),
            backend: Some(backend),
        }
    }

    pub fn is_live(&self) -> bool {
        self.backend.is_some()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stop the backing service if one was started
    pub async fn release(mut self) {
        if let Some(backend) = self.backend.take() {
            debug!("Stopping service '{}'", self.name);
            backend.stop().await;
        }
    }
}

/// Acquires and releases services for one combination's execution context
pub struct ServiceManager {
    provider: Arc<dyn ServiceProvider>,
}

impl ServiceManager {
    pub fn new(provider: Arc<dyn ServiceProvider>) -> Self {
        Self { provider }
    }

    /// Acquire one service if its guard holds for this combination.
    ///
    /// Blocks until the readiness probe succeeds or the startup timeout
    /// elapses. On timeout the service is stopped before the error is
    /// returned, so the started process never outlives the attempt.
    pub async fn acquire(
        &self,
        config: &ServiceConfig,
        combination: &Combination,
    ) -> Result<ServiceHandle, ServiceError> {
        if !guard::evaluate(config.when.as_ref(), combination) {
            debug!(
                "Service '{}' not required for [{}]",
                config.name,
                combination.label()
            );
            return Ok(ServiceHandle::noop(&config.name));
        }

        info!(
            "Starting service '{}' for [{}]",
            config.name,
            combination.label()
        );
        let backend = self.provider.create(config);
        backend.start().await?;

        let timeout = tokio::time::Duration::from_secs(config.startup_timeout_secs);
        let poll = tokio::time::Duration::from_millis(config.poll_interval_ms);
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if backend.is_ready().await {
                info!("Service '{}' is ready", config.name);
                return Ok(ServiceHandle::live(&config.name, backend));
            }
            if tokio::time::Instant::now() >= deadline {
                warn!(
                    "Service '{}' did not become ready within {}s, stopping it",
                    config.name, config.startup_timeout_secs
                );
                backend.stop().await;
                return Err(ServiceError::StartupTimeout {
                    name: config.name.clone(),
                    timeout_secs: config.startup_timeout_secs,
                });
            }
            tokio::time::sleep(poll).await;
        }
    }

    /// Acquire every service required by this combination. If any
    /// acquisition fails, handles acquired so far are released before
    /// the error is returned.
    pub async fn acquire_all(
        &self,
        services: &[ServiceConfig],
        combination: &Combination,
    ) -> Result<Vec<ServiceHandle>, ServiceError> {
        let mut handles: Vec<ServiceHandle> = Vec::with_capacity(services.len());
        let mut live_names: HashSet<String> = HashSet::new();

        for config in services {
            if live_names.contains(&config.name) {
                Self::release_all(handles).await;
                return Err(ServiceError::DuplicateInstance {
                    name: config.name.clone(),
                });
            }

            match self.acquire(config, combination).await {
                Ok(handle) => {
                    if handle.is_live() {
                        live_names.insert(config.name.clone());
                    }
                    handles.push(handle);
                }
                Err(err) => {
                    Self::release_all(handles).await;
                    return Err(err);
                }
            }
        }

        Ok(handles)
    }

    /// Release a set of handles (normal completion or unwind path)
    pub async fn release_all(handles: Vec<ServiceHandle>) {
        for handle in handles {
            handle.release().await;
        }
    }
}

/// Production backend: start/ready/stop are shell commands. The started
/// process is spawned with kill-on-drop so a leaked handle can never
/// leave a stray service corrupting later combinations on the same host.
pub struct ShellService {
    config: ServiceConfig,
    child: Mutex<Option<tokio::process::Child>>,
}

impl ShellService {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            child: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ServiceBackend for ShellService {
    async fn start(&self) -> Result<(), ServiceError> {
        let child = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&self.config.start)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ServiceError::Start {
                name: self.config.name.clone(),
                source,
            })?;
        *self.child.lock().await = Some(child);
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        match &self.config.ready {
            Some(probe) => tokio::process::Command::new("sh")
                .arg("-c")
                .arg(probe)
                .status()
                .await
                .map(|status| status.success())
                .unwrap_or(false),
            // No probe declared: ready right after start
            None => true,
        }
    }

    async fn stop(&self) {
        if let Some(stop) = &self.config.stop {
            if let Err(err) = tokio::process::Command::new("sh")
                .arg("-c")
                .arg(stop)
                .status()
                .await
            {
                warn!("Stop command for '{}' failed: {}", self.config.name, err);
            }
        }

        if let Some(mut child) = self.child.lock().await.take() {
            // Best effort: the stop command may already have ended it
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
    }
}

/// Default provider building [`ShellService`] backends
#[derive(Debug, Clone, Default)]
pub struct ShellServiceProvider;

impl ServiceProvider for ShellServiceProvider {
    fn create(&self, config: &ServiceConfig) -> Arc<dyn ServiceBackend> {
        Arc::new(ShellService::new(config.clone()))
    }
}
