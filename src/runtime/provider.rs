// ABOUTME: Per-request runtime connections.
// ABOUTME: The agent asks a provider for a fresh connection at the start of every batch.

use super::bollard::BollardRuntime;
use super::error::RuntimeError;
use super::traits::ContainerRuntime;
use crate::config::RuntimeConfig;
use async_trait::async_trait;
use std::time::Duration;

/// Opens a runtime connection that lives as long as one redeploy batch.
#[async_trait]
pub trait RuntimeProvider: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn ContainerRuntime>, RuntimeError>;
}

/// Connects to the Docker Engine over its unix socket.
#[derive(Debug, Clone)]
pub struct DockerSocket {
    socket: String,
    timeout: Duration,
}

impl DockerSocket {
    pub fn new(socket: impl Into<String>, timeout: Duration) -> Self {
        Self {
            socket: socket.into(),
            timeout,
        }
    }

    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(config.socket.clone(), config.timeout)
    }
}

#[async_trait]
impl RuntimeProvider for DockerSocket {
    async fn connect(&self) -> Result<Box<dyn ContainerRuntime>, RuntimeError> {
        let runtime = BollardRuntime::connect(&self.socket, self.timeout).await?;
        Ok(Box::new(runtime))
    }
}
