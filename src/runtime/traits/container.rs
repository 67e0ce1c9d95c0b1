// ABOUTME: Container operations trait for container runtimes.
// ABOUTME: List, inspect, create, start and force-remove containers.

use super::shared_types::{ContainerConfig, ContainerInfo};
use crate::types::{ContainerId, ImageId};
use async_trait::async_trait;

/// Container lifecycle operations.
#[async_trait]
pub trait ContainerOps: Send + Sync {
    /// List containers matching the given filters.
    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError>;

    /// Get the current state of a container.
    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerInfo, ContainerError>;

    /// Remove a container, stopping it first when `force` is set.
    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), ContainerError>;

    /// Create a container from the given configuration.
    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<ContainerId, ContainerError>;

    /// Start a created container.
    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError>;
}

/// Filters for listing containers.
#[derive(Debug, Clone, Default)]
pub struct ContainerFilters {
    /// Runtime-side name filter (substring match, as the engine applies it).
    pub name: Option<String>,
    /// Include stopped containers.
    pub all: bool,
}

/// Summary information about a container.
#[derive(Debug, Clone)]
pub struct ContainerSummary {
    pub id: ContainerId,
    /// Names as the engine reports them, each with a leading `/`.
    pub names: Vec<String>,
    /// Image reference the container was created from.
    pub image: String,
    /// Resolved image ID (`sha256:…`).
    pub image_id: ImageId,
    pub state: String,
}

impl ContainerSummary {
    /// The primary display name, e.g. `/web`.
    pub fn display_name(&self) -> Option<&str> {
        self.names.first().map(String::as_str)
    }
}

/// Errors from container operations.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("container not found: {0}")]
    NotFound(String),

    #[error("container already exists: {0}")]
    AlreadyExists(String),

    #[error("container already running: {0}")]
    AlreadyRunning(String),

    #[error("image not found: {0}")]
    ImageNotFound(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
