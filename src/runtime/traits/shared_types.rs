// ABOUTME: Shared types used across runtime trait definitions.
// ABOUTME: ContainerConfig, ContainerInfo, RegistryAuth, restart policies.

use crate::types::{ContainerId, ImageId, ImageRef};
use bollard::auth::DockerCredentials;
use std::fmt;

/// Configuration for creating a container.
#[derive(Debug, Clone)]
pub struct ContainerConfig {
    /// Name for the container.
    pub name: String,
    /// Image to run.
    pub image: ContainerImage,
    /// User to run as.
    pub user: Option<String>,
    /// Environment in `KEY=VALUE` form.
    pub env: Vec<String>,
    /// Host bind specifications (`source:target[:mode]`).
    pub binds: Vec<String>,
    /// Restart policy.
    pub restart_policy: RestartPolicyConfig,
    /// One endpoint per network the container joins.
    pub endpoints: Vec<EndpointConfig>,
}

/// Image a container is created from.
///
/// Replacements use the manifest reference; restoring a previous container
/// uses the exact image ID it ran, since its tag may have moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerImage {
    Reference(ImageRef),
    Id(ImageId),
}

impl fmt::Display for ContainerImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerImage::Reference(reference) => write!(f, "{}", reference),
            ContainerImage::Id(id) => write!(f, "{}", id),
        }
    }
}

impl From<ImageRef> for ContainerImage {
    fn from(reference: ImageRef) -> Self {
        ContainerImage::Reference(reference)
    }
}

/// Network attachment for a new container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    pub network: String,
    /// Static IPv4 address inside the network.
    pub ipv4_address: Option<String>,
}

/// Restart policy configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RestartPolicyConfig {
    #[default]
    No,
    Always,
    UnlessStopped,
    OnFailure { max_retries: Option<u32> },
}

/// Point-in-time view of a container.
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    pub id: ContainerId,
    pub name: String,
    pub state: ContainerState,
}

impl ContainerInfo {
    pub fn is_running(&self) -> bool {
        self.state == ContainerState::Running
    }
}

/// Container state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
}

/// Registry authentication for image pulls.
///
/// Built once per batch; every pull hands the same `credentials` to the engine.
#[derive(Clone)]
pub struct RegistryAuth {
    /// Registry server (e.g. "ghcr.io").
    pub server: String,
    pub credentials: DockerCredentials,
}

impl fmt::Debug for RegistryAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryAuth")
            .field("server", &self.server)
            .field("username", &self.credentials.username)
            .field("password", &"<redacted>")
            .finish_non_exhaustive()
    }
}
