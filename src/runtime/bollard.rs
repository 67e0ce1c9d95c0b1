// ABOUTME: Bollard-based container runtime implementation.
// ABOUTME: Talks to the Docker Engine API over its unix socket.

use crate::runtime::error::{ConnectSnafu, NegotiateSnafu, RuntimeError};
use crate::runtime::traits::{
    ContainerConfig, ContainerError, ContainerFilters, ContainerInfo, ContainerOps,
    ContainerState, ContainerSummary, EndpointConfig, ImageError, ImageOps, PullStream,
    RegistryAuth, RestartPolicyConfig,
};
use crate::types::{ContainerId, ImageId, ImageRef};
use async_trait::async_trait;
use bollard::Docker;
use bollard::models::{
    ContainerCreateBody, ContainerStateStatusEnum, EndpointIpamConfig, EndpointSettings,
    HostConfig, NetworkingConfig, RestartPolicy, RestartPolicyNameEnum,
};
use bollard::query_parameters::{
    CreateContainerOptions, CreateImageOptions, InspectContainerOptions, ListContainersOptions,
    RemoveContainerOptions, RemoveImageOptions, StartContainerOptions,
};
use futures::StreamExt;
use snafu::ResultExt;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;

/// Status records buffered between the engine connection and the consumer.
const PULL_BUFFER: usize = 32;

// =============================================================================
// Error Mapping Helpers
// =============================================================================

fn map_image_pull_error(e: bollard::errors::Error, image_name: &str) -> ImageError {
    ImageError::PullFailed(format!("{}: {}", image_name, e))
}

fn map_image_remove_error(e: bollard::errors::Error, image_id: &str) -> ImageError {
    match &e {
        bollard::errors::Error::DockerResponseServerError { status_code, .. }
            if *status_code == 404 =>
        {
            ImageError::NotFound(image_id.to_string())
        }
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 409 => ImageError::InUse(message.clone()),
        _ => ImageError::Runtime(format!("failed to remove {}: {}", image_id, e)),
    }
}

fn map_container_create_error(e: bollard::errors::Error) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ContainerError::ImageNotFound(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 409 => ContainerError::AlreadyExists(message.clone()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_container_start_error(e: bollard::errors::Error) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ContainerError::NotFound(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 304 => ContainerError::AlreadyRunning(message.clone()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_container_not_found_error(e: bollard::errors::Error) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ContainerError::NotFound(message.clone()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

// =============================================================================
// Request Builders
// =============================================================================

fn restart_policy(config: &RestartPolicyConfig) -> RestartPolicy {
    let (name, maximum_retry_count) = match config {
        RestartPolicyConfig::No => (RestartPolicyNameEnum::NO, None),
        RestartPolicyConfig::Always => (RestartPolicyNameEnum::ALWAYS, None),
        RestartPolicyConfig::UnlessStopped => (RestartPolicyNameEnum::UNLESS_STOPPED, None),
        RestartPolicyConfig::OnFailure { max_retries } => (
            RestartPolicyNameEnum::ON_FAILURE,
            max_retries.map(i64::from),
        ),
    };
    RestartPolicy {
        name: Some(name),
        maximum_retry_count,
    }
}

fn endpoint_settings(endpoint: &EndpointConfig) -> EndpointSettings {
    // The engine only honors a static address given through the IPAM config;
    // IPAddress is set as well so inspect output matches what was requested.
    EndpointSettings {
        ip_address: endpoint.ipv4_address.clone(),
        ipam_config: endpoint.ipv4_address.as_ref().map(|ip| EndpointIpamConfig {
            ipv4_address: Some(ip.clone()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn create_body(config: &ContainerConfig) -> ContainerCreateBody {
    let host_config = HostConfig {
        binds: if config.binds.is_empty() {
            None
        } else {
            Some(config.binds.clone())
        },
        restart_policy: Some(restart_policy(&config.restart_policy)),
        ..Default::default()
    };

    let networking_config = if config.endpoints.is_empty() {
        None
    } else {
        let endpoints: HashMap<String, EndpointSettings> = config
            .endpoints
            .iter()
            .map(|e| (e.network.clone(), endpoint_settings(e)))
            .collect();
        Some(NetworkingConfig {
            endpoints_config: Some(endpoints),
        })
    };

    ContainerCreateBody {
        image: Some(config.image.to_string()),
        user: config.user.clone(),
        env: if config.env.is_empty() {
            None
        } else {
            Some(config.env.clone())
        },
        host_config: Some(host_config),
        networking_config,
        ..Default::default()
    }
}

fn container_state(status: ContainerStateStatusEnum) -> ContainerState {
    match status {
        ContainerStateStatusEnum::CREATED => ContainerState::Created,
        ContainerStateStatusEnum::RUNNING => ContainerState::Running,
        ContainerStateStatusEnum::PAUSED => ContainerState::Paused,
        ContainerStateStatusEnum::RESTARTING => ContainerState::Restarting,
        ContainerStateStatusEnum::REMOVING => ContainerState::Removing,
        ContainerStateStatusEnum::DEAD => ContainerState::Dead,
        _ => ContainerState::Exited,
    }
}

// =============================================================================
// BollardRuntime
// =============================================================================

/// Container runtime implementation using bollard.
///
/// One instance is opened per redeploy request; dropping it releases the
/// connection pool to the engine socket.
#[derive(Debug, Clone)]
pub struct BollardRuntime {
    client: Docker,
}

impl BollardRuntime {
    /// Wrap an existing bollard client.
    pub fn new(client: Docker) -> Self {
        Self { client }
    }

    /// Connect to the engine socket and negotiate the API version.
    pub async fn connect(socket: &str, timeout: Duration) -> Result<Self, RuntimeError> {
        let client =
            Docker::connect_with_unix(socket, timeout.as_secs(), bollard::API_DEFAULT_VERSION)
                .context(ConnectSnafu { socket })?;
        let client = client
            .negotiate_version()
            .await
            .context(NegotiateSnafu { socket })?;

        tracing::debug!(socket, "connected to runtime");
        Ok(Self::new(client))
    }
}

#[async_trait]
impl ImageOps for BollardRuntime {
    async fn pull_image(
        &self,
        reference: &ImageRef,
        auth: Option<&RegistryAuth>,
    ) -> Result<PullStream, ImageError> {
        let image_name = reference.to_string();

        let opts = CreateImageOptions {
            from_image: Some(image_name.clone()),
            ..Default::default()
        };

        let credentials = auth.map(|a| a.credentials.clone());

        // The engine stream is driven by its own task so the returned stream
        // does not borrow the client. Dropping the receiver stops the task,
        // which drops the engine stream and closes the connection.
        let (tx, rx) = mpsc::channel(PULL_BUFFER);
        let client = self.client.clone();
        tokio::spawn(async move {
            let mut stream = client.create_image(Some(opts), None, credentials);
            while let Some(item) = stream.next().await {
                let record = match item {
                    Ok(info) => serde_json::to_string(&info).map_err(|e| {
                        ImageError::PullFailed(format!("{}: unreadable status: {}", image_name, e))
                    }),
                    Err(e) => Err(map_image_pull_error(e, &image_name)),
                };
                let failed = record.is_err();
                if tx.send(record).await.is_err() || failed {
                    break;
                }
            }
        });

        let records = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|record| (record, rx))
        });
        Ok(Box::pin(records))
    }

    async fn remove_image(&self, id: &ImageId, force: bool) -> Result<(), ImageError> {
        let opts = RemoveImageOptions {
            force,
            ..Default::default()
        };

        self.client
            .remove_image(id.as_str(), Some(opts), None)
            .await
            .map_err(|e| map_image_remove_error(e, id.as_str()))?;

        Ok(())
    }
}

#[async_trait]
impl ContainerOps for BollardRuntime {
    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError> {
        let mut filter_map: HashMap<String, Vec<String>> = HashMap::new();
        if let Some(ref name) = filters.name {
            filter_map.insert("name".to_string(), vec![name.clone()]);
        }

        let opts = ListContainersOptions {
            all: filters.all,
            filters: Some(filter_map),
            ..Default::default()
        };

        let containers = self
            .client
            .list_containers(Some(opts))
            .await
            .map_err(|e| ContainerError::Runtime(e.to_string()))?;

        Ok(containers
            .into_iter()
            .map(|c| ContainerSummary {
                id: ContainerId::new(c.id.unwrap_or_default()),
                names: c.names.unwrap_or_default(),
                image: c.image.unwrap_or_default(),
                image_id: ImageId::new(c.image_id.unwrap_or_default()),
                state: c
                    .state
                    .map(|s| format!("{:?}", s).to_lowercase())
                    .unwrap_or_default(),
            })
            .collect())
    }

    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerInfo, ContainerError> {
        let details = self
            .client
            .inspect_container(id.as_str(), None::<InspectContainerOptions>)
            .await
            .map_err(map_container_not_found_error)?;

        let state = details
            .state
            .as_ref()
            .and_then(|s| s.status)
            .map(container_state)
            .unwrap_or(ContainerState::Exited);

        Ok(ContainerInfo {
            id: id.clone(),
            name: details
                .name
                .unwrap_or_default()
                .trim_start_matches('/')
                .to_string(),
            state,
        })
    }

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), ContainerError> {
        let opts = RemoveContainerOptions {
            force,
            ..Default::default()
        };

        self.client
            .remove_container(id.as_str(), Some(opts))
            .await
            .map_err(map_container_not_found_error)
    }

    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<ContainerId, ContainerError> {
        let opts = CreateContainerOptions {
            name: Some(config.name.clone()),
            ..Default::default()
        };

        let response = self
            .client
            .create_container(Some(opts), create_body(config))
            .await
            .map_err(map_container_create_error)?;

        for warning in &response.warnings {
            tracing::warn!(container = %config.name, "{}", warning);
        }

        Ok(ContainerId::new(response.id))
    }

    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        self.client
            .start_container(id.as_str(), None::<StartContainerOptions>)
            .await
            .map_err(map_container_start_error)
    }
}
