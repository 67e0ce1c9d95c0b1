// ABOUTME: Error types for redeploy passes.
// ABOUTME: Every failure names the service and the lifecycle stage it happened in.

use crate::runtime::{ContainerError, ImageError};
use std::fmt;
use std::time::Duration;

/// Lifecycle stage of a single service redeploy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedeployStage {
    Locating,
    Removing,
    Pulling,
    DetectingFreshness,
    Configuring,
    Creating,
    Starting,
    HealthChecking,
    Reaping,
    Restoring,
}

impl fmt::Display for RedeployStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RedeployStage::Locating => "locate container",
            RedeployStage::Removing => "remove container",
            RedeployStage::Pulling => "pull image",
            RedeployStage::DetectingFreshness => "read pull status",
            RedeployStage::Configuring => "configure container",
            RedeployStage::Creating => "create container",
            RedeployStage::Starting => "start container",
            RedeployStage::HealthChecking => "health check",
            RedeployStage::Reaping => "remove old image",
            RedeployStage::Restoring => "restore previous container",
        };
        f.write_str(name)
    }
}

/// Errors from the health verification loop.
#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    #[error("failed to inspect container: {0}")]
    Inspect(#[source] ContainerError),

    #[error("no successful probe after {attempts} failed connection attempts")]
    Exhausted { attempts: u32 },

    #[error("container not healthy within {deadline:?}")]
    DeadlineExceeded { deadline: Duration },
}

/// What went wrong inside a stage.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Health(#[from] HealthError),
}

/// Errors that abort a redeploy pass.
#[derive(Debug, thiserror::Error)]
pub enum RedeployError {
    #[error("service {service}: failed to {stage}: {source}")]
    Service {
        service: String,
        stage: RedeployStage,
        #[source]
        source: StageError,
    },
}

impl RedeployError {
    pub(crate) fn at(
        service: impl Into<String>,
        stage: RedeployStage,
        source: impl Into<StageError>,
    ) -> Self {
        RedeployError::Service {
            service: service.into(),
            stage,
            source: source.into(),
        }
    }

    /// Name of the service that failed.
    pub fn service(&self) -> &str {
        match self {
            RedeployError::Service { service, .. } => service,
        }
    }

    pub fn stage(&self) -> RedeployStage {
        match self {
            RedeployError::Service { stage, .. } => *stage,
        }
    }
}
