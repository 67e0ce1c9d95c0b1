// ABOUTME: State transition methods for a single service redeploy.
// ABOUTME: Each method consumes self and returns the next state on success.

use super::deployment::{PreviousContainer, ServiceRedeploy};
use super::error::{RedeployError, RedeployStage, StageError};
use super::freshness;
use super::health::{HealthProbe, HealthVerifier};
use super::plan::LaunchPlan;
use super::state::{
    Completed, Configured, Created, HealthChecked, ImagePulled, Launched, Located, Pending,
    Retired, Started,
};
use crate::config::HealthConfig;
use crate::runtime::{ContainerFilters, ContainerImage, ContainerOps, ImageOps, RegistryAuth};
use crate::types::ContainerId;

/// Result type for transitions that hand the previous state back on failure,
/// so the caller can decide whether to roll back.
pub type TransitionResult<'a, T, S> =
    Result<ServiceRedeploy<'a, T>, (ServiceRedeploy<'a, S>, RedeployError)>;

impl<'a, S> ServiceRedeploy<'a, S> {
    fn transition<T>(self, state: T) -> ServiceRedeploy<'a, T> {
        ServiceRedeploy {
            service: self.service,
            previous: self.previous,
            state,
        }
    }

    fn fail(&self, stage: RedeployStage, source: impl Into<StageError>) -> RedeployError {
        RedeployError::at(self.service.name.clone(), stage, source)
    }
}

// =============================================================================
// Pending -> Located -> Retired
// =============================================================================

impl<'a> ServiceRedeploy<'a, Pending> {
    /// Find the running container this service replaces.
    ///
    /// The engine's name filter matches substrings, so the display name is
    /// compared exactly. No match is a first deploy, not an error.
    pub async fn locate<R>(self, runtime: &R) -> Result<ServiceRedeploy<'a, Located>, RedeployError>
    where
        R: ContainerOps + ?Sized,
    {
        let filters = ContainerFilters {
            name: Some(self.service.container_name.clone()),
            all: true,
        };
        let containers = runtime
            .list_containers(&filters)
            .await
            .map_err(|e| self.fail(RedeployStage::Locating, e))?;

        let wanted = format!("/{}", self.service.container_name);
        let previous = containers
            .into_iter()
            .find(|c| c.display_name() == Some(wanted.as_str()))
            .map(|c| PreviousContainer {
                id: c.id,
                image: c.image_id,
            });

        match &previous {
            Some(p) => tracing::info!(
                service = %self.service.name,
                container = %p.id.short(),
                image = %p.image.short(),
                "found running container"
            ),
            None => tracing::info!(service = %self.service.name, "no existing container"),
        }

        let mut next = self.transition(Located);
        next.previous = previous;
        Ok(next)
    }
}

impl<'a> ServiceRedeploy<'a, Located> {
    /// Force-remove the previous container.
    pub async fn retire<R>(self, runtime: &R) -> Result<ServiceRedeploy<'a, Retired>, RedeployError>
    where
        R: ContainerOps + ?Sized,
    {
        if let Some(previous) = &self.previous {
            runtime
                .remove_container(&previous.id, true)
                .await
                .map_err(|e| self.fail(RedeployStage::Removing, e))?;
            tracing::info!(service = %self.service.name, container = %previous.id.short(), "removed container");
        }
        Ok(self.transition(Retired))
    }
}

// =============================================================================
// Retired -> ImagePulled -> Configured
// =============================================================================

impl<'a> ServiceRedeploy<'a, Retired> {
    /// Pull the service image and find out whether anything new arrived.
    pub async fn pull_image<R>(
        self,
        runtime: &R,
        auth: Option<&RegistryAuth>,
    ) -> Result<ServiceRedeploy<'a, ImagePulled>, RedeployError>
    where
        R: ImageOps + ?Sized,
    {
        let image = &self.service.image;
        tracing::info!(service = %self.service.name, image = %image, "pulling image");

        let stream = runtime
            .pull_image(image, auth)
            .await
            .map_err(|e| self.fail(RedeployStage::Pulling, e))?;
        let outcome = freshness::detect(stream, image)
            .await
            .map_err(|e| self.fail(RedeployStage::DetectingFreshness, e))?;

        Ok(self.transition(ImagePulled { outcome }))
    }
}

impl<'a> ServiceRedeploy<'a, ImagePulled> {
    /// Build the launch plan for the replacement container.
    pub fn configure(self) -> ServiceRedeploy<'a, Configured> {
        let plan = LaunchPlan::for_service(self.service);
        if !plan.ignored_binds.is_empty() {
            tracing::warn!(
                service = %self.service.name,
                ignored = ?plan.ignored_binds,
                "only the first volume is mounted"
            );
        }
        if plan.address.is_none() {
            tracing::warn!(
                service = %self.service.name,
                fallback = plan.health_address(),
                "no network address for health checks"
            );
        }
        let outcome = self.state.outcome;
        self.transition(Configured { outcome, plan })
    }
}

// =============================================================================
// Configured -> Created -> Started
// =============================================================================

impl<'a> ServiceRedeploy<'a, Configured> {
    /// Create the replacement container.
    pub async fn create<R>(self, runtime: &R) -> TransitionResult<'a, Created, Configured>
    where
        R: ContainerOps + ?Sized,
    {
        let created = runtime.create_container(&self.state.plan.config).await;
        match created {
            Ok(container) => {
                tracing::info!(service = %self.service.name, container = %container.short(), "created container");
                let Configured { outcome, plan } = self.state.clone();
                Ok(self.transition(Created {
                    outcome,
                    plan,
                    container,
                }))
            }
            Err(e) => {
                let err = self.fail(RedeployStage::Creating, e);
                Err((self, err))
            }
        }
    }
}

impl<'a> ServiceRedeploy<'a, Created> {
    /// Start the replacement container.
    pub async fn start<R>(self, runtime: &R) -> TransitionResult<'a, Started, Created>
    where
        R: ContainerOps + ?Sized,
    {
        let started = runtime.start_container(&self.state.container).await;
        match started {
            Ok(()) => {
                tracing::info!(service = %self.service.name, container = %self.state.container.short(), "started container");
                let Created {
                    outcome,
                    plan,
                    container,
                } = self.state.clone();
                Ok(self.transition(Started {
                    outcome,
                    plan,
                    container,
                }))
            }
            Err(e) => {
                let err = self.fail(RedeployStage::Starting, e);
                Err((self, err))
            }
        }
    }
}

// =============================================================================
// Started -> HealthChecked -> Completed
// =============================================================================

impl<'a> ServiceRedeploy<'a, Started> {
    /// Wait until the replacement runs and its health endpoint answers 200.
    pub async fn health_check<R, P>(
        self,
        runtime: &R,
        probe: &P,
        config: &HealthConfig,
    ) -> TransitionResult<'a, HealthChecked, Started>
    where
        R: ContainerOps + ?Sized,
        P: HealthProbe + ?Sized,
    {
        let verifier = HealthVerifier::new(runtime, probe, config);
        let result = verifier
            .verify(
                &self.state.container,
                self.state.plan.health_address(),
                &self.service.name,
            )
            .await;

        match result {
            Ok(health) => {
                let outcome = self.state.outcome;
                let container = self.state.container.clone();
                Ok(self.transition(HealthChecked {
                    outcome,
                    container,
                    health,
                }))
            }
            Err(e) => {
                let err = self.fail(RedeployStage::HealthChecking, e);
                Err((self, err))
            }
        }
    }
}

impl<'a> ServiceRedeploy<'a, HealthChecked> {
    /// Remove the replaced image when a new one was pulled.
    ///
    /// `allowed` is false for the batch's exempt first service.
    pub async fn reap<R>(
        self,
        runtime: &R,
        allowed: bool,
    ) -> Result<ServiceRedeploy<'a, Completed>, RedeployError>
    where
        R: ImageOps + ?Sized,
    {
        let outcome = self.state.outcome;
        let reapable = match &self.previous {
            Some(previous) if allowed && !outcome.is_current() => Some(previous.image.clone()),
            _ => None,
        };

        if let Some(image) = &reapable {
            runtime
                .remove_image(image, true)
                .await
                .map_err(|e| self.fail(RedeployStage::Reaping, e))?;
            tracing::info!(service = %self.service.name, image = %image.short(), "removed old image");
        } else {
            tracing::debug!(
                service = %self.service.name,
                allowed,
                current = outcome.is_current(),
                "keeping old image"
            );
        }

        let HealthChecked {
            container, health, ..
        } = self.state.clone();
        Ok(self.transition(Completed {
            outcome,
            container,
            health,
            reaped: reapable,
        }))
    }
}

// =============================================================================
// Rollback
// =============================================================================

impl<'a, S: Launched> ServiceRedeploy<'a, S> {
    /// Remove the replacement and bring the previous container back from
    /// the exact image it ran.
    ///
    /// Returns the restored container, or None when there was nothing to
    /// restore (first deploy).
    pub async fn rollback<R>(self, runtime: &R) -> Result<Option<ContainerId>, RedeployError>
    where
        R: ContainerOps + ?Sized,
    {
        if let Some(container) = self.state.container() {
            runtime
                .remove_container(container, true)
                .await
                .map_err(|e| self.fail(RedeployStage::Restoring, e))?;
            tracing::info!(service = %self.service.name, container = %container.short(), "removed failed replacement");
        }

        let Some(previous) = &self.previous else {
            tracing::info!(service = %self.service.name, "no previous container to restore");
            return Ok(None);
        };

        let mut config = self.state.plan().config.clone();
        config.image = ContainerImage::Id(previous.image.clone());

        let restored = runtime
            .create_container(&config)
            .await
            .map_err(|e| self.fail(RedeployStage::Restoring, e))?;
        runtime
            .start_container(&restored)
            .await
            .map_err(|e| self.fail(RedeployStage::Restoring, e))?;

        tracing::info!(
            service = %self.service.name,
            container = %restored.short(),
            image = %previous.image.short(),
            "restored previous container"
        );
        Ok(Some(restored))
    }
}
