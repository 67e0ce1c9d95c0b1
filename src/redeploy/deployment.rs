// ABOUTME: Per-service redeploy struct parameterized by state marker.
// ABOUTME: The previous container travels with every state; state types carry the rest.

use super::freshness::PullOutcome;
use super::health::HealthReport;
use super::state::{Completed, Pending};
use crate::manifest::ServiceSpec;
use crate::types::{ContainerId, ImageId};
use serde::Serialize;

/// The container a redeploy replaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviousContainer {
    pub id: ContainerId,
    pub image: ImageId,
}

/// A single service's redeploy in progress, parameterized by its current state.
#[derive(Debug)]
pub struct ServiceRedeploy<'a, S> {
    pub(crate) service: &'a ServiceSpec,
    pub(crate) previous: Option<PreviousContainer>,
    pub(crate) state: S,
}

impl<'a> ServiceRedeploy<'a, Pending> {
    pub fn new(service: &'a ServiceSpec) -> Self {
        ServiceRedeploy {
            service,
            previous: None,
            state: Pending,
        }
    }
}

impl<S> ServiceRedeploy<'_, S> {
    pub fn service(&self) -> &ServiceSpec {
        self.service
    }

    /// The container being replaced (None on first deploy).
    pub fn previous(&self) -> Option<&PreviousContainer> {
        self.previous.as_ref()
    }

    pub fn state(&self) -> &S {
        &self.state
    }
}

/// Result of one service's redeploy.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceReport {
    pub service: String,
    pub container_name: String,
    pub container: ContainerId,
    pub image: String,
    pub pull: PullOutcome,
    pub replaced: Option<ContainerId>,
    pub reaped_image: Option<ImageId>,
    pub health: HealthReport,
}

impl ServiceRedeploy<'_, Completed> {
    pub fn new_container(&self) -> &ContainerId {
        &self.state.container
    }

    pub fn finish(self) -> ServiceReport {
        ServiceReport {
            service: self.service.name.clone(),
            container_name: self.service.container_name.clone(),
            container: self.state.container,
            image: self.service.image.to_string(),
            pull: self.state.outcome,
            replaced: self.previous.map(|p| p.id),
            reaped_image: self.state.reaped,
            health: self.state.health,
        }
    }
}
