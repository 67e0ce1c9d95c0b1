// ABOUTME: Redeploy state marker types for the type state pattern.
// ABOUTME: Each state carries the data produced by the transitions that led to it.

use super::freshness::PullOutcome;
use super::health::HealthReport;
use super::plan::LaunchPlan;
use crate::types::{ContainerId, ImageId};

/// Initial state: nothing inspected yet.
/// Available actions: `locate()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Pending;

/// The previous container, if any, has been looked up.
/// Available actions: `retire()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Located;

/// The previous container is gone.
/// Available actions: `pull_image()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Retired;

/// Image pulled and freshness known.
/// Available actions: `configure()`
#[derive(Debug, Clone)]
pub struct ImagePulled {
    pub(crate) outcome: PullOutcome,
}

/// Launch plan built.
/// Available actions: `create()`, `rollback()`
#[derive(Debug, Clone)]
pub struct Configured {
    pub(crate) outcome: PullOutcome,
    pub(crate) plan: LaunchPlan,
}

/// Replacement container created.
/// Available actions: `start()`, `rollback()`
#[derive(Debug, Clone)]
pub struct Created {
    pub(crate) outcome: PullOutcome,
    pub(crate) plan: LaunchPlan,
    pub(crate) container: ContainerId,
}

/// Replacement container started.
/// Available actions: `health_check()`, `rollback()`
#[derive(Debug, Clone)]
pub struct Started {
    pub(crate) outcome: PullOutcome,
    pub(crate) plan: LaunchPlan,
    pub(crate) container: ContainerId,
}

/// Replacement container answered its health endpoint.
/// Available actions: `reap()`
#[derive(Debug, Clone)]
pub struct HealthChecked {
    pub(crate) outcome: PullOutcome,
    pub(crate) container: ContainerId,
    pub(crate) health: HealthReport,
}

/// Done; the stale image was removed if that was called for.
/// Available actions: `finish()`
#[derive(Debug, Clone)]
pub struct Completed {
    pub(crate) outcome: PullOutcome,
    pub(crate) container: ContainerId,
    pub(crate) health: HealthReport,
    pub(crate) reaped: Option<ImageId>,
}

/// States from which a failed replacement can be undone.
pub trait Launched {
    fn plan(&self) -> &LaunchPlan;

    /// The replacement container, once one exists.
    fn container(&self) -> Option<&ContainerId>;
}

impl Launched for Configured {
    fn plan(&self) -> &LaunchPlan {
        &self.plan
    }

    fn container(&self) -> Option<&ContainerId> {
        None
    }
}

impl Launched for Created {
    fn plan(&self) -> &LaunchPlan {
        &self.plan
    }

    fn container(&self) -> Option<&ContainerId> {
        Some(&self.container)
    }
}

impl Launched for Started {
    fn plan(&self) -> &LaunchPlan {
        &self.plan
    }

    fn container(&self) -> Option<&ContainerId> {
        Some(&self.container)
    }
}
