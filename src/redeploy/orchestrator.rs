// ABOUTME: Batch orchestration of service redeploys in manifest order.
// ABOUTME: Skips excluded services, exempts the first from reaping and stops at the first failure.

use super::deployment::{ServiceRedeploy, ServiceReport};
use super::error::RedeployError;
use super::health::HealthProbe;
use super::state::Launched;
use crate::config::{Config, HealthConfig};
use crate::manifest::ServiceSpec;
use crate::runtime::{ContainerOps, ImageOps, RegistryAuth};
use serde::Serialize;

/// Behavior switches for a batch.
#[derive(Debug, Clone, Default)]
pub struct RedeployOptions {
    /// Container names that are never touched.
    pub skip: Vec<String>,
    /// Reap the first service's old image too.
    pub reap_first_service: bool,
    /// Restore the previous container when a replacement fails.
    pub rollback_on_failure: bool,
    pub health: HealthConfig,
}

impl RedeployOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            skip: config.skip.clone(),
            reap_first_service: config.reap_first_service,
            rollback_on_failure: config.rollback_on_failure,
            health: config.health.clone(),
        }
    }

    pub fn is_skipped(&self, service: &ServiceSpec) -> bool {
        self.skip.iter().any(|s| *s == service.container_name)
    }
}

/// Outcome of a whole batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RedeploySummary {
    pub services: Vec<ServiceReport>,
    pub skipped: Vec<String>,
}

/// Runs the per-service lifecycle for every service of a manifest.
pub struct Orchestrator<'a, R: ?Sized, P: ?Sized> {
    runtime: &'a R,
    probe: &'a P,
    auth: Option<&'a RegistryAuth>,
    options: &'a RedeployOptions,
}

impl<'a, R, P> Orchestrator<'a, R, P>
where
    R: ContainerOps + ImageOps + ?Sized,
    P: HealthProbe + ?Sized,
{
    pub fn new(
        runtime: &'a R,
        probe: &'a P,
        auth: Option<&'a RegistryAuth>,
        options: &'a RedeployOptions,
    ) -> Self {
        Self {
            runtime,
            probe,
            auth,
            options,
        }
    }

    /// Redeploy every service in order. The first failure aborts the batch;
    /// services after it are not touched.
    pub async fn run(&self, services: &[ServiceSpec]) -> Result<RedeploySummary, RedeployError> {
        let mut summary = RedeploySummary::default();

        for service in services {
            if self.options.is_skipped(service) {
                tracing::info!(service = %service.name, "skipping excluded service");
                summary.skipped.push(service.name.clone());
                continue;
            }

            // The first service processed keeps its old image.
            let reap = self.options.reap_first_service || !summary.services.is_empty();
            let report = self.redeploy(service, reap).await?;
            summary.services.push(report);
        }

        tracing::info!(
            redeployed = summary.services.len(),
            skipped = summary.skipped.len(),
            "redeploy finished"
        );
        Ok(summary)
    }

    /// Run the full lifecycle for one service.
    pub async fn redeploy(
        &self,
        service: &ServiceSpec,
        reap: bool,
    ) -> Result<ServiceReport, RedeployError> {
        let runtime = self.runtime;

        let configured = ServiceRedeploy::new(service)
            .locate(runtime)
            .await?
            .retire(runtime)
            .await?
            .pull_image(runtime, self.auth)
            .await?
            .configure();

        let created = match configured.create(runtime).await {
            Ok(created) => created,
            Err((failed, err)) => return Err(self.compensate(failed, err).await),
        };
        let started = match created.start(runtime).await {
            Ok(started) => started,
            Err((failed, err)) => return Err(self.compensate(failed, err).await),
        };
        let checked = match started
            .health_check(runtime, self.probe, &self.options.health)
            .await
        {
            Ok(checked) => checked,
            Err((failed, err)) => return Err(self.compensate(failed, err).await),
        };

        let completed = checked.reap(runtime, reap).await?;
        tracing::info!(
            service = %service.name,
            container = %completed.new_container().short(),
            "service redeployed"
        );
        Ok(completed.finish())
    }

    /// Roll back when enabled. The original error is always returned.
    async fn compensate<S: Launched>(
        &self,
        failed: ServiceRedeploy<'_, S>,
        err: RedeployError,
    ) -> RedeployError {
        tracing::error!(error = %err, "service redeploy failed");
        if !self.options.rollback_on_failure {
            return err;
        }

        if let Err(rollback_err) = failed.rollback(self.runtime).await {
            tracing::error!(error = %rollback_err, "rollback failed");
        }
        err
    }
}
