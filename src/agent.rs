// ABOUTME: The redeploy agent: everything one batch needs, resolved once at startup.
// ABOUTME: Shared by the HTTP handler and the one-shot CLI command.

use crate::config::Config;
use crate::error::Result;
use crate::manifest::ManifestSource;
use crate::redeploy::{
    HealthProbe, HttpHealthProbe, Orchestrator, RedeployOptions, RedeploySummary,
    build_credential,
};
use crate::runtime::{DockerSocket, RuntimeProvider};
use std::sync::Arc;

/// Registry login with the secret already resolved.
#[derive(Clone)]
pub struct RegistryLogin {
    pub server: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for RegistryLogin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryLogin")
            .field("server", &self.server)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

pub struct Agent {
    manifest: ManifestSource,
    options: RedeployOptions,
    registry: Option<RegistryLogin>,
    provider: Arc<dyn RuntimeProvider>,
    probe: Arc<dyn HealthProbe>,
}

impl Agent {
    pub fn new(
        manifest: ManifestSource,
        options: RedeployOptions,
        registry: Option<RegistryLogin>,
        provider: Arc<dyn RuntimeProvider>,
        probe: Arc<dyn HealthProbe>,
    ) -> Self {
        Self {
            manifest,
            options,
            registry,
            provider,
            probe,
        }
    }

    /// Build an agent that talks to the configured Docker socket.
    pub fn from_config(config: &Config) -> Result<Self> {
        let registry = config
            .registry
            .as_ref()
            .map(|r| -> Result<RegistryLogin> {
                Ok(RegistryLogin {
                    server: r.server.clone(),
                    username: r.username.clone(),
                    password: r.password.resolve()?,
                })
            })
            .transpose()?;

        Ok(Self::new(
            config.manifest_source(),
            RedeployOptions::from_config(config),
            registry,
            Arc::new(DockerSocket::from_config(&config.runtime)),
            Arc::new(HttpHealthProbe::from_config(&config.health)),
        ))
    }

    pub fn manifest(&self) -> &ManifestSource {
        &self.manifest
    }

    pub fn options(&self) -> &RedeployOptions {
        &self.options
    }

    /// Run one batch: load the manifest, connect, build the credential and
    /// redeploy every service. The connection is dropped when the batch ends.
    pub async fn redeploy(&self) -> Result<RedeploySummary> {
        let services = self.manifest.load()?;
        let runtime = self.provider.connect().await?;

        let auth = self
            .registry
            .as_ref()
            .map(|r| build_credential(&r.server, &r.username, &r.password));

        tracing::info!(
            services = services.len(),
            authenticated = auth.is_some(),
            "starting redeploy"
        );

        let orchestrator = Orchestrator::new(
            runtime.as_ref(),
            self.probe.as_ref(),
            auth.as_ref(),
            &self.options,
        );
        Ok(orchestrator.run(&services).await?)
    }
}
