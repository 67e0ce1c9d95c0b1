// ABOUTME: Configuration types and parsing for redeploy.yml.
// ABOUTME: Handles discovery, defaults and resolution of env-backed secrets.

mod env_value;
mod health;

pub use env_value::EnvValue;
pub use health::HealthConfig;

use crate::error::{Error, Result};
use crate::manifest::ManifestSource;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "redeploy.yml";
pub const CONFIG_FILENAME_ALT: &str = "redeploy.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".redeploy/config.yml";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Value the `Authorization` header must carry.
    #[serde(default = "default_token")]
    pub token: EnvValue,

    #[serde(default)]
    pub manifest: ManifestConfig,

    /// Container names that are never redeployed.
    #[serde(default = "default_skip")]
    pub skip: Vec<String>,

    #[serde(default)]
    pub runtime: RuntimeConfig,

    #[serde(default)]
    pub registry: Option<RegistryConfig>,

    #[serde(default)]
    pub health: HealthConfig,

    #[serde(default)]
    pub reap_first_service: bool,

    #[serde(default)]
    pub rollback_on_failure: bool,

    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestConfig {
    #[serde(default = "default_manifest_path")]
    pub path: PathBuf,

    #[serde(default = "default_project")]
    pub project: String,

    #[serde(default)]
    pub env_file: Option<PathBuf>,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            path: default_manifest_path(),
            project: default_project(),
            env_file: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    #[serde(default = "default_socket")]
    pub socket: String,

    #[serde(default = "default_runtime_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            socket: default_socket(),
            timeout: default_runtime_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    pub server: String,
    pub username: String,
    pub password: EnvValue,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorsConfig {
    #[serde(default = "default_origins")]
    pub origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: default_origins(),
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3002))
}

fn default_token() -> EnvValue {
    EnvValue::from_env("TOKEN")
}

fn default_manifest_path() -> PathBuf {
    PathBuf::from("data/docker-compose.yml")
}

fn default_project() -> String {
    "gleam".to_string()
}

fn default_socket() -> String {
    "/var/run/docker.sock".to_string()
}

fn default_runtime_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_origins() -> Vec<String> {
    vec![
        "http://localhost".to_string(),
        "https://github.com".to_string(),
    ]
}

/// The shared cache container is left running across redeploys.
fn default_skip() -> Vec<String> {
    vec!["redis-gleam-prod".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            token: default_token(),
            manifest: ManifestConfig::default(),
            skip: default_skip(),
            runtime: RuntimeConfig::default(),
            registry: None,
            health: HealthConfig::default(),
            reap_first_service: false,
            rollback_on_failure: false,
            cors: CorsConfig::default(),
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document means "all defaults".
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_yaml(&content)?;
        config.anchor_paths(path.parent().unwrap_or(Path::new("")));
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Load the first candidate file found in `dir`, or the defaults.
    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        tracing::debug!(dir = %dir.display(), "no configuration file, using defaults");
        Ok(Self::default())
    }

    fn validate(&self) -> Result<()> {
        if self.health.attempts == 0 {
            return Err(Error::InvalidConfig(
                "health.attempts must be at least 1".to_string(),
            ));
        }
        if !self.health.path.starts_with('/') {
            return Err(Error::InvalidConfig(format!(
                "health.path must start with '/': {}",
                self.health.path
            )));
        }
        if self.manifest.project.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "manifest.project cannot be empty".to_string(),
            ));
        }
        if let Some(registry) = &self.registry
            && registry.server.trim().is_empty()
        {
            return Err(Error::InvalidConfig(
                "registry.server cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Relative manifest paths in a config file are relative to that file.
    fn anchor_paths(&mut self, base: &Path) {
        if base.as_os_str().is_empty() {
            return;
        }
        if self.manifest.path.is_relative() {
            self.manifest.path = base.join(&self.manifest.path);
        }
        if let Some(env_file) = &self.manifest.env_file
            && env_file.is_relative()
        {
            self.manifest.env_file = Some(base.join(env_file));
        }
    }

    pub fn manifest_source(&self) -> ManifestSource {
        ManifestSource {
            path: self.manifest.path.clone(),
            project: self.manifest.project.clone(),
            env_file: self.manifest.env_file.clone(),
        }
    }
}
