// ABOUTME: Application-wide error types for compose-redeploy.
// ABOUTME: Uses thiserror for ergonomic error handling.

use crate::manifest::ManifestError;
use crate::redeploy::RedeployError;
use crate::runtime::RuntimeError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read configuration {}: {source}", path.display())]
    ReadConfig {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    Manifest(#[from] ManifestError),

    #[error("{0}")]
    Runtime(#[from] RuntimeError),

    #[error("{0}")]
    Redeploy(#[from] RedeployError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
