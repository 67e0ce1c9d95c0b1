// ABOUTME: Image operations trait for container runtimes.
// ABOUTME: Streamed pulls with registry credentials, and removal by image ID.

use super::shared_types::RegistryAuth;
use crate::types::{ImageId, ImageRef};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// Status records of an image pull, one newline-delimited JSON record per item.
///
/// Dropping the stream closes the underlying connection.
pub type PullStream = Pin<Box<dyn Stream<Item = Result<String, ImageError>> + Send>>;

/// Image operations: pull and remove.
#[async_trait]
pub trait ImageOps: Send + Sync {
    /// Start pulling an image. The pull completes as the stream is drained.
    async fn pull_image(
        &self,
        reference: &ImageRef,
        auth: Option<&RegistryAuth>,
    ) -> Result<PullStream, ImageError>;

    /// Remove an image by ID.
    async fn remove_image(&self, id: &ImageId, force: bool) -> Result<(), ImageError>;
}

/// Errors from image operations.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image not found: {0}")]
    NotFound(String),

    #[error("pull failed: {0}")]
    PullFailed(String),

    #[error("image in use, cannot remove: {0}")]
    InUse(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
