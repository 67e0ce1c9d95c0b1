// ABOUTME: Image freshness detection from a streamed pull response.
// ABOUTME: Looks for the engine's "Image is up to date" status for the pulled image.

use crate::runtime::{ImageError, PullStream};
use crate::types::ImageRef;
use futures::StreamExt;
use serde::Serialize;

/// Whether a pull fetched new content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PullOutcome {
    /// The local image was already current; nothing was downloaded.
    AlreadyCurrent,
    /// New content was pulled.
    Updated,
}

impl PullOutcome {
    pub fn is_current(self) -> bool {
        self == PullOutcome::AlreadyCurrent
    }
}

/// The status text the engine reports when a pull is a no-op.
pub fn up_to_date_marker(image: &ImageRef) -> String {
    format!("Status: Image is up to date for {}", image.familiar())
}

/// Whether one status record is exactly the up-to-date marker.
///
/// Records are JSON objects whose `status` must equal the marker; records
/// that are not JSON are compared as raw text.
pub fn is_up_to_date_record(record: &str, marker: &str) -> bool {
    let record = record.trim();
    match serde_json::from_str::<serde_json::Value>(record) {
        Ok(value) => value.get("status").and_then(|s| s.as_str()) == Some(marker),
        Err(_) => record == marker,
    }
}

/// Consume a pull stream and decide whether the image was already current.
///
/// The stream is drained to completion so the pull finishes before the
/// caller moves on, and dropped on every return path.
pub async fn detect(mut stream: PullStream, image: &ImageRef) -> Result<PullOutcome, ImageError> {
    let marker = up_to_date_marker(image);
    let mut records = 0usize;

    while let Some(record) = stream.next().await {
        let record = record?;
        records += 1;
        if is_up_to_date_record(&record, &marker) {
            drain(stream).await;
            tracing::info!(image = %image, records, "image already up to date");
            return Ok(PullOutcome::AlreadyCurrent);
        }
    }

    tracing::info!(image = %image, records, "pulled new image");
    Ok(PullOutcome::Updated)
}

// Errors after the marker cannot change the verdict.
async fn drain(mut stream: PullStream) {
    while let Some(record) = stream.next().await {
        if let Err(e) = record {
            tracing::debug!(error = %e, "ignoring pull error after up-to-date status");
            break;
        }
    }
}
