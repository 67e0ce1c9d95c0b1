// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Keeps container IDs, image IDs and image references from being mixed up.

mod id;
mod image_ref;

pub use id::{ContainerId, ImageId};
pub use image_ref::{ImageRef, ParseImageRefError};
