// ABOUTME: Capability traits for the container runtime.
// ABOUTME: ContainerOps and ImageOps cover everything a redeploy pass touches.

mod container;
mod image;
mod shared_types;

pub use container::{ContainerError, ContainerFilters, ContainerOps, ContainerSummary};
pub use image::{ImageError, ImageOps, PullStream};
pub use shared_types::*;

/// Everything a redeploy pass needs from the engine.
pub trait ContainerRuntime: ContainerOps + ImageOps {}

impl<T: ContainerOps + ImageOps + ?Sized> ContainerRuntime for T {}
