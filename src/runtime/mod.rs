// ABOUTME: Container runtime capabilities and the Docker Engine implementation.
// ABOUTME: The redeploy core only sees the ContainerOps and ImageOps traits.

mod bollard;
mod error;
mod provider;
pub mod traits;

pub use self::bollard::BollardRuntime;
pub use error::RuntimeError;
pub use provider::{DockerSocket, RuntimeProvider};
pub use traits::*;
