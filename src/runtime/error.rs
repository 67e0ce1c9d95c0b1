// ABOUTME: Runtime connection error types with SNAFU pattern.
// ABOUTME: Raised before any container is touched, when the engine socket is unusable.

use snafu::Snafu;

/// Failure to obtain a working runtime connection.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RuntimeError {
    #[snafu(display("failed to connect to runtime socket {socket}: {source}"))]
    Connect {
        socket: String,
        source: bollard::errors::Error,
    },

    #[snafu(display("runtime at {socket} rejected API version negotiation: {source}"))]
    Negotiate {
        socket: String,
        source: bollard::errors::Error,
    },
}
