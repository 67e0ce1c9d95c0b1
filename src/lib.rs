// ABOUTME: Library root for compose-redeploy - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod agent;
pub mod config;
pub mod error;
pub mod manifest;
pub mod redeploy;
pub mod runtime;
pub mod server;
pub mod types;
