// ABOUTME: Health verification settings for replacement containers.
// ABOUTME: Probe target, transport-failure budget and pacing of the verify loop.

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HealthConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_path")]
    pub path: String,

    /// Transport failures tolerated before the check is declared failed.
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    #[serde(default = "default_retry_delay", with = "humantime_serde")]
    pub retry_delay: Duration,

    /// Pause between polls while the container is not running or not yet
    /// answering 200. Zero only yields to the scheduler.
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Overall bound for the loop. Without one, a container that never
    /// becomes running or healthy is polled forever.
    #[serde(default, with = "humantime_serde")]
    pub deadline: Option<Duration>,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            path: default_path(),
            attempts: default_attempts(),
            retry_delay: default_retry_delay(),
            poll_interval: default_poll_interval(),
            request_timeout: default_request_timeout(),
            deadline: None,
        }
    }
}

fn default_port() -> u16 {
    3001
}

fn default_path() -> String {
    "/health".to_string()
}

fn default_attempts() -> u32 {
    10
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(200)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(5)
}
