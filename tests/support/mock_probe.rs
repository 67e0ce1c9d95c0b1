// ABOUTME: Scripted health probe.
// ABOUTME: Plays back refusals and status codes, then repeats a fallback step.

use async_trait::async_trait;
use compose_redeploy::redeploy::{HealthProbe, ProbeError};
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy)]
pub enum ProbeStep {
    Refused,
    Status(u16),
}

pub struct MockProbe {
    script: Mutex<VecDeque<ProbeStep>>,
    fallback: ProbeStep,
    addresses: Mutex<Vec<String>>,
}

impl MockProbe {
    pub fn new(script: impl IntoIterator<Item = ProbeStep>, fallback: ProbeStep) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback,
            addresses: Mutex::new(Vec::new()),
        }
    }

    pub fn healthy() -> Self {
        Self::new([], ProbeStep::Status(200))
    }

    pub fn always_refused() -> Self {
        Self::new([], ProbeStep::Refused)
    }

    pub fn calls(&self) -> usize {
        self.addresses.lock().unwrap().len()
    }

    pub fn addresses(&self) -> Vec<String> {
        self.addresses.lock().unwrap().clone()
    }
}

#[async_trait]
impl HealthProbe for MockProbe {
    async fn probe(&self, address: &str) -> Result<u16, ProbeError> {
        self.addresses.lock().unwrap().push(address.to_string());
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback);
        match step {
            ProbeStep::Refused => Err(ProbeError::Connect(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))),
            ProbeStep::Status(status) => Ok(status),
        }
    }
}
