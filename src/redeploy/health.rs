// ABOUTME: Health verification for freshly started containers.
// ABOUTME: Polls runtime state, then probes the HTTP health endpoint within a failure budget.

use super::error::HealthError;
use crate::config::HealthConfig;
use crate::runtime::ContainerOps;
use crate::types::ContainerId;
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Empty;
use hyper_util::rt::TokioIo;
use serde::Serialize;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::Instant;

/// Errors from a single health probe. All of them count as transport failures.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("connection failed: {0}")]
    Connect(#[source] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[source] hyper::Error),

    #[error("invalid probe request: {0}")]
    Request(String),

    #[error("no response within {0:?}")]
    Timeout(Duration),
}

/// Something that can ask a service whether it is healthy.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Probe the service at `address` and return the HTTP status code.
    async fn probe(&self, address: &str) -> Result<u16, ProbeError>;
}

/// Plain HTTP/1.1 `GET http://<address>:<port><path>`.
#[derive(Debug, Clone)]
pub struct HttpHealthProbe {
    port: u16,
    path: String,
}

impl HttpHealthProbe {
    pub fn new(port: u16, path: impl Into<String>) -> Self {
        Self {
            port,
            path: path.into(),
        }
    }

    pub fn from_config(config: &HealthConfig) -> Self {
        Self::new(config.port, config.path.clone())
    }

    pub fn url(&self, address: &str) -> String {
        format!("http://{}:{}{}", address, self.port, self.path)
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn probe(&self, address: &str) -> Result<u16, ProbeError> {
        let stream = TcpStream::connect((address, self.port))
            .await
            .map_err(ProbeError::Connect)?;
        let io = TokioIo::new(stream);

        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(ProbeError::Http)?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!("health probe connection error: {}", e);
            }
        });

        let req = hyper::Request::builder()
            .method("GET")
            .uri(&self.path)
            .header("Host", format!("{}:{}", address, self.port))
            .body(Empty::<Bytes>::new())
            .map_err(|e| ProbeError::Request(e.to_string()))?;

        let resp = sender.send_request(req).await.map_err(ProbeError::Http)?;
        Ok(resp.status().as_u16())
    }
}

/// How the verification went.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    /// Polls that found the container not running yet.
    pub not_running: u32,
    /// Probes sent, including the successful one.
    pub probes: u32,
    /// Probes that failed at the transport level. Each one consumed budget.
    pub failed_probes: u32,
    /// Probes answered with a status other than 200.
    pub unhealthy_responses: u32,
}

/// Waits for a container to run and answer its health endpoint with 200.
pub struct HealthVerifier<'a, R: ?Sized, P: ?Sized> {
    runtime: &'a R,
    probe: &'a P,
    config: &'a HealthConfig,
}

impl<'a, R, P> HealthVerifier<'a, R, P>
where
    R: ContainerOps + ?Sized,
    P: HealthProbe + ?Sized,
{
    pub fn new(runtime: &'a R, probe: &'a P, config: &'a HealthConfig) -> Self {
        Self {
            runtime,
            probe,
            config,
        }
    }

    /// Block until the container is healthy or the budget is spent.
    ///
    /// Only transport failures consume budget. While the container is not
    /// running, or answers with something other than 200, polling continues
    /// indefinitely unless `deadline` is configured.
    pub async fn verify(
        &self,
        container: &ContainerId,
        address: &str,
        service: &str,
    ) -> Result<HealthReport, HealthError> {
        let started = Instant::now();
        let mut remaining = self.config.attempts;
        let mut report = HealthReport::default();

        loop {
            if remaining == 0 {
                return Err(HealthError::Exhausted {
                    attempts: self.config.attempts,
                });
            }
            if let Some(deadline) = self.config.deadline
                && started.elapsed() >= deadline
            {
                return Err(HealthError::DeadlineExceeded { deadline });
            }

            let info = self
                .runtime
                .inspect_container(container)
                .await
                .map_err(HealthError::Inspect)?;

            if !info.is_running() {
                report.not_running += 1;
                tracing::trace!(service, container = %container.short(), state = ?info.state, "container not running yet");
                self.pause().await;
                continue;
            }

            report.probes += 1;
            let outcome =
                match tokio::time::timeout(self.config.request_timeout, self.probe.probe(address))
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => Err(ProbeError::Timeout(self.config.request_timeout)),
                };

            match outcome {
                Ok(200) => {
                    tracing::info!(
                        service,
                        container = %container.short(),
                        probes = report.probes,
                        "container is healthy"
                    );
                    return Ok(report);
                }
                Ok(status) => {
                    report.unhealthy_responses += 1;
                    tracing::debug!(service, status, "health endpoint not ready");
                    self.pause().await;
                }
                Err(e) => {
                    report.failed_probes += 1;
                    remaining -= 1;
                    tracing::warn!(service, address, remaining, error = %e, "health probe failed");
                    tokio::time::sleep(self.config.retry_delay).await;
                }
            }
        }
    }

    async fn pause(&self) {
        if self.config.poll_interval.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}
