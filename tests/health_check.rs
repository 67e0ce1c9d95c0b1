// ABOUTME: Tests for the health verification loop.
// ABOUTME: Runs on paused tokio time so retry delays cost nothing.

mod support;

use compose_redeploy::config::HealthConfig;
use compose_redeploy::redeploy::{HealthError, HealthProbe, HealthVerifier, HttpHealthProbe};
use compose_redeploy::runtime::{ContainerConfig, ContainerOps, RestartPolicyConfig};
use compose_redeploy::types::{ContainerId, ImageRef};
use std::time::Duration;
use support::mock_probe::{MockProbe, ProbeStep};
use support::mock_runtime::MockRuntime;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::Instant;

async fn created_container(runtime: &MockRuntime) -> ContainerId {
    let config = ContainerConfig {
        name: "web-prod".to_string(),
        image: ImageRef::parse("repo/app:tag").unwrap().into(),
        user: None,
        env: Vec::new(),
        binds: Vec::new(),
        restart_policy: RestartPolicyConfig::No,
        endpoints: Vec::new(),
    };
    runtime.create_container(&config).await.unwrap()
}

#[tokio::test(start_paused = true)]
async fn healthy_on_first_probe_consumes_nothing() {
    let runtime = MockRuntime::new();
    let container = created_container(&runtime).await;
    let probe = MockProbe::healthy();
    let config = HealthConfig::default();

    let report = HealthVerifier::new(&runtime, &probe, &config)
        .verify(&container, "10.0.0.5", "web")
        .await
        .unwrap();

    assert_eq!(report.probes, 1);
    assert_eq!(report.failed_probes, 0);
    assert_eq!(probe.addresses(), ["10.0.0.5"]);
}

#[tokio::test(start_paused = true)]
async fn refused_connections_exhaust_ten_attempts_one_second_apart() {
    let runtime = MockRuntime::new();
    let container = created_container(&runtime).await;
    let probe = MockProbe::always_refused();
    let config = HealthConfig::default();

    let start = Instant::now();
    let err = HealthVerifier::new(&runtime, &probe, &config)
        .verify(&container, "10.0.0.5", "web")
        .await
        .unwrap_err();

    assert!(matches!(err, HealthError::Exhausted { attempts: 10 }));
    assert_eq!(probe.calls(), 10);
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(10) && elapsed < Duration::from_secs(11));
}

#[tokio::test(start_paused = true)]
async fn unhealthy_responses_do_not_consume_budget() {
    let runtime = MockRuntime::new();
    let container = created_container(&runtime).await;
    let probe = MockProbe::new(
        std::iter::repeat_n(ProbeStep::Status(503), 25),
        ProbeStep::Status(200),
    );
    let config = HealthConfig {
        attempts: 1,
        ..HealthConfig::default()
    };

    let report = HealthVerifier::new(&runtime, &probe, &config)
        .verify(&container, "10.0.0.5", "web")
        .await
        .unwrap();

    assert_eq!(report.unhealthy_responses, 25);
    assert_eq!(report.probes, 26);
    assert_eq!(report.failed_probes, 0);
}

#[tokio::test(start_paused = true)]
async fn not_running_container_is_polled_without_probing() {
    let runtime = MockRuntime::new().running_after(3);
    let container = created_container(&runtime).await;
    let probe = MockProbe::healthy();
    let config = HealthConfig::default();

    let report = HealthVerifier::new(&runtime, &probe, &config)
        .verify(&container, "10.0.0.5", "web")
        .await
        .unwrap();

    assert_eq!(report.not_running, 3);
    assert_eq!(probe.calls(), 1);
    assert_eq!(runtime.inspects(), 4);
}

#[tokio::test(start_paused = true)]
async fn never_running_container_loops_without_bound() {
    let runtime = MockRuntime::new().never_running();
    let container = created_container(&runtime).await;
    let probe = MockProbe::always_refused();
    let config = HealthConfig::default();

    let verifier = HealthVerifier::new(&runtime, &probe, &config);
    let outcome = tokio::time::timeout(
        Duration::from_secs(600),
        verifier.verify(&container, "10.0.0.5", "web"),
    )
    .await;

    // Still polling after ten simulated minutes, and the budget is untouched.
    assert!(outcome.is_err());
    assert_eq!(probe.calls(), 0);
    assert!(runtime.inspects() > 100);
}

#[tokio::test(start_paused = true)]
async fn deadline_bounds_the_unbounded_branches() {
    let runtime = MockRuntime::new().never_running();
    let container = created_container(&runtime).await;
    let probe = MockProbe::healthy();
    let config = HealthConfig {
        deadline: Some(Duration::from_secs(30)),
        ..HealthConfig::default()
    };

    let err = HealthVerifier::new(&runtime, &probe, &config)
        .verify(&container, "10.0.0.5", "web")
        .await
        .unwrap_err();

    assert!(matches!(err, HealthError::DeadlineExceeded { .. }));
}

#[tokio::test(start_paused = true)]
async fn inspect_errors_are_fatal_immediately() {
    let runtime = MockRuntime::new();
    let probe = MockProbe::healthy();
    let config = HealthConfig::default();

    let err = HealthVerifier::new(&runtime, &probe, &config)
        .verify(&ContainerId::new("missing"), "10.0.0.5", "web")
        .await
        .unwrap_err();

    assert!(matches!(err, HealthError::Inspect(_)));
    assert_eq!(probe.calls(), 0);
}

#[tokio::test]
async fn http_probe_reports_status_code() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 1024];
        let n = socket.read(&mut buf).await.unwrap();
        let request = String::from_utf8_lossy(&buf[..n]).to_string();
        socket
            .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok")
            .await
            .unwrap();
        request
    });

    let probe = HttpHealthProbe::new(port, "/health");
    assert_eq!(probe.probe("127.0.0.1").await.unwrap(), 200);

    let request = server.await.unwrap();
    assert!(request.starts_with("GET /health HTTP/1.1\r\n"));
}

#[tokio::test]
async fn http_probe_connection_refused_is_an_error() {
    // Bind then drop to get a port nobody listens on.
    let port = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };

    let probe = HttpHealthProbe::new(port, "/health");
    assert!(probe.probe("127.0.0.1").await.is_err());
}
