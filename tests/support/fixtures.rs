// ABOUTME: Service specification fixtures.
// ABOUTME: Small builders so tests only spell out what they care about.

use compose_redeploy::manifest::{NetworkEndpoint, RestartPolicy, ServiceSpec};
use compose_redeploy::types::ImageRef;
use std::collections::BTreeMap;

pub fn service(name: &str, image: &str) -> ServiceSpec {
    ServiceSpec {
        name: name.to_string(),
        container_name: format!("{}-prod", name),
        image: ImageRef::parse(image).unwrap(),
        user: None,
        environment: BTreeMap::new(),
        volumes: Vec::new(),
        networks: vec![NetworkEndpoint {
            name: "backend".to_string(),
            ipv4_address: Some(format!("10.0.0.{}", name.len())),
        }],
        restart: RestartPolicy::UnlessStopped,
    }
}

/// `web`, `api`, `worker`, each with its own image.
pub fn three_services() -> Vec<ServiceSpec> {
    vec![
        service("web", "ghcr.io/team/web:prod"),
        service("api", "ghcr.io/team/api:prod"),
        service("worker", "ghcr.io/team/worker:prod"),
    ]
}
