// ABOUTME: Launch plan for a replacement container.
// ABOUTME: Translates a service specification into runtime configuration and a probe address.

use crate::manifest::{RestartPolicy, ServiceSpec};
use crate::runtime::{ContainerConfig, EndpointConfig, RestartPolicyConfig};

/// Probe host used when the service declares no network address.
pub const FALLBACK_ADDRESS: &str = "localhost";

/// Everything needed to create the replacement and check on it.
#[derive(Debug, Clone)]
pub struct LaunchPlan {
    pub config: ContainerConfig,
    /// Address of the last declared network, if it has one.
    pub address: Option<String>,
    /// Volume binds beyond the first. Only the first bind is mounted.
    pub ignored_binds: Vec<String>,
}

impl LaunchPlan {
    pub fn for_service(service: &ServiceSpec) -> Self {
        let env = service
            .environment
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect();

        let mut volumes = service.volumes.iter().cloned();
        let binds: Vec<String> = volumes.next().into_iter().collect();
        let ignored_binds: Vec<String> = volumes.collect();

        let endpoints: Vec<EndpointConfig> = service
            .networks
            .iter()
            .map(|network| EndpointConfig {
                network: network.name.clone(),
                ipv4_address: network.ipv4_address.clone(),
            })
            .collect();

        // Last declared network wins, even when it has no static address.
        let address = endpoints.last().and_then(|e| e.ipv4_address.clone());

        LaunchPlan {
            config: ContainerConfig {
                name: service.container_name.clone(),
                image: service.image.clone().into(),
                user: service.user.clone(),
                env,
                binds,
                restart_policy: restart_policy(&service.restart),
                endpoints,
            },
            address,
            ignored_binds,
        }
    }

    /// Host the health probe talks to.
    pub fn health_address(&self) -> &str {
        self.address.as_deref().unwrap_or(FALLBACK_ADDRESS)
    }
}

fn restart_policy(policy: &RestartPolicy) -> RestartPolicyConfig {
    match policy {
        RestartPolicy::No => RestartPolicyConfig::No,
        RestartPolicy::Always => RestartPolicyConfig::Always,
        RestartPolicy::UnlessStopped => RestartPolicyConfig::UnlessStopped,
        RestartPolicy::OnFailure { max_retries } => RestartPolicyConfig::OnFailure {
            max_retries: *max_retries,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::NetworkEndpoint;
    use crate::types::ImageRef;
    use std::collections::BTreeMap;

    fn service() -> ServiceSpec {
        ServiceSpec {
            name: "web".to_string(),
            container_name: "web-prod".to_string(),
            image: ImageRef::parse("repo/app:tag").unwrap(),
            user: Some("1000".to_string()),
            environment: BTreeMap::from([
                ("MODE".to_string(), "prod".to_string()),
                ("EMPTY".to_string(), String::new()),
            ]),
            volumes: vec![
                "/srv/data:/data:rw".to_string(),
                "/srv/logs:/logs:rw".to_string(),
            ],
            networks: vec![
                NetworkEndpoint {
                    name: "backend".to_string(),
                    ipv4_address: Some("10.0.0.5".to_string()),
                },
                NetworkEndpoint {
                    name: "frontend".to_string(),
                    ipv4_address: Some("10.1.0.7".to_string()),
                },
            ],
            restart: RestartPolicy::Always,
        }
    }

    #[test]
    fn only_first_bind_is_mounted() {
        let plan = LaunchPlan::for_service(&service());
        assert_eq!(plan.config.binds, ["/srv/data:/data:rw"]);
        assert_eq!(plan.ignored_binds, ["/srv/logs:/logs:rw"]);
    }

    #[test]
    fn environment_becomes_key_value_pairs() {
        let plan = LaunchPlan::for_service(&service());
        assert_eq!(plan.config.env, ["EMPTY=", "MODE=prod"]);
    }

    #[test]
    fn last_network_address_is_probed() {
        let plan = LaunchPlan::for_service(&service());
        assert_eq!(plan.config.endpoints.len(), 2);
        assert_eq!(plan.health_address(), "10.1.0.7");
    }

    #[test]
    fn last_network_without_address_falls_back() {
        let mut service = service();
        service.networks[1].ipv4_address = None;
        let plan = LaunchPlan::for_service(&service);
        assert_eq!(plan.address, None);
        assert_eq!(plan.health_address(), FALLBACK_ADDRESS);
    }

    #[test]
    fn restart_policy_is_carried_over() {
        let plan = LaunchPlan::for_service(&service());
        assert_eq!(plan.config.restart_policy, RestartPolicyConfig::Always);
        assert_eq!(plan.config.name, "web-prod");
        assert_eq!(plan.config.user.as_deref(), Some("1000"));
    }
}
