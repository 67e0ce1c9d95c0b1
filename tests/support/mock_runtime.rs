// ABOUTME: In-memory container runtime that records every call.
// ABOUTME: Containers, pull output and failures are scripted per test.

use async_trait::async_trait;
use bollard::auth::DockerCredentials;
use compose_redeploy::redeploy::up_to_date_marker;
use compose_redeploy::runtime::{
    ContainerConfig, ContainerError, ContainerFilters, ContainerInfo, ContainerOps,
    ContainerState, ContainerSummary, EndpointConfig, ImageError, ImageOps, PullStream,
    RegistryAuth,
};
use compose_redeploy::types::{ContainerId, ImageId, ImageRef};
use futures::stream;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// One recorded runtime call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List,
    Inspect(String),
    RemoveContainer(String),
    Pull {
        image: String,
        credentials: Option<DockerCredentials>,
    },
    Create(Created),
    Start(String),
    RemoveImage(String),
}

/// What a create call asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Created {
    pub name: String,
    pub image: String,
    pub user: Option<String>,
    pub env: Vec<String>,
    pub binds: Vec<String>,
    pub endpoints: Vec<EndpointConfig>,
}

#[derive(Default)]
struct State {
    containers: Vec<ContainerSummary>,
    pulls: HashMap<String, Vec<Result<String, String>>>,
    names: HashMap<String, String>,
    fail_create: HashSet<String>,
    fail_start: HashSet<String>,
    fail_remove_image: bool,
    not_running_polls: u32,
    never_running: bool,
    next_id: u32,
    calls: Vec<Call>,
}

#[derive(Default)]
pub struct MockRuntime {
    state: Mutex<State>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// A running container named `/{name}` built from `image_id`.
    pub fn with_container(self, name: &str, id: &str, image_id: &str) -> Self {
        self.state.lock().unwrap().containers.push(ContainerSummary {
            id: ContainerId::new(id),
            names: vec![format!("/{}", name)],
            image: "whatever".to_string(),
            image_id: ImageId::new(image_id),
            state: "running".to_string(),
        });
        self
    }

    /// Make pulls of `image` report that nothing new was downloaded.
    pub fn up_to_date(self, image: &str) -> Self {
        let reference = ImageRef::parse(image).unwrap();
        let record = format!(r#"{{"status":"{}"}}"#, up_to_date_marker(&reference));
        self.with_pull(
            image,
            vec![
                Ok(r#"{"status":"Pulling from team/app"}"#.to_string()),
                Ok(r#"{"status":"Digest: sha256:feed"}"#.to_string()),
                Ok(record),
            ],
        )
    }

    pub fn with_pull(self, image: &str, records: Vec<Result<String, String>>) -> Self {
        let key = ImageRef::parse(image).unwrap().to_string();
        self.state.lock().unwrap().pulls.insert(key, records);
        self
    }

    pub fn fail_create(self, name: &str) -> Self {
        self.state.lock().unwrap().fail_create.insert(name.to_string());
        self
    }

    /// Fail the next start of a container with this name.
    pub fn fail_start(self, name: &str) -> Self {
        self.state.lock().unwrap().fail_start.insert(name.to_string());
        self
    }

    pub fn fail_remove_image(self) -> Self {
        self.state.lock().unwrap().fail_remove_image = true;
        self
    }

    /// Report "created" for the first `polls` inspects.
    pub fn running_after(self, polls: u32) -> Self {
        self.state.lock().unwrap().not_running_polls = polls;
        self
    }

    pub fn never_running(self) -> Self {
        self.state.lock().unwrap().never_running = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn removed_images(&self) -> Vec<String> {
        self.filter(|c| match c {
            Call::RemoveImage(id) => Some(id.clone()),
            _ => None,
        })
    }

    pub fn removed_containers(&self) -> Vec<String> {
        self.filter(|c| match c {
            Call::RemoveContainer(id) => Some(id.clone()),
            _ => None,
        })
    }

    pub fn created(&self) -> Vec<Created> {
        self.filter(|c| match c {
            Call::Create(created) => Some(created.clone()),
            _ => None,
        })
    }

    pub fn started(&self) -> Vec<String> {
        self.filter(|c| match c {
            Call::Start(id) => Some(id.clone()),
            _ => None,
        })
    }

    pub fn pulls(&self) -> Vec<(String, Option<DockerCredentials>)> {
        self.filter(|c| match c {
            Call::Pull { image, credentials } => Some((image.clone(), credentials.clone())),
            _ => None,
        })
    }

    pub fn inspects(&self) -> usize {
        self.filter(|c| match c {
            Call::Inspect(_) => Some(()),
            _ => None,
        })
        .len()
    }

    fn filter<T>(&self, f: impl Fn(&Call) -> Option<T>) -> Vec<T> {
        self.state.lock().unwrap().calls.iter().filter_map(f).collect()
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl ContainerOps for MockRuntime {
    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError> {
        self.record(Call::List);
        let state = self.state.lock().unwrap();
        // Substring match, like the engine's name filter.
        Ok(state
            .containers
            .iter()
            .filter(|c| match &filters.name {
                Some(name) => c.names.iter().any(|n| n.contains(name.as_str())),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerInfo, ContainerError> {
        self.record(Call::Inspect(id.to_string()));
        let mut state = self.state.lock().unwrap();
        let name = state
            .names
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;

        let running = if state.never_running {
            false
        } else if state.not_running_polls > 0 {
            state.not_running_polls -= 1;
            false
        } else {
            true
        };

        Ok(ContainerInfo {
            id: id.clone(),
            name,
            state: if running {
                ContainerState::Running
            } else {
                ContainerState::Created
            },
        })
    }

    async fn remove_container(&self, id: &ContainerId, _force: bool) -> Result<(), ContainerError> {
        self.record(Call::RemoveContainer(id.to_string()));
        let mut state = self.state.lock().unwrap();
        state.containers.retain(|c| c.id != *id);
        state.names.remove(id.as_str());
        Ok(())
    }

    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<ContainerId, ContainerError> {
        self.record(Call::Create(Created {
            name: config.name.clone(),
            image: config.image.to_string(),
            user: config.user.clone(),
            env: config.env.clone(),
            binds: config.binds.clone(),
            endpoints: config.endpoints.clone(),
        }));

        let mut state = self.state.lock().unwrap();
        if state.fail_create.contains(&config.name) {
            return Err(ContainerError::AlreadyExists(config.name.clone()));
        }
        state.next_id += 1;
        let id = format!("new-{}-{}", config.name, state.next_id);
        state.names.insert(id.clone(), config.name.clone());
        Ok(ContainerId::new(id))
    }

    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        self.record(Call::Start(id.to_string()));
        let mut state = self.state.lock().unwrap();
        let name = state
            .names
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        // Start failures are one-shot, so a restored container can come up.
        if state.fail_start.remove(&name) {
            return Err(ContainerError::Runtime(format!("cannot start {}", name)));
        }
        Ok(())
    }
}

#[async_trait]
impl ImageOps for MockRuntime {
    async fn pull_image(
        &self,
        reference: &ImageRef,
        auth: Option<&RegistryAuth>,
    ) -> Result<PullStream, ImageError> {
        self.record(Call::Pull {
            image: reference.to_string(),
            credentials: auth.map(|a| a.credentials.clone()),
        });

        let records = self
            .state
            .lock()
            .unwrap()
            .pulls
            .get(&reference.to_string())
            .cloned()
            .unwrap_or_else(|| {
                vec![
                    Ok(r#"{"status":"Pulling fs layer","id":"a1b2"}"#.to_string()),
                    Ok(format!(
                        r#"{{"status":"Status: Downloaded newer image for {}"}}"#,
                        reference.familiar()
                    )),
                ]
            });

        let items: Vec<Result<String, ImageError>> = records
            .into_iter()
            .map(|r| r.map_err(ImageError::PullFailed))
            .collect();
        Ok(Box::pin(stream::iter(items)))
    }

    async fn remove_image(&self, id: &ImageId, _force: bool) -> Result<(), ImageError> {
        self.record(Call::RemoveImage(id.to_string()));
        if self.state.lock().unwrap().fail_remove_image {
            return Err(ImageError::InUse(id.to_string()));
        }
        Ok(())
    }
}
