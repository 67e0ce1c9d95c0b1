// ABOUTME: Compose manifest parsing into ordered service specifications.
// ABOUTME: Resolves variables, normalizes volumes and keeps networks in document order.

mod interpolate;
mod overlay;
mod restart_policy;

pub use interpolate::interpolate;
pub use overlay::EnvOverlay;
pub use restart_policy::RestartPolicy;

use crate::types::{ImageRef, ParseImageRefError};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Errors raised while turning a manifest into service specifications.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid manifest YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid env file {}: {source}", path.display())]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },

    #[error("cannot interpolate {input:?}: {message}")]
    Interpolation { input: String, message: String },

    #[error("manifest defines no services")]
    NoServices,

    #[error("service {service}: {message}")]
    InvalidService { service: String, message: String },

    #[error("service {service} has no image")]
    MissingImage { service: String },

    #[error("service {service} has an invalid image reference: {source}")]
    InvalidImage {
        service: String,
        source: ParseImageRefError,
    },
}

/// One network a service joins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkEndpoint {
    pub name: String,
    pub ipv4_address: Option<String>,
}

/// A service as the redeploy core consumes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    /// Key of the service in the manifest.
    pub name: String,
    pub container_name: String,
    pub image: ImageRef,
    pub user: Option<String>,
    pub environment: BTreeMap<String, String>,
    /// Bind specifications, normalized to `source:target:mode`.
    pub volumes: Vec<String>,
    /// Networks in document order.
    pub networks: Vec<NetworkEndpoint>,
    pub restart: RestartPolicy,
}

/// Where to find the manifest and how to resolve it.
#[derive(Debug, Clone)]
pub struct ManifestSource {
    pub path: PathBuf,
    pub project: String,
    /// Dotenv overlay; defaults to `.env` beside the manifest.
    pub env_file: Option<PathBuf>,
}

impl ManifestSource {
    fn env_file(&self) -> PathBuf {
        self.env_file
            .clone()
            .unwrap_or_else(|| base_dir(&self.path).join(".env"))
    }

    /// Build the overlay from the env file and process environment, then load.
    pub fn load(&self) -> Result<Vec<ServiceSpec>, ManifestError> {
        let overlay = EnvOverlay::load(Some(&self.env_file()))?;
        load(&self.path, &self.project, &overlay)
    }
}

/// Read, interpolate and parse the manifest at `path`.
pub fn load(
    path: &Path,
    project: &str,
    overlay: &EnvOverlay,
) -> Result<Vec<ServiceSpec>, ManifestError> {
    let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let services = parse(&content, project, &base_dir(path), overlay)?;
    tracing::debug!(path = %path.display(), services = services.len(), "loaded manifest");
    Ok(services)
}

fn base_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

// =============================================================================
// Raw document shape
// =============================================================================

#[derive(Debug, Deserialize)]
struct RawService {
    image: Option<String>,
    container_name: Option<String>,
    user: Option<String>,
    #[serde(default)]
    environment: RawEnvironment,
    #[serde(default)]
    volumes: Vec<RawVolume>,
    #[serde(default)]
    networks: RawNetworks,
    #[serde(default)]
    restart: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEnvironment {
    List(Vec<String>),
    Map(Mapping),
}

impl Default for RawEnvironment {
    fn default() -> Self {
        RawEnvironment::List(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawVolume {
    Short(String),
    Long {
        source: Option<String>,
        target: String,
        #[serde(default)]
        read_only: bool,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawNetworks {
    List(Vec<String>),
    Map(Mapping),
}

impl Default for RawNetworks {
    fn default() -> Self {
        RawNetworks::List(Vec::new())
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawEndpoint {
    ipv4_address: Option<String>,
}

// =============================================================================
// Parsing
// =============================================================================

/// Parse manifest text. Services are returned in document order.
pub fn parse(
    content: &str,
    project: &str,
    base_dir: &Path,
    overlay: &EnvOverlay,
) -> Result<Vec<ServiceSpec>, ManifestError> {
    let mut document: Value = serde_yaml::from_str(content)?;
    interpolate::interpolate_value(&mut document, overlay)?;

    let services = match document.get("services") {
        Some(Value::Mapping(services)) if !services.is_empty() => services,
        _ => return Err(ManifestError::NoServices),
    };

    services
        .iter()
        .map(|(key, raw)| {
            let name = scalar_string(key).ok_or_else(|| ManifestError::InvalidService {
                service: format!("{:?}", key),
                message: "service names must be strings".to_string(),
            })?;
            let raw: RawService = serde_yaml::from_value(raw.clone()).map_err(|e| {
                ManifestError::InvalidService {
                    service: name.clone(),
                    message: e.to_string(),
                }
            })?;
            build_service(name, raw, project, base_dir, overlay)
        })
        .collect()
}

fn build_service(
    name: String,
    raw: RawService,
    project: &str,
    base_dir: &Path,
    overlay: &EnvOverlay,
) -> Result<ServiceSpec, ManifestError> {
    let image = match raw.image.as_deref().map(str::trim) {
        None | Some("") => return Err(ManifestError::MissingImage { service: name }),
        Some(image) => ImageRef::parse(image).map_err(|source| ManifestError::InvalidImage {
            service: name.clone(),
            source,
        })?,
    };

    let container_name = match raw.container_name.as_deref().map(str::trim) {
        Some("") => {
            return Err(ManifestError::InvalidService {
                service: name,
                message: "container_name cannot be empty".to_string(),
            });
        }
        Some(container_name) => container_name.to_string(),
        None => format!("{}-{}-1", project, name),
    };

    let restart = raw
        .restart
        .as_deref()
        .unwrap_or_default()
        .parse::<RestartPolicy>()
        .map_err(|message| ManifestError::InvalidService {
            service: name.clone(),
            message,
        })?;

    let environment = environment(&name, raw.environment, overlay)?;
    let volumes = raw
        .volumes
        .into_iter()
        .map(|v| normalize_volume(v, base_dir))
        .collect();
    let networks = networks(&name, raw.networks)?;

    Ok(ServiceSpec {
        name,
        container_name,
        image,
        user: raw.user.filter(|u| !u.is_empty()),
        environment,
        volumes,
        networks,
        restart,
    })
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Entries without a value are taken from the overlay; if the overlay does
/// not have them either they are left out.
fn environment(
    service: &str,
    raw: RawEnvironment,
    overlay: &EnvOverlay,
) -> Result<BTreeMap<String, String>, ManifestError> {
    let mut env = BTreeMap::new();
    let mut resolve = |key: String, value: Option<String>| {
        match value.or_else(|| overlay.get(&key).map(str::to_string)) {
            Some(value) => {
                env.insert(key, value);
            }
            None => tracing::debug!(service, variable = %key, "environment entry has no value"),
        }
    };

    match raw {
        RawEnvironment::List(entries) => {
            for entry in entries {
                match entry.split_once('=') {
                    Some((key, value)) => resolve(key.to_string(), Some(value.to_string())),
                    None => resolve(entry, None),
                }
            }
        }
        RawEnvironment::Map(map) => {
            for (key, value) in map {
                let key = scalar_string(&key).ok_or_else(|| ManifestError::InvalidService {
                    service: service.to_string(),
                    message: "environment keys must be strings".to_string(),
                })?;
                let value = match value {
                    Value::Null => None,
                    other => Some(scalar_string(&other).ok_or_else(|| {
                        ManifestError::InvalidService {
                            service: service.to_string(),
                            message: format!("environment value for {} must be a scalar", key),
                        }
                    })?),
                };
                resolve(key, value);
            }
        }
    }

    Ok(env)
}

/// Normalize to `source:target:mode`, resolving relative host paths against
/// the manifest directory. Named volumes keep their name as the source.
fn normalize_volume(raw: RawVolume, base_dir: &Path) -> String {
    let (source, target, read_only) = match raw {
        RawVolume::Long {
            source,
            target,
            read_only,
        } => (source.unwrap_or_default(), target, read_only),
        RawVolume::Short(spec) => {
            let parts: Vec<&str> = spec.split(':').collect();
            match parts.as_slice() {
                [target] => (String::new(), (*target).to_string(), false),
                [source, target] => ((*source).to_string(), (*target).to_string(), false),
                [source, target, mode, ..] => (
                    (*source).to_string(),
                    (*target).to_string(),
                    mode.split(',').any(|m| m == "ro"),
                ),
                [] => (String::new(), spec.clone(), false),
            }
        }
    };

    let access = if read_only { "ro" } else { "rw" };
    if source.is_empty() {
        return target;
    }
    format!("{}:{}:{}", resolve_source(&source, base_dir), target, access)
}

fn resolve_source(source: &str, base_dir: &Path) -> String {
    if source == "." || source.starts_with("./") || source.starts_with("../") {
        let joined = base_dir.join(source);
        let absolute = std::path::absolute(&joined).unwrap_or(joined);
        return clean_path(&absolute).display().to_string();
    }
    source.to_string()
}

/// Lexically drop `.` and `..` components.
fn clean_path(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn networks(service: &str, raw: RawNetworks) -> Result<Vec<NetworkEndpoint>, ManifestError> {
    match raw {
        RawNetworks::List(names) => Ok(names
            .into_iter()
            .map(|name| NetworkEndpoint {
                name,
                ipv4_address: None,
            })
            .collect()),
        RawNetworks::Map(map) => map
            .into_iter()
            .map(|(key, value)| {
                let name = scalar_string(&key).ok_or_else(|| ManifestError::InvalidService {
                    service: service.to_string(),
                    message: "network names must be strings".to_string(),
                })?;
                let endpoint: RawEndpoint = match value {
                    Value::Null => RawEndpoint::default(),
                    other => serde_yaml::from_value(other).map_err(|e| {
                        ManifestError::InvalidService {
                            service: service.to_string(),
                            message: format!("network {}: {}", name, e),
                        }
                    })?,
                };
                Ok(NetworkEndpoint {
                    name,
                    ipv4_address: endpoint.ipv4_address.filter(|ip| !ip.is_empty()),
                })
            })
            .collect(),
    }
}
