// ABOUTME: Container image reference parsing and validation.
// ABOUTME: Handles nginx, nginx:tag, registry/image:tag@digest and the engine's familiar form.

use serde::de::{self, Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const DEFAULT_REGISTRY: &str = "docker.io";
const OFFICIAL_NAMESPACE: &str = "library/";

#[derive(Debug, Error)]
pub enum ParseImageRefError {
    #[error("image reference cannot be empty")]
    Empty,

    #[error("invalid character in image reference: {0}")]
    InvalidChar(char),

    #[error("invalid image reference format: {0}")]
    InvalidFormat(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    registry: Option<String>,
    name: String,
    tag: Option<String>,
    digest: Option<String>,
}

impl ImageRef {
    pub fn parse(input: &str) -> Result<Self, ParseImageRefError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseImageRefError::Empty);
        }

        if let Some(c) = input
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && !"/:.-_@".contains(*c))
        {
            return Err(ParseImageRefError::InvalidChar(c));
        }

        let (without_digest, digest) = match input.split_once('@') {
            Some((before, after)) if !after.is_empty() => (before, Some(after.to_string())),
            Some(_) => return Err(ParseImageRefError::InvalidFormat(input.to_string())),
            None => (input, None),
        };

        // A colon followed by a slash belongs to a registry port, not a tag.
        let (without_tag, tag) = match without_digest.rsplit_once(':') {
            Some((before, after)) if !after.contains('/') => {
                if after.is_empty() {
                    return Err(ParseImageRefError::InvalidFormat(input.to_string()));
                }
                (before, Some(after.to_string()))
            }
            _ => (without_digest, None),
        };

        let (registry, name) = Self::parse_registry_and_name(without_tag)?;

        let tag = match (&tag, &digest) {
            (None, None) => Some("latest".to_string()),
            _ => tag,
        };

        Ok(Self {
            registry,
            name,
            tag,
            digest,
        })
    }

    fn parse_registry_and_name(
        input: &str,
    ) -> Result<(Option<String>, String), ParseImageRefError> {
        if input.is_empty() || input.starts_with('/') || input.ends_with('/') {
            return Err(ParseImageRefError::InvalidFormat(input.to_string()));
        }

        match input.split_once('/') {
            None => Ok((None, input.to_string())),
            Some((first, rest))
                if first.contains('.') || first.contains(':') || first == "localhost" =>
            {
                Ok((Some(first.to_string()), rest.to_string()))
            }
            Some(_) => Ok((None, input.to_string())),
        }
    }

    pub fn registry(&self) -> Option<&str> {
        self.registry.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// The form the Docker engine prints in pull status messages.
    ///
    /// Docker Hub references lose their `docker.io/` registry and the
    /// `library/` namespace of official images, so `docker.io/library/nginx`
    /// is reported as `nginx:latest`.
    pub fn familiar(&self) -> String {
        let registry = self
            .registry
            .as_deref()
            .filter(|r| *r != DEFAULT_REGISTRY && *r != "index.docker.io");

        let name = match registry {
            None => self
                .name
                .strip_prefix(OFFICIAL_NAMESPACE)
                .unwrap_or(&self.name),
            Some(_) => &self.name,
        };

        let mut out = String::new();
        if let Some(registry) = registry {
            out.push_str(registry);
            out.push('/');
        }
        out.push_str(name);
        if let Some(ref tag) = self.tag {
            out.push(':');
            out.push_str(tag);
        }
        if let Some(ref digest) = self.digest {
            out.push('@');
            out.push_str(digest);
        }
        out
    }
}

impl FromStr for ImageRef {
    type Err = ParseImageRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref registry) = self.registry {
            write!(f, "{}/", registry)?;
        }
        write!(f, "{}", self.name)?;
        if let Some(ref tag) = self.tag {
            write!(f, ":{}", tag)?;
        }
        if let Some(ref digest) = self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for ImageRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
