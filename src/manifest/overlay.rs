// ABOUTME: Environment overlay used to resolve manifest variables.
// ABOUTME: Merges a dotenv file with the process environment, process values winning.

use super::ManifestError;
use std::collections::HashMap;
use std::path::Path;

/// Variables visible to manifest interpolation.
#[derive(Debug, Clone, Default)]
pub struct EnvOverlay {
    vars: HashMap<String, String>,
}

impl EnvOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the overlay the way `docker compose` does: dotenv file first,
    /// then the process environment on top. A missing file is not an error.
    ///
    /// The file is only read; nothing is exported into the process environment.
    pub fn load(env_file: Option<&Path>) -> Result<Self, ManifestError> {
        let mut overlay = Self::new();
        if let Some(path) = env_file
            && path.exists()
        {
            let env_file_error = |source| ManifestError::EnvFile {
                path: path.to_path_buf(),
                source,
            };
            for entry in dotenvy::from_path_iter(path).map_err(env_file_error)? {
                let (key, value) = entry.map_err(env_file_error)?;
                overlay.vars.insert(key, value);
            }
            tracing::debug!(path = %path.display(), vars = overlay.len(), "loaded env file");
        }
        overlay.vars.extend(std::env::vars());
        Ok(overlay)
    }

    /// Set one variable, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl FromIterator<(String, String)> for EnvOverlay {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().collect(),
        }
    }
}
