//! Configuration types for Decoy.

mod policy;
mod store;

use crate::transport::DEFAULT_CHUNK_SIZE;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub use policy::FailurePolicy;
pub use store::{StoreBackend, StoreConfig};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecoyConfig {
    /// Characters delivered per loading step by fake transports
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Generate UUID fixture ids instead of sequential ones
    #[serde(default = "default_use_uuid")]
    pub use_uuid: bool,

    #[serde(default)]
    pub store: StoreConfig,

    /// Reaction to requests no route matches
    #[serde(default)]
    pub unhandled: FailurePolicy,

    /// Reaction to handlers that fail
    #[serde(default)]
    pub errored: FailurePolicy,

    /// Seed records per collection
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fixtures: BTreeMap<String, Vec<serde_json::Value>>,

    /// REST routes served from the store, e.g. `/users` and `/users/:id`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_use_uuid() -> bool {
    true
}

impl Default for DecoyConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            use_uuid: default_use_uuid(),
            store: StoreConfig::default(),
            unhandled: FailurePolicy::default(),
            errored: FailurePolicy::default(),
            fixtures: BTreeMap::new(),
            resources: Vec::new(),
        }
    }
}

impl DecoyConfig {
    /// Load from a `.yaml`/`.yml` file, or JSON for any other extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;

        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        );
        let config: DecoyConfig = if is_yaml {
            serde_yaml::from_str(&contents)
                .with_context(|| format!("invalid YAML in {}", path.display()))?
        } else {
            serde_json::from_str(&contents)
                .with_context(|| format!("invalid JSON in {}", path.display()))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.chunk_size == 0 {
            anyhow::bail!("chunkSize must be greater than zero");
        }

        self.store.validate().map_err(|e| anyhow::anyhow!(e))?;

        for (key, records) in &self.fixtures {
            if let Some(index) = records.iter().position(|record| !record.is_object()) {
                anyhow::bail!("fixture {}[{}] must be an object", key, index);
            }
        }

        for resource in &self.resources {
            if !resource.starts_with('/') {
                anyhow::bail!("resource route '{}' must start with '/'", resource);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config: DecoyConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.chunk_size, 10);
        assert!(config.use_uuid);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.unhandled, FailurePolicy::Error);
        assert_eq!(config.errored, FailurePolicy::Error);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_yaml_file() {
        let yaml = r#"
chunkSize: 4
useUuid: false
unhandled: log
store:
  backend: file
  path: /tmp/decoy-store.json
fixtures:
  users:
    - name: Ada
    - name: Grace
resources:
  - /users
  - /users/:id
"#;
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let config = DecoyConfig::from_file(file.path()).unwrap();
        assert_eq!(config.chunk_size, 4);
        assert!(!config.use_uuid);
        assert_eq!(config.unhandled, FailurePolicy::Log);
        assert_eq!(config.errored, FailurePolicy::Error);
        assert_eq!(config.store.backend, StoreBackend::File);
        assert_eq!(config.fixtures["users"].len(), 2);
        assert_eq!(config.resources, vec!["/users", "/users/:id"]);
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(br#"{"chunkSize": 2, "errored": "log"}"#).unwrap();

        let config = DecoyConfig::from_file(file.path()).unwrap();
        assert_eq!(config.chunk_size, 2);
        assert_eq!(config.errored, FailurePolicy::Log);
    }

    #[test]
    fn test_validation_failures() {
        let config = DecoyConfig {
            chunk_size: 0,
            ..DecoyConfig::default()
        };
        assert!(config.validate().is_err());

        let config = DecoyConfig {
            store: StoreConfig {
                backend: StoreBackend::File,
                path: None,
            },
            ..DecoyConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("store.path"));

        let mut config = DecoyConfig::default();
        config
            .fixtures
            .insert("users".into(), vec![serde_json::json!("not an object")]);
        assert!(config.validate().is_err());

        let config = DecoyConfig {
            resources: vec!["users".into()],
            ..DecoyConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_has_context() {
        let err = DecoyConfig::from_file("/nonexistent/decoy.yaml").unwrap_err();
        assert!(err.to_string().contains("failed to read config"));
    }
}
