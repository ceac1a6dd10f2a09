//! Record store configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    /// A JSON file that survives between runs.
    File,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Data file for the file backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    pub fn memory() -> Self {
        Self::default()
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: StoreBackend::File,
            path: Some(path.into()),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.backend == StoreBackend::File && self.path.is_none() {
            return Err("store.path is required when store.backend is 'file'".to_string());
        }
        Ok(())
    }
}
