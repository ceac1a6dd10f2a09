//! Record store backends.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use super::store::Store;
use crate::config::{StoreBackend, StoreConfig};
use crate::error::{DecoyError, Result};
use std::sync::Arc;
use tracing::info;

/// Create the store selected by `config`.
pub fn create_store(config: &StoreConfig) -> Result<Arc<dyn Store>> {
    match config.backend {
        StoreBackend::Memory => {
            info!("Using in-memory record store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::File => {
            let path = config.path.as_ref().ok_or_else(|| {
                DecoyError::Config("store.path is required for the file backend".to_string())
            })?;
            info!("Using file record store at {:?}", path);
            Ok(Arc::new(FileStore::open(path)?))
        }
    }
}
