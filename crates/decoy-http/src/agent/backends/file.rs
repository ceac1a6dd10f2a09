use crate::agent::store::{Collection, Store, StoreData};
use crate::error::{DecoyError, Result};
use parking_lot::RwLock;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Store backed by a JSON file.
///
/// The file is read once when the store is opened and rewritten after every
/// mutation, so records survive between runs.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    data: RwLock<StoreData>,
}

impl FileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = Self::load(&path)?;
        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> Result<StoreData> {
        if !path.exists() {
            debug!("Store file {:?} does not exist, starting fresh", path);
            return Ok(StoreData::new());
        }

        let json = fs::read_to_string(path)
            .map_err(|e| DecoyError::Store(format!("failed to read {}: {e}", path.display())))?;
        if json.trim().is_empty() {
            return Ok(StoreData::new());
        }
        let data: StoreData = serde_json::from_str(&json)
            .map_err(|e| DecoyError::Store(format!("invalid store file {}: {e}", path.display())))?;

        info!("Loaded {} collections from {:?}", data.len(), path);
        Ok(data)
    }

    fn save(&self, data: &StoreData) -> Result<()> {
        let json = serde_json::to_string_pretty(data)
            .map_err(|e| DecoyError::Store(e.to_string()))?;
        fs::write(&self.path, json).map_err(|e| {
            DecoyError::Store(format!("failed to write {}: {e}", self.path.display()))
        })?;
        debug!("Saved {} collections to {:?}", data.len(), self.path);
        Ok(())
    }

    /// Apply `change` to a copy and keep it only once it is on disk.
    fn mutate<T>(&self, change: impl FnOnce(&mut StoreData) -> T) -> Result<T> {
        let mut data = self.data.write();
        let mut next = data.clone();
        let result = change(&mut next);
        self.save(&next)?;
        *data = next;
        Ok(result)
    }
}

impl Store for FileStore {
    fn get(&self, key: &str) -> Result<Option<Collection>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn get_record(&self, key: &str, id: &str) -> Result<Option<Value>> {
        Ok(self.data.read().get_record(key, id).cloned())
    }

    fn create_record(&self, key: &str, id: &str, record: Value) -> Result<Option<Value>> {
        self.mutate(|data| data.create_record(key, id, record))
    }

    fn update_record(&self, key: &str, id: &str, changes: &Value) -> Result<Option<Value>> {
        self.mutate(|data| data.update_record(key, id, changes))
    }

    fn replace_record(&self, key: &str, id: &str, record: Value) -> Result<Option<Value>> {
        self.mutate(|data| Some(data.replace_record(key, id, record)))
    }

    fn delete_record(&self, key: &str, id: &str) -> Result<bool> {
        self.mutate(|data| data.delete_record(key, id))
    }

    fn reset(&self) -> Result<()> {
        self.mutate(StoreData::clear)
    }
}
