use crate::agent::store::{Collection, Store, StoreData};
use crate::error::Result;
use parking_lot::RwLock;
use serde_json::Value;

/// In-memory implementation of Store
///
/// Records live for the lifetime of the store. Useful for tests and for
/// agents whose fixtures are rebuilt on every run.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<StoreData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything stored.
    pub fn snapshot(&self) -> StoreData {
        self.data.read().clone()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Collection>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn get_record(&self, key: &str, id: &str) -> Result<Option<Value>> {
        Ok(self.data.read().get_record(key, id).cloned())
    }

    fn create_record(&self, key: &str, id: &str, record: Value) -> Result<Option<Value>> {
        Ok(self.data.write().create_record(key, id, record))
    }

    fn update_record(&self, key: &str, id: &str, data: &Value) -> Result<Option<Value>> {
        Ok(self.data.write().update_record(key, id, data))
    }

    fn replace_record(&self, key: &str, id: &str, record: Value) -> Result<Option<Value>> {
        Ok(Some(self.data.write().replace_record(key, id, record)))
    }

    fn delete_record(&self, key: &str, id: &str) -> Result<bool> {
        Ok(self.data.write().delete_record(key, id))
    }

    fn reset(&self) -> Result<()> {
        self.data.write().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_memory_crud() {
        let store = MemoryStore::new();

        assert_eq!(store.get("users").unwrap(), None);
        store
            .create_record("users", "1", json!({"id": 1, "name": "Ada"}))
            .unwrap();
        assert_eq!(
            store.get_record("USERS", "1").unwrap(),
            Some(json!({"id": 1, "name": "Ada"}))
        );

        store
            .update_record("users", "1", &json!({"name": "Grace"}))
            .unwrap();
        assert_eq!(
            store.get_record("users", "1").unwrap(),
            Some(json!({"id": 1, "name": "Grace"}))
        );

        store.replace_record("users", "1", json!({"id": 1})).unwrap();
        assert_eq!(store.get_record("users", "1").unwrap(), Some(json!({"id": 1})));

        assert!(store.delete_record("users", "1").unwrap());
        assert_eq!(store.get_record("users", "1").unwrap(), None);
    }

    #[test]
    fn test_memory_reset() {
        let store = MemoryStore::new();
        store.create_record("users", "1", json!({})).unwrap();
        store.reset().unwrap();
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_concurrent_creates() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = vec![];

        for t in 0..8 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for i in 0..50 {
                    let id = format!("{t}-{i}");
                    store.create_record("items", &id, json!({"id": id})).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.get("items").unwrap().unwrap().len(), 400);
    }
}
