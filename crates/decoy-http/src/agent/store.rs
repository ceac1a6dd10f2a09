//! Record store abstraction.
//!
//! A store holds fixture records grouped by collection key. Keys are
//! case-insensitive (normalized to upper case) and records are addressed by
//! the string form of their id.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Records of one collection, keyed by id.
pub type Collection = BTreeMap<String, Value>;

/// Normalize a collection key.
pub fn normalize_key(key: &str) -> String {
    key.to_uppercase()
}

/// String form of a record id: strings as-is, anything else as JSON text.
pub fn id_key(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Capability interface over record persistence.
///
/// Lookups that find nothing return `Ok(None)`; `Err` is reserved for
/// backend failures.
pub trait Store: Send + Sync {
    /// Every record under `key`, or `None` if the collection was never written.
    fn get(&self, key: &str) -> Result<Option<Collection>>;

    fn get_record(&self, key: &str, id: &str) -> Result<Option<Value>>;

    /// Insert a record. Returns `None` without touching the store if the id is taken.
    fn create_record(&self, key: &str, id: &str, record: Value) -> Result<Option<Value>>;

    /// Overwrite the fields of an existing record that `data` also carries.
    ///
    /// Fields absent from the stored record are ignored.
    fn update_record(&self, key: &str, id: &str, data: &Value) -> Result<Option<Value>>;

    /// Store `record` under `id`, replacing whatever was there.
    fn replace_record(&self, key: &str, id: &str, record: Value) -> Result<Option<Value>>;

    /// Returns whether a record was removed.
    fn delete_record(&self, key: &str, id: &str) -> Result<bool>;

    fn reset(&self) -> Result<()>;
}

/// The data every backend manipulates: collections keyed by normalized key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreData {
    collections: BTreeMap<String, Collection>,
}

impl StoreData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Collection> {
        self.collections.get(&normalize_key(key))
    }

    pub fn get_record(&self, key: &str, id: &str) -> Option<&Value> {
        self.get(key).and_then(|collection| collection.get(id))
    }

    pub fn create_record(&mut self, key: &str, id: &str, record: Value) -> Option<Value> {
        if self.get_record(key, id).is_some() {
            return None;
        }
        Some(self.replace_record(key, id, record))
    }

    pub fn update_record(&mut self, key: &str, id: &str, data: &Value) -> Option<Value> {
        let record = self
            .collections
            .get_mut(&normalize_key(key))?
            .get_mut(id)?;

        if let (Value::Object(existing), Value::Object(changes)) = (&mut *record, data) {
            for (field, value) in changes {
                if let Some(slot) = existing.get_mut(field) {
                    *slot = value.clone();
                }
            }
        }
        Some(record.clone())
    }

    pub fn replace_record(&mut self, key: &str, id: &str, record: Value) -> Value {
        self.collections
            .entry(normalize_key(key))
            .or_default()
            .insert(id.to_string(), record.clone());
        record
    }

    pub fn delete_record(&mut self, key: &str, id: &str) -> bool {
        self.collections
            .get_mut(&normalize_key(key))
            .and_then(|collection| collection.remove(id))
            .is_some()
    }

    pub fn clear(&mut self) {
        self.collections.clear();
    }
}
