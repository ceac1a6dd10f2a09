//! The `Agent`: fixture declaration, record store access and a lazily
//! started interception server.

use super::backends::create_store;
use super::fixtures::{FixtureBuilder, FixtureGroup, IdMap};
use super::rest::RestRouter;
use super::store::{id_key, normalize_key, Collection, Store};
use crate::config::DecoyConfig;
use crate::error::{DecoyError, Result};
use crate::server::{PolicyHooks, Server};
use crate::transport::TransportBinding;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Random version 4 UUID in hyphenated lower-case form.
pub fn uuid() -> String {
    ::uuid::Uuid::new_v4().to_string()
}

/// Settle the id of `record` before it is stored under `key`.
///
/// An existing `id` field wins. Otherwise a UUID or the next free sequential
/// number is generated and written into the record.
pub(crate) fn assign_id(
    store: &dyn Store,
    key: &str,
    record: &mut Value,
    use_uuid: bool,
) -> Result<String> {
    if let Some(id) = record.get("id").filter(|id| !id.is_null()) {
        return Ok(id_key(id));
    }

    let id = if use_uuid {
        Value::String(uuid())
    } else {
        let existing = store.get(key)?.unwrap_or_default();
        let mut next = existing.len() + 1;
        while existing.contains_key(&next.to_string()) {
            next += 1;
        }
        Value::from(next)
    };

    if let Value::Object(fields) = record {
        fields.insert("id".to_string(), id.clone());
    }
    Ok(id_key(&id))
}

/// Builds fixture data into a record store and serves it through a fake
/// server.
pub struct Agent {
    config: DecoyConfig,
    store: Arc<dyn Store>,
    fixture_ids: BTreeMap<String, IdMap>,
    groups: Vec<FixtureGroup>,
    binding: Arc<TransportBinding>,
    server: Option<Server>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("config", &self.config)
            .field("fixture_ids", &self.fixture_ids)
            .field("groups", &self.groups)
            .field("server", &self.server)
            .finish_non_exhaustive()
    }
}

impl Agent {
    /// An agent whose server intercepts the process-wide binding.
    pub fn new(config: DecoyConfig) -> Result<Self> {
        Self::with_binding(config, TransportBinding::global())
    }

    /// An agent whose server intercepts `binding`.
    pub fn with_binding(config: DecoyConfig, binding: Arc<TransportBinding>) -> Result<Self> {
        config
            .validate()
            .map_err(|e| DecoyError::Config(e.to_string()))?;
        let store = create_store(&config.store)?;
        Ok(Self::with_store(config, store, binding))
    }

    /// An agent over an already constructed store.
    pub fn with_store(
        config: DecoyConfig,
        store: Arc<dyn Store>,
        binding: Arc<TransportBinding>,
    ) -> Self {
        Self {
            config,
            store,
            fixture_ids: BTreeMap::new(),
            groups: Vec::new(),
            binding,
            server: None,
        }
    }

    pub fn config(&self) -> &DecoyConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<dyn Store> {
        Arc::clone(&self.store)
    }

    pub fn uuid(&self) -> String {
        uuid()
    }

    pub fn set_use_uuid(&mut self, use_uuid: bool) {
        self.config.use_uuid = use_uuid;
    }

    // ------------------------------------------------------------------
    // Ids
    // ------------------------------------------------------------------

    /// Generate `count` ids for `key`, keyed 1 through `count`.
    ///
    /// Entries already present under those positions are overwritten.
    pub fn make_ids(&mut self, key: &str, count: usize) -> &IdMap {
        let use_uuid = self.config.use_uuid;
        let ids = self.fixture_ids.entry(normalize_key(key)).or_default();
        for position in 1..=count {
            let id = if use_uuid {
                Value::String(uuid())
            } else {
                Value::from(position)
            };
            ids.insert(position, id);
        }
        ids
    }

    pub fn set_ids(&mut self, key: &str, ids: IdMap) {
        self.fixture_ids.insert(normalize_key(key), ids);
    }

    pub fn get_ids(&self, key: &str) -> IdMap {
        self.fixture_ids
            .get(&normalize_key(key))
            .cloned()
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Fixtures
    // ------------------------------------------------------------------

    /// Declare a fixture group; its builder runs on the next `build`.
    pub fn group<F>(&mut self, key: &str, builder: F) -> &mut Self
    where
        F: Fn(&mut FixtureBuilder<'_>) + Send + Sync + 'static,
    {
        self.groups.push(FixtureGroup::new(key, builder));
        self
    }

    pub fn groups(&self) -> &[FixtureGroup] {
        &self.groups
    }

    /// Seed the store with configured fixtures, then with every group.
    ///
    /// Records whose id is already stored are left untouched.
    pub fn build(&mut self) -> Result<&mut Self> {
        let mut seeded = 0;

        for (key, records) in &self.config.fixtures {
            for record in records {
                let mut record = record.clone();
                let id = assign_id(self.store.as_ref(), key, &mut record, self.config.use_uuid)?;
                if self.store.create_record(key, &id, record)?.is_some() {
                    seeded += 1;
                }
            }
        }

        for group in &mut self.groups {
            for (id, record) in group.records(&self.fixture_ids) {
                if self.store.create_record(group.key(), &id, record)?.is_some() {
                    seeded += 1;
                }
            }
        }

        info!("Built {} fixture records", seeded);
        Ok(self)
    }

    /// Empty the store and mark every group as unbuilt.
    pub fn reset(&mut self) -> Result<()> {
        for group in &mut self.groups {
            group.reset();
        }
        self.store.reset()?;
        debug!("Agent reset");
        Ok(())
    }

    pub fn rebuild(&mut self) -> Result<&mut Self> {
        self.reset()?;
        self.build()
    }

    // ------------------------------------------------------------------
    // Records
    // ------------------------------------------------------------------

    /// Every record stored under `key`.
    pub fn fixtures(&self, key: &str) -> Result<Option<Collection>> {
        self.store.get(key)
    }

    pub fn get_record(&self, key: &str, id: &str) -> Result<Option<Value>> {
        self.store.get_record(key, id)
    }

    /// Store `data`, generating an id when it has none.
    pub fn create_record(&self, key: &str, mut data: Value) -> Result<Option<Value>> {
        let id = assign_id(self.store.as_ref(), key, &mut data, self.config.use_uuid)?;
        self.store.create_record(key, &id, data)
    }

    pub fn update_record(&self, key: &str, id: &str, data: &Value) -> Result<Option<Value>> {
        self.store.update_record(key, id, data)
    }

    pub fn replace_record(&self, key: &str, id: &str, data: Value) -> Result<Option<Value>> {
        self.store.replace_record(key, id, data)
    }

    pub fn delete_record(&self, key: &str, id: &str) -> Result<bool> {
        self.store.delete_record(key, id)
    }

    // ------------------------------------------------------------------
    // Server
    // ------------------------------------------------------------------

    /// A router registering store-backed REST handlers.
    pub fn rest(&self) -> RestRouter {
        RestRouter::new(Arc::clone(&self.store), self.config.use_uuid)
    }

    fn start_server(&self) -> Result<Server> {
        let mut server = Server::intercept(Arc::clone(&self.binding));
        server.set_chunk_size(self.config.chunk_size);
        server.set_hooks(Arc::new(PolicyHooks::new(
            self.config.unhandled,
            self.config.errored,
        )));

        let router = self.rest();
        for route in &self.config.resources {
            router.resource(&server, route)?;
        }
        info!(
            "Agent server started with {} resource routes",
            self.config.resources.len()
        );
        Ok(server)
    }

    /// The agent's server, started on first use.
    pub fn server(&mut self) -> Result<&Server> {
        let server = match self.server.take() {
            Some(server) => server,
            None => self.start_server()?,
        };
        Ok(&*self.server.insert(server))
    }

    pub fn is_serving(&self) -> bool {
        self.server.is_some()
    }

    /// Stop the server and restore the binding it intercepted.
    pub fn shutdown(&mut self) {
        if let Some(mut server) = self.server.take() {
            server.shutdown();
        }
    }
}
