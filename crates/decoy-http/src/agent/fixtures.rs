//! Fixture groups: declared records that are generated when the agent builds.

use super::store::{id_key, normalize_key};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Generated ids for one collection, keyed from 1.
pub type IdMap = BTreeMap<usize, Value>;

/// A record identified by an id.
#[derive(Debug, Clone, PartialEq)]
pub struct Fixture {
    pub id: Value,
    pub data: Value,
}

impl Fixture {
    pub fn new(id: impl Into<Value>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// The record with its `id` field filled in when the data lacks one.
    pub fn record(&self) -> Value {
        let mut data = self.data.clone();
        if let Value::Object(fields) = &mut data {
            fields
                .entry("id".to_string())
                .or_insert_with(|| self.id.clone());
        }
        data
    }
}

/// Handed to a group's builder while its fixtures are generated.
pub struct FixtureBuilder<'a> {
    key: &'a str,
    ids: &'a BTreeMap<String, IdMap>,
    fixtures: Vec<Fixture>,
}

impl<'a> FixtureBuilder<'a> {
    fn new(key: &'a str, ids: &'a BTreeMap<String, IdMap>) -> Self {
        Self {
            key,
            ids,
            fixtures: Vec::new(),
        }
    }

    /// Key of the group being built.
    pub fn key(&self) -> &str {
        self.key
    }

    /// Declare a fixture.
    pub fn fixture(&mut self, id: impl Into<Value>, data: Value) -> &mut Self {
        self.fixtures.push(Fixture::new(id, data));
        self
    }

    /// Ids generated for `key` by `Agent::make_ids`.
    pub fn ids(&self, key: &str) -> IdMap {
        self.ids.get(&normalize_key(key)).cloned().unwrap_or_default()
    }

    /// The `n`th id (1-based) generated for `key`.
    pub fn id(&self, key: &str, n: usize) -> Option<Value> {
        self.ids
            .get(&normalize_key(key))
            .and_then(|ids| ids.get(&n))
            .cloned()
    }
}

pub type GroupBuilder = Arc<dyn Fn(&mut FixtureBuilder<'_>) + Send + Sync>;

/// A keyed set of fixtures produced by a builder callback.
///
/// The builder runs at most once until the group is reset.
#[derive(Clone)]
pub struct FixtureGroup {
    key: String,
    builder: GroupBuilder,
    fixtures: Vec<Fixture>,
    built: bool,
}

impl std::fmt::Debug for FixtureGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixtureGroup")
            .field("key", &self.key)
            .field("fixtures", &self.fixtures)
            .field("built", &self.built)
            .finish()
    }
}

impl FixtureGroup {
    pub fn new<F>(key: &str, builder: F) -> Self
    where
        F: Fn(&mut FixtureBuilder<'_>) + Send + Sync + 'static,
    {
        Self {
            key: normalize_key(key),
            builder: Arc::new(builder),
            fixtures: Vec::new(),
            built: false,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    pub fn build(&mut self, ids: &BTreeMap<String, IdMap>) {
        let mut builder = FixtureBuilder::new(&self.key, ids);
        (self.builder)(&mut builder);
        self.fixtures = builder.fixtures;
        self.built = true;
    }

    /// `(id, record)` pairs in declaration order, building first if needed.
    pub fn records(&mut self, ids: &BTreeMap<String, IdMap>) -> Vec<(String, Value)> {
        if !self.built {
            self.build(ids);
        }
        self.fixtures
            .iter()
            .map(|fixture| (id_key(&fixture.id), fixture.record()))
            .collect()
    }

    pub fn reset(&mut self) {
        self.built = false;
        self.fixtures.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_fixture_injects_missing_id() {
        let fixture = Fixture::new(3, json!({"name": "Ada"}));
        assert_eq!(fixture.record(), json!({"id": 3, "name": "Ada"}));

        let fixture = Fixture::new(3, json!({"id": "custom"}));
        assert_eq!(fixture.record(), json!({"id": "custom"}));
    }

    #[test]
    fn test_group_builds_once_until_reset() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let mut group = FixtureGroup::new("users", move |g| {
            counter.fetch_add(1, Ordering::SeqCst);
            g.fixture(1, json!({"name": "Ada"}))
                .fixture(2, json!({"name": "Grace"}));
        });
        let ids = BTreeMap::new();

        assert_eq!(group.key(), "USERS");
        let records = group.records(&ids);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], ("1".to_string(), json!({"id": 1, "name": "Ada"})));
        group.records(&ids);
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        group.reset();
        assert!(!group.is_built());
        group.records(&ids);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_builder_reads_generated_ids() {
        let mut ids = BTreeMap::new();
        ids.insert(
            "USERS".to_string(),
            IdMap::from([(1, json!("u-1")), (2, json!("u-2"))]),
        );

        let mut group = FixtureGroup::new("posts", |g| {
            let author = g.id("users", 2).unwrap_or(Value::Null);
            g.fixture(1, json!({"author": author}));
        });

        let records = group.records(&ids);
        assert_eq!(records[0].1, json!({"id": 1, "author": "u-2"}));
    }
}
