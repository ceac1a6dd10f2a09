//! Fixture data and store-backed REST endpoints.
//!
//! This module provides:
//! - `Agent`: declares fixture groups, seeds the record store and owns a
//!   lazily started `Server`
//! - `Store`: the record persistence interface with memory and file backends
//! - `RestRouter`: conventional list/show/create/replace/update/delete handlers
//!
//! Fixture ids produced by `make_ids` are keyed from 1.

pub mod backends;
mod core;
mod fixtures;
mod rest;
mod store;


pub use self::core::{uuid, Agent};
pub use backends::{create_store, FileStore, MemoryStore};
pub use fixtures::{Fixture, FixtureBuilder, FixtureGroup, GroupBuilder, IdMap};
pub use rest::{parse_body, ResourceKey, RestRouter};
pub use store::{id_key, normalize_key, Collection, Store, StoreData};
