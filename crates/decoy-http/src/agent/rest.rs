//! Conventional REST endpoints backed by the record store.
//!
//! A route such as `/users/:id` serves the `users` collection: the collection
//! key is the last static segment and a trailing `:param` segment addresses a
//! single record. Responses carry `{ "<key>": [records...] }` as JSON.

use super::core::assign_id;
use super::store::Store;
use crate::error::{DecoyError, Result};
use crate::recognizer::query::{self, QueryParams, QueryValue};
use crate::server::{HandlerResult, InterceptedRequest, Method, RouteHandler, Server};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::debug;

/// Collection key and id parameter derived from a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceKey {
    pub key: String,
    /// Name of the trailing id parameter, without the leading `:`.
    pub param: Option<String>,
}

impl ResourceKey {
    /// Derive the key from `route` unless `key` overrides it.
    pub fn parse(route: &str, key: Option<&str>) -> Self {
        let segments: Vec<&str> = route.split('/').filter(|s| !s.is_empty()).collect();
        let param = segments
            .last()
            .and_then(|last| last.strip_prefix(':'))
            .map(str::to_string);

        let derived = segments
            .iter()
            .rev()
            .find(|segment| !segment.starts_with(':') && !segment.starts_with('*'))
            .map(|segment| segment.to_string())
            .unwrap_or_default();

        Self {
            key: key.map(str::to_string).unwrap_or(derived),
            param,
        }
    }

    fn id<'r>(&self, request: &'r InterceptedRequest) -> Option<&'r str> {
        self.param.as_deref().and_then(|name| request.param(name))
    }
}

/// Registers store-backed handlers on a [`Server`].
#[derive(Clone)]
pub struct RestRouter {
    store: Arc<dyn Store>,
    use_uuid: bool,
}

impl std::fmt::Debug for RestRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestRouter")
            .field("use_uuid", &self.use_uuid)
            .finish_non_exhaustive()
    }
}

fn records_response(status: u16, key: &str, records: Vec<Value>) -> HandlerResult {
    let mut body = Map::new();
    body.insert(key.to_string(), Value::Array(records));
    HandlerResult::json(status, &Value::Object(body))
}

fn not_found() -> HandlerResult {
    HandlerResult::json(404, &json!({}))
}

fn form_to_json(params: &QueryParams) -> Value {
    let fields = params
        .iter()
        .map(|(name, value)| {
            let value = match value {
                QueryValue::One(v) => Value::String(v.clone()),
                QueryValue::Many(vs) => {
                    Value::Array(vs.iter().cloned().map(Value::String).collect())
                }
                QueryValue::Null => Value::Null,
            };
            (name.clone(), value)
        })
        .collect();
    Value::Object(fields)
}

/// Request body as a JSON object, falling back to form encoding.
pub fn parse_body(request: &InterceptedRequest) -> Value {
    let body = request.request_body.as_deref().unwrap_or("").trim();
    match serde_json::from_str::<Value>(body) {
        Ok(value @ Value::Object(_)) => value,
        _ => form_to_json(&query::parse(body)),
    }
}

impl RestRouter {
    pub fn new(store: Arc<dyn Store>, use_uuid: bool) -> Self {
        Self { store, use_uuid }
    }

    fn require_param(route: &str, resource: &ResourceKey, method: Method) -> Result<()> {
        if resource.param.is_none() {
            return Err(DecoyError::InvalidRoute {
                path: route.to_string(),
                reason: format!("{method} needs a trailing :id segment"),
            });
        }
        Ok(())
    }

    /// List a collection, or fetch one record when the route ends in a parameter.
    pub fn get(
        &self,
        server: &Server,
        route: &str,
        key: Option<&str>,
    ) -> Result<Arc<RouteHandler>> {
        let resource = ResourceKey::parse(route, key);
        let store = Arc::clone(&self.store);
        debug!("REST GET {} serves {}", route, resource.key);

        server.get(route, move |request| {
            let Some(records) = store.get(&resource.key)? else {
                return Ok(not_found());
            };
            match resource.id(request) {
                Some(id) => match records.get(id) {
                    Some(record) => Ok(records_response(200, &resource.key, vec![record.clone()])),
                    None => Ok(not_found()),
                },
                None => Ok(records_response(
                    200,
                    &resource.key,
                    records.into_values().collect(),
                )),
            }
        })
    }

    /// Create a record from a JSON or form-encoded body.
    ///
    /// Responds 409 when a record with the same id already exists.
    pub fn post(
        &self,
        server: &Server,
        route: &str,
        key: Option<&str>,
    ) -> Result<Arc<RouteHandler>> {
        let resource = ResourceKey::parse(route, key);
        let store = Arc::clone(&self.store);
        let use_uuid = self.use_uuid;
        debug!("REST POST {} serves {}", route, resource.key);

        server.post(route, move |request| {
            let mut record = parse_body(request);
            if let (Some(id), Value::Object(fields)) = (resource.id(request), &mut record) {
                fields
                    .entry("id".to_string())
                    .or_insert_with(|| Value::String(id.to_string()));
            }
            let id = assign_id(store.as_ref(), &resource.key, &mut record, use_uuid)?;
            match store.create_record(&resource.key, &id, record)? {
                Some(created) => Ok(records_response(201, &resource.key, vec![created])),
                None => Ok(HandlerResult::json(409, &json!({}))),
            }
        })
    }

    /// Replace an existing record.
    pub fn put(
        &self,
        server: &Server,
        route: &str,
        key: Option<&str>,
    ) -> Result<Arc<RouteHandler>> {
        let resource = ResourceKey::parse(route, key);
        Self::require_param(route, &resource, Method::Put)?;
        let store = Arc::clone(&self.store);

        server.put(route, move |request| {
            let Some(id) = resource.id(request) else {
                return Ok(not_found());
            };
            let Some(existing) = store.get_record(&resource.key, id)? else {
                return Ok(not_found());
            };
            let mut record = parse_body(request);
            if let Value::Object(fields) = &mut record {
                let stored_id = existing
                    .get("id")
                    .cloned()
                    .unwrap_or_else(|| Value::String(id.to_string()));
                fields.entry("id".to_string()).or_insert(stored_id);
            }
            let replaced = store.replace_record(&resource.key, id, record)?;
            Ok(records_response(200, &resource.key, replaced.into_iter().collect()))
        })
    }

    /// Merge the body into an existing record.
    pub fn patch(
        &self,
        server: &Server,
        route: &str,
        key: Option<&str>,
    ) -> Result<Arc<RouteHandler>> {
        let resource = ResourceKey::parse(route, key);
        Self::require_param(route, &resource, Method::Patch)?;
        let store = Arc::clone(&self.store);

        server.patch(route, move |request| {
            let Some(id) = resource.id(request) else {
                return Ok(not_found());
            };
            let changes = parse_body(request);
            match store.update_record(&resource.key, id, &changes)? {
                Some(updated) => Ok(records_response(200, &resource.key, vec![updated])),
                None => Ok(not_found()),
            }
        })
    }

    /// Remove a record; responds 204, or 404 when nothing was removed.
    pub fn delete(
        &self,
        server: &Server,
        route: &str,
        key: Option<&str>,
    ) -> Result<Arc<RouteHandler>> {
        let resource = ResourceKey::parse(route, key);
        Self::require_param(route, &resource, Method::Delete)?;
        let store = Arc::clone(&self.store);

        server.delete(route, move |request| {
            let Some(id) = resource.id(request) else {
                return Ok(not_found());
            };
            if store.delete_record(&resource.key, id)? {
                Ok(HandlerResult::empty(204))
            } else {
                Ok(not_found())
            }
        })
    }

    /// Register every method that applies to `route`: GET and POST for a
    /// collection route, GET, PUT, PATCH and DELETE for a member route.
    pub fn resource(&self, server: &Server, route: &str) -> Result<Vec<Arc<RouteHandler>>> {
        let resource = ResourceKey::parse(route, None);
        let mut handlers = vec![self.get(server, route, None)?];
        if resource.param.is_some() {
            handlers.push(self.put(server, route, None)?);
            handlers.push(self.patch(server, route, None)?);
            handlers.push(self.delete(server, route, None)?);
        } else {
            handlers.push(self.post(server, route, None)?);
        }
        Ok(handlers)
    }
}
