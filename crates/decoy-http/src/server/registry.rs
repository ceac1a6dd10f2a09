//! Per-method route tables.

use super::handler::RouteHandler;
use super::types::Method;
use crate::error::{DecoyError, Result};
use crate::recognizer::{Mapper, QueryParams, Recognizer, RouteSpec};
use std::collections::HashMap;
use std::sync::Arc;

/// A handler resolved for a request.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub handler: Arc<RouteHandler>,
    pub params: HashMap<String, String>,
    pub query_params: QueryParams,
}

/// One recognizer per method plus every handler in registration order.
#[derive(Debug, Default)]
pub struct Registry {
    routes: HashMap<Method, Recognizer<Arc<RouteHandler>>>,
    handlers: Vec<Arc<RouteHandler>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn recognizer_mut(&mut self, method: Method) -> &mut Recognizer<Arc<RouteHandler>> {
        self.routes.entry(method).or_default()
    }

    pub fn register(
        &mut self,
        method: Method,
        path: &str,
        handler: Arc<RouteHandler>,
    ) -> Result<()> {
        self.recognizer_mut(method)
            .add_route(path, Arc::clone(&handler))?;
        self.handlers.push(handler);
        Ok(())
    }

    /// Register under `name` so the path can be generated later.
    pub fn register_named(
        &mut self,
        method: Method,
        name: &str,
        path: &str,
        handler: Arc<RouteHandler>,
    ) -> Result<()> {
        self.recognizer_mut(method)
            .add(vec![RouteSpec::new(path, Arc::clone(&handler))], Some(name))?;
        self.handlers.push(handler);
        Ok(())
    }

    /// Declare nested routes for `method`.
    ///
    /// Handlers declared this way are not listed by `handlers`.
    pub fn map<F>(&mut self, method: Method, declare: F) -> Result<()>
    where
        F: FnOnce(&mut Mapper<'_, Arc<RouteHandler>>),
    {
        self.recognizer_mut(method).map(declare)
    }

    pub fn has_route(&self, method: Method, name: &str) -> bool {
        self.routes
            .get(&method)
            .is_some_and(|recognizer| recognizer.has_route(name))
    }

    pub fn generate(
        &self,
        method: Method,
        name: &str,
        params: &HashMap<String, String>,
        query_params: Option<&QueryParams>,
    ) -> Result<String> {
        self.routes
            .get(&method)
            .ok_or_else(|| DecoyError::UnknownRoute(name.to_string()))?
            .generate(name, params, query_params)
    }

    /// Resolve `verb` and `url`; unknown verbs never match.
    pub fn resolve(&self, verb: &str, url: &str) -> Option<Resolved> {
        let method = Method::parse(verb)?;
        let recognition = self.routes.get(&method)?.recognize(url)?;
        let first = recognition.matches.into_iter().next()?;
        Some(Resolved {
            handler: first.handler,
            params: first.params,
            query_params: recognition.query_params,
        })
    }

    pub fn handlers(&self) -> &[Arc<RouteHandler>] {
        &self.handlers
    }
}
