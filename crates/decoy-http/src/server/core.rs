//! The owned interception handle.

use super::dispatcher::Dispatcher;
use super::handler::RouteHandler;
use super::hooks::RequestHooks;
use super::registry::Resolved;
use super::types::{HandlerResult, InterceptedRequest, Method};
use crate::error::Result;
use crate::recognizer::{Mapper, QueryParams};
use crate::transport::{
    FakeTransport, FakeTransportFactory, SendHook, TransportBinding, TransportFactory,
    DEFAULT_CHUNK_SIZE,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// A fake server: a route table plus, while intercepting, ownership of a
/// transport binding's factory.
///
/// Dropping an intercepting server restores the factory it replaced.
pub struct Server {
    dispatcher: Arc<Dispatcher>,
    chunk_size: usize,
    binding: Option<Arc<TransportBinding>>,
    previous: Option<Arc<dyn TransportFactory>>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("dispatcher", &self.dispatcher)
            .field("chunk_size", &self.chunk_size)
            .field("intercepting", &self.is_intercepting())
            .finish()
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

impl Server {
    /// A server that does not intercept anything; obtain transports wired to
    /// it with [`Server::transport`].
    pub fn new() -> Self {
        Self {
            dispatcher: Arc::new(Dispatcher::new()),
            chunk_size: DEFAULT_CHUNK_SIZE,
            binding: None,
            previous: None,
        }
    }

    /// Intercept the process-wide binding.
    pub fn start() -> Self {
        Self::intercept(TransportBinding::global())
    }

    /// Intercept `binding` until shutdown.
    pub fn intercept(binding: Arc<TransportBinding>) -> Self {
        let mut server = Self::new();
        server.attach(binding);
        server
    }

    fn factory(&self) -> FakeTransportFactory {
        let hook: Arc<dyn SendHook> = Arc::clone(&self.dispatcher) as Arc<dyn SendHook>;
        FakeTransportFactory::hooked(hook).with_chunk_size(self.chunk_size)
    }

    fn attach(&mut self, binding: Arc<TransportBinding>) {
        let previous = binding.replace(Arc::new(self.factory()));
        info!("Intercepting transport binding");
        self.previous = Some(previous);
        self.binding = Some(binding);
    }

    pub fn is_intercepting(&self) -> bool {
        self.binding.is_some()
    }

    /// Body chunk size for transports created from now on.
    pub fn set_chunk_size(&mut self, chunk_size: usize) {
        self.chunk_size = chunk_size;
        if let Some(binding) = &self.binding {
            binding.replace(Arc::new(self.factory()));
        }
    }

    /// A fake transport dispatching to this server.
    pub fn transport(&self) -> FakeTransport {
        self.factory().build()
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    pub fn set_hooks(&self, hooks: Arc<dyn RequestHooks>) {
        self.dispatcher.set_hooks(hooks);
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    pub fn register<F>(&self, method: Method, path: &str, callback: F) -> Result<Arc<RouteHandler>>
    where
        F: Fn(&InterceptedRequest) -> anyhow::Result<HandlerResult> + Send + Sync + 'static,
    {
        let handler = RouteHandler::new(format!("{method} {path}"), callback);
        self.dispatcher
            .registry()
            .write()
            .register(method, path, Arc::clone(&handler))?;
        Ok(handler)
    }

    /// Register a route that can later be generated by `name`.
    pub fn register_named<F>(
        &self,
        method: Method,
        name: &str,
        path: &str,
        callback: F,
    ) -> Result<Arc<RouteHandler>>
    where
        F: Fn(&InterceptedRequest) -> anyhow::Result<HandlerResult> + Send + Sync + 'static,
    {
        let handler = RouteHandler::new(format!("{method} {path}"), callback);
        self.dispatcher
            .registry()
            .write()
            .register_named(method, name, path, Arc::clone(&handler))?;
        Ok(handler)
    }

    pub fn get<F>(&self, path: &str, callback: F) -> Result<Arc<RouteHandler>>
    where
        F: Fn(&InterceptedRequest) -> anyhow::Result<HandlerResult> + Send + Sync + 'static,
    {
        self.register(Method::Get, path, callback)
    }

    pub fn post<F>(&self, path: &str, callback: F) -> Result<Arc<RouteHandler>>
    where
        F: Fn(&InterceptedRequest) -> anyhow::Result<HandlerResult> + Send + Sync + 'static,
    {
        self.register(Method::Post, path, callback)
    }

    pub fn put<F>(&self, path: &str, callback: F) -> Result<Arc<RouteHandler>>
    where
        F: Fn(&InterceptedRequest) -> anyhow::Result<HandlerResult> + Send + Sync + 'static,
    {
        self.register(Method::Put, path, callback)
    }

    pub fn delete<F>(&self, path: &str, callback: F) -> Result<Arc<RouteHandler>>
    where
        F: Fn(&InterceptedRequest) -> anyhow::Result<HandlerResult> + Send + Sync + 'static,
    {
        self.register(Method::Delete, path, callback)
    }

    pub fn patch<F>(&self, path: &str, callback: F) -> Result<Arc<RouteHandler>>
    where
        F: Fn(&InterceptedRequest) -> anyhow::Result<HandlerResult> + Send + Sync + 'static,
    {
        self.register(Method::Patch, path, callback)
    }

    pub fn head<F>(&self, path: &str, callback: F) -> Result<Arc<RouteHandler>>
    where
        F: Fn(&InterceptedRequest) -> anyhow::Result<HandlerResult> + Send + Sync + 'static,
    {
        self.register(Method::Head, path, callback)
    }

    /// Declare nested routes for `method`.
    pub fn map<F>(&self, method: Method, declare: F) -> Result<()>
    where
        F: FnOnce(&mut Mapper<'_, Arc<RouteHandler>>),
    {
        self.dispatcher.registry().write().map(method, declare)
    }

    pub fn has_route(&self, method: Method, name: &str) -> bool {
        self.dispatcher.registry().read().has_route(method, name)
    }

    /// Build the path of a named route.
    pub fn generate(
        &self,
        method: Method,
        name: &str,
        params: &HashMap<String, String>,
        query_params: Option<&QueryParams>,
    ) -> Result<String> {
        self.dispatcher
            .registry()
            .read()
            .generate(method, name, params, query_params)
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// The handler and parameters `verb url` would be dispatched to.
    pub fn resolve(&self, verb: &str, url: &str) -> Option<Resolved> {
        self.dispatcher.registry().read().resolve(verb, url)
    }

    /// Registered handlers in registration order.
    pub fn handlers(&self) -> Vec<Arc<RouteHandler>> {
        self.dispatcher.registry().read().handlers().to_vec()
    }

    pub fn handled_requests(&self) -> Vec<InterceptedRequest> {
        self.dispatcher.handled_requests()
    }

    pub fn unhandled_requests(&self) -> Vec<InterceptedRequest> {
        self.dispatcher.unhandled_requests()
    }

    /// Stop intercepting and restore the factory captured at start.
    ///
    /// Calling it again, or on a server that never intercepted, does nothing.
    pub fn shutdown(&mut self) {
        if let (Some(binding), Some(previous)) = (self.binding.take(), self.previous.take()) {
            binding.replace(previous);
            info!("Restored transport binding");
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.shutdown();
    }
}
