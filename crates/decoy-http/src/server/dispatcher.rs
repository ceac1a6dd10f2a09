//! Request dispatch: route lookup, handler invocation, response delivery.

use super::handler::RouteHandler;
use super::hooks::{DefaultHooks, RequestHooks};
use super::registry::Registry;
use super::types::{DispatchOutcome, InterceptedRequest};
use crate::error::Result;
use crate::transport::{FakeTransport, SendHook};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Routes intercepted requests through the registry and records them.
///
/// Shared between the owning `Server` and every transport it creates.
pub struct Dispatcher {
    registry: RwLock<Registry>,
    hooks: RwLock<Arc<dyn RequestHooks>>,
    handled: RwLock<Vec<InterceptedRequest>>,
    unhandled: RwLock<Vec<InterceptedRequest>>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("handled", &self.handled.read().len())
            .field("unhandled", &self.unhandled.read().len())
            .finish_non_exhaustive()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(Registry::new()),
            hooks: RwLock::new(Arc::new(DefaultHooks)),
            handled: RwLock::new(Vec::new()),
            unhandled: RwLock::new(Vec::new()),
        }
    }

    pub fn registry(&self) -> &RwLock<Registry> {
        &self.registry
    }

    pub fn set_hooks(&self, hooks: Arc<dyn RequestHooks>) {
        *self.hooks.write() = hooks;
    }

    pub fn hooks(&self) -> Arc<dyn RequestHooks> {
        Arc::clone(&*self.hooks.read())
    }

    pub fn handled_requests(&self) -> Vec<InterceptedRequest> {
        self.handled.read().clone()
    }

    pub fn unhandled_requests(&self) -> Vec<InterceptedRequest> {
        self.unhandled.read().clone()
    }

    pub fn clear_requests(&self) {
        self.handled.write().clear();
        self.unhandled.write().clear();
    }

    /// Resolve the request held by `transport` and, on a match, run the
    /// handler and deliver its response.
    ///
    /// Misses and faults are returned, not raised; `settle` applies the hooks.
    pub fn dispatch(&self, transport: &mut FakeTransport) -> DispatchOutcome {
        let verb = transport.method().to_ascii_uppercase();
        let path = transport.url().to_string();
        let mut request = InterceptedRequest::capture(transport);

        // The registry lock is released before the handler runs.
        let resolved = self.registry.read().resolve(&verb, &path);
        let Some(resolved) = resolved else {
            debug!("No handler for {} {}", verb, path);
            self.unhandled.write().push(request.clone());
            return DispatchOutcome::Unhandled { request };
        };

        debug!("Dispatching {} {} to {}", verb, path, resolved.handler.label());
        resolved.handler.record_call();
        request.params = resolved.params;
        request.query_params = resolved.query_params;
        self.handled.write().push(request.clone());

        let hooks = self.hooks();
        hooks.handled_request(&verb, &path, &request);

        match respond_with(&resolved.handler, &request, hooks.as_ref(), transport) {
            Ok(status) => DispatchOutcome::Handled { status },
            Err(error) => DispatchOutcome::Faulted { request, error },
        }
    }

    /// Apply the installed hooks to a dispatch outcome.
    pub fn settle(&self, outcome: DispatchOutcome) -> Result<()> {
        let hooks = self.hooks();
        match outcome {
            DispatchOutcome::Handled { .. } => Ok(()),
            DispatchOutcome::Unhandled { request } => {
                let verb = request.method.to_ascii_uppercase();
                hooks.unhandled_request(&verb, &request.url, &request)
            }
            DispatchOutcome::Faulted { request, error } => {
                let verb = request.method.to_ascii_uppercase();
                hooks.errored_request(&verb, &request.url, &request, error)
            }
        }
    }
}

fn respond_with(
    handler: &RouteHandler,
    request: &InterceptedRequest,
    hooks: &dyn RequestHooks,
    transport: &mut FakeTransport,
) -> anyhow::Result<u16> {
    let result = handler.call(request)?;
    let body = hooks.prepare_body(result.body);
    transport.respond(result.status, &result.headers, body)?;
    Ok(result.status)
}

impl SendHook for Dispatcher {
    fn on_send(&self, transport: &mut FakeTransport) -> Result<()> {
        let outcome = self.dispatch(transport);
        self.settle(outcome)
    }
}
