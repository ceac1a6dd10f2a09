//! Route handlers and their call counters.

use super::types::{HandlerResult, InterceptedRequest};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Signature of a handler callback.
pub type HandlerFn = dyn Fn(&InterceptedRequest) -> anyhow::Result<HandlerResult> + Send + Sync;

/// A registered handler callback.
pub struct RouteHandler {
    label: String,
    callback: Arc<HandlerFn>,
    calls: AtomicUsize,
}

impl fmt::Debug for RouteHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteHandler")
            .field("label", &self.label)
            .field("calls", &self.number_of_calls())
            .finish()
    }
}

impl RouteHandler {
    /// Wrap `callback`; `label` names the handler in logs, typically
    /// `"METHOD /path"`.
    pub fn new<F>(label: impl Into<String>, callback: F) -> Arc<Self>
    where
        F: Fn(&InterceptedRequest) -> anyhow::Result<HandlerResult> + Send + Sync + 'static,
    {
        Arc::new(Self {
            label: label.into(),
            callback: Arc::new(callback),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// How many requests this handler was selected for.
    pub fn number_of_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn call(&self, request: &InterceptedRequest) -> anyhow::Result<HandlerResult> {
        (self.callback)(request)
    }
}
