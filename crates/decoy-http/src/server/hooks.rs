//! Overridable reactions to dispatch results.
//!
//! The default hooks make routing misses and handler faults fatal: the error
//! propagates out of the transport's `send`. Test harnesses that prefer to
//! report these conditions their own way install different hooks.

use super::types::InterceptedRequest;
use crate::config::FailurePolicy;
use crate::error::{DecoyError, Result};
use crate::transport::Body;
use tracing::warn;

pub trait RequestHooks: Send + Sync {
    /// Called after a matched request is logged, before its handler runs.
    fn handled_request(&self, _method: &str, _path: &str, _request: &InterceptedRequest) {}

    /// Called when no route matched.
    fn unhandled_request(
        &self,
        method: &str,
        path: &str,
        _request: &InterceptedRequest,
    ) -> Result<()> {
        Err(DecoyError::RoutingMiss {
            method: method.to_string(),
            path: path.to_string(),
        })
    }

    /// Called when the handler failed or its response could not be delivered.
    fn errored_request(
        &self,
        method: &str,
        path: &str,
        _request: &InterceptedRequest,
        error: anyhow::Error,
    ) -> Result<()> {
        Err(DecoyError::HandlerFault {
            method: method.to_string(),
            path: path.to_string(),
            source: error,
        })
    }

    /// Transform a handler's body before it is delivered.
    fn prepare_body(&self, body: Body) -> Body {
        body
    }
}

/// Misses and faults are fatal.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl RequestHooks for DefaultHooks {}

/// Misses and faults are logged and otherwise ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHooks;

impl RequestHooks for LoggingHooks {
    fn unhandled_request(
        &self,
        method: &str,
        path: &str,
        _request: &InterceptedRequest,
    ) -> Result<()> {
        warn!("Unhandled request: {} {}", method, path);
        Ok(())
    }

    fn errored_request(
        &self,
        method: &str,
        path: &str,
        _request: &InterceptedRequest,
        error: anyhow::Error,
    ) -> Result<()> {
        warn!("Handler for {} {} failed: {:#}", method, path, error);
        Ok(())
    }
}

/// Picks the fatal or logging reaction per condition.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyHooks {
    pub unhandled: FailurePolicy,
    pub errored: FailurePolicy,
}

impl PolicyHooks {
    pub fn new(unhandled: FailurePolicy, errored: FailurePolicy) -> Self {
        Self { unhandled, errored }
    }
}

impl RequestHooks for PolicyHooks {
    fn unhandled_request(
        &self,
        method: &str,
        path: &str,
        request: &InterceptedRequest,
    ) -> Result<()> {
        match self.unhandled {
            FailurePolicy::Error => DefaultHooks.unhandled_request(method, path, request),
            FailurePolicy::Log => LoggingHooks.unhandled_request(method, path, request),
        }
    }

    fn errored_request(
        &self,
        method: &str,
        path: &str,
        request: &InterceptedRequest,
        error: anyhow::Error,
    ) -> Result<()> {
        match self.errored {
            FailurePolicy::Error => DefaultHooks.errored_request(method, path, request, error),
            FailurePolicy::Log => LoggingHooks.errored_request(method, path, request, error),
        }
    }
}
