//! Error taxonomy shared by the recognizer, the fake transport and the server.

use crate::transport::ReadyState;

/// Errors raised by decoy operations.
///
/// Every variant surfaces synchronously at the call site that triggered it.
/// `RoutingMiss` and `HandlerFault` are produced by the default dispatcher hooks
/// and can be turned into non-fatal outcomes by installing different hooks.
#[derive(Debug, thiserror::Error)]
pub enum DecoyError {
    /// A transport operation was invoked in an incompatible lifecycle state.
    #[error("INVALID_STATE_ERR: cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: ReadyState,
    },

    /// The header name is on the unsafe-header denylist.
    #[error("Refused to set unsafe header \"{0}\"")]
    ForbiddenHeader(String),

    /// No registered handler matches the request method and path.
    #[error("intercepted {method} {path} but no handler was defined for this type of request")]
    RoutingMiss { method: String, path: String },

    /// The matched handler failed.
    #[error("intercepted {method} {path} but encountered an error: {source}")]
    HandlerFault {
        method: String,
        path: String,
        #[source]
        source: anyhow::Error,
    },

    /// `generate` or `handlers_for` referenced a route name that was never registered.
    #[error("There is no route named {0}")]
    UnknownRoute(String),

    /// A route path produced a capture pattern that failed to compile.
    #[error("route {path} cannot be compiled: {reason}")]
    InvalidRoute { path: String, reason: String },

    /// A response body could not be delivered as text.
    #[error("Attempted to respond to fake transport with {0}, which is not a string")]
    InvalidBody(String),

    /// The record store failed to read or persist its data.
    #[error("record store error: {0}")]
    Store(String),

    /// The configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl DecoyError {
    /// True for the routing-miss condition.
    pub fn is_routing_miss(&self) -> bool {
        matches!(self, DecoyError::RoutingMiss { .. })
    }

    /// True for a handler fault.
    pub fn is_handler_fault(&self) -> bool {
        matches!(self, DecoyError::HandlerFault { .. })
    }
}

pub type Result<T, E = DecoyError> = std::result::Result<T, E>;
