//! Type definitions for the interception server.

use crate::recognizer::QueryParams;
use crate::transport::{Body, FakeTransport, Headers, ReadyState, Transport};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// Methods
// ============================================================================

/// HTTP methods a server keeps a route table for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
    Patch,
    Head,
}

impl Method {
    pub const ALL: [Method; 6] = [
        Method::Get,
        Method::Put,
        Method::Post,
        Method::Delete,
        Method::Patch,
        Method::Head,
    ];

    /// Parse a verb case-insensitively.
    pub fn parse(verb: &str) -> Option<Method> {
        match verb.to_ascii_uppercase().as_str() {
            "GET" => Some(Method::Get),
            "PUT" => Some(Method::Put),
            "POST" => Some(Method::Post),
            "DELETE" => Some(Method::Delete),
            "PATCH" => Some(Method::Patch),
            "HEAD" => Some(Method::Head),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Head => "HEAD",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Requests and Results
// ============================================================================

/// Snapshot of an intercepted request, as seen by handlers and request logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterceptedRequest {
    pub method: String,
    pub url: String,
    pub request_headers: Headers,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<String>,
    pub ready_state: ReadyState,
    /// Path parameters, filled in once a route matched.
    pub params: HashMap<String, String>,
    pub query_params: QueryParams,
    pub timestamp: String,
}

impl InterceptedRequest {
    /// Capture the request currently held by `transport`.
    pub fn capture(transport: &FakeTransport) -> Self {
        Self {
            method: transport.method().to_string(),
            url: transport.url().to_string(),
            request_headers: transport.request_headers().clone(),
            request_body: transport.request_body().map(str::to_string),
            ready_state: transport.ready_state(),
            params: HashMap::new(),
            query_params: QueryParams::new(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Path parameter by name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// First value of a query parameter.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).and_then(|value| value.as_str())
    }

    /// Parse the request body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(self.request_body.as_deref().unwrap_or("null"))
    }
}

/// What a handler returns: status, headers and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerResult {
    pub status: u16,
    pub headers: Headers,
    pub body: Body,
}

impl HandlerResult {
    pub fn new(status: u16, headers: Headers, body: impl Into<Body>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// A JSON response with the matching content type.
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        let mut headers = Headers::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self::new(status, headers, value.to_string())
    }

    /// A plain-text response.
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        let mut headers = Headers::new();
        headers.insert("Content-Type".to_string(), "text/plain".to_string());
        Self::new(status, headers, body.into())
    }

    /// A bodyless response.
    pub fn empty(status: u16) -> Self {
        Self::new(status, Headers::new(), String::new())
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }
}

impl<B: Into<Body>> From<(u16, Headers, B)> for HandlerResult {
    fn from((status, headers, body): (u16, Headers, B)) -> Self {
        Self::new(status, headers, body)
    }
}

/// How the dispatcher resolved one request, before hooks decide whether a
/// miss or a fault is fatal.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// A handler ran and its response was delivered.
    Handled { status: u16 },
    /// No route matched.
    Unhandled { request: InterceptedRequest },
    /// The handler failed, or its response could not be delivered.
    Faulted {
        request: InterceptedRequest,
        error: anyhow::Error,
    },
}

impl DispatchOutcome {
    pub fn is_handled(&self) -> bool {
        matches!(self, DispatchOutcome::Handled { .. })
    }

    pub fn is_unhandled(&self) -> bool {
        matches!(self, DispatchOutcome::Unhandled { .. })
    }
}
