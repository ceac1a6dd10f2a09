//! Fake request transport.
//!
//! This module provides:
//! - `Transport`: the request-object contract application code programs against
//! - `FakeTransport`: an in-process implementation driving the readiness state
//!   machine, chunked body delivery and lifecycle events
//! - `TransportBinding`: the swap point through which transports are created,
//!   replaced by the server while interception is active
//!
//! ## Module Structure
//!
//! - `fake`: the `FakeTransport` state machine
//! - `events`: event kinds, listeners and dispatch
//! - `headers`: request/response header policy
//! - `status`: status-code reason phrases
//! - `xml`: best-effort response document parsing
//! - `binding`: transport factories and the process-wide binding

mod binding;
mod events;
mod fake;
mod headers;
mod status;
mod xml;


use crate::error::{DecoyError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use binding::{FakeTransportFactory, TransportBinding, TransportFactory};
pub use events::{Event, EventKind, Listener, ListenerId};
pub use fake::{FakeTransport, SendHook, DEFAULT_CHUNK_SIZE};
pub use headers::{is_unsafe_header, Headers};
pub use status::reason_phrase;
pub use xml::{XmlDocument, XmlElement, XmlNode};

// ============================================================================
// Readiness State
// ============================================================================

/// Lifecycle stage of a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReadyState {
    Unsent = 0,
    Opened = 1,
    HeadersReceived = 2,
    Loading = 3,
    Done = 4,
}

impl ReadyState {
    /// Numeric code of the state.
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReadyState::Unsent => "UNSENT",
            ReadyState::Opened => "OPENED",
            ReadyState::HeadersReceived => "HEADERS_RECEIVED",
            ReadyState::Loading => "LOADING",
            ReadyState::Done => "DONE",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Open Options and Bodies
// ============================================================================

/// Optional arguments of [`Transport::open`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOptions {
    /// Asynchronous requests announce every readiness change as an event.
    pub asynchronous: bool,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            asynchronous: true,
            username: None,
            password: None,
        }
    }
}

impl OpenOptions {
    pub fn synchronous() -> Self {
        Self {
            asynchronous: false,
            ..Self::default()
        }
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.username = Some(username.to_string());
        self.password = Some(password.to_string());
        self
    }
}

/// A response body handed to a fake transport.
///
/// Only text can be delivered; raw bytes are accepted as long as they are
/// valid UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Text(String),
    Bytes(Vec<u8>),
}

impl Default for Body {
    fn default() -> Self {
        Body::Text(String::new())
    }
}

impl Body {
    /// Convert to text, failing with `InvalidBody` for non-UTF-8 bytes.
    pub fn into_text(self) -> Result<String> {
        match self {
            Body::Text(text) => Ok(text),
            Body::Bytes(bytes) => String::from_utf8(bytes).map_err(|e| {
                DecoyError::InvalidBody(format!("{} bytes of binary data", e.as_bytes().len()))
            }),
        }
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_string())
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Bytes(bytes)
    }
}

// ============================================================================
// Transport Contract
// ============================================================================

/// The request-object surface consumed by application code.
pub trait Transport: Send {
    /// Prepare a new request, resetting all per-request state.
    fn open(&mut self, method: &str, url: &str, options: OpenOptions);

    /// Add a request header; repeated names are comma-joined.
    fn set_request_header(&mut self, name: &str, value: &str) -> Result<()>;

    /// Send the request.
    ///
    /// An asynchronous request fails with `InvalidState` if sent again
    /// before the next `open`. A synchronous request holds no send flag, so
    /// while it is still OPENED (no handler answered it) it can be sent again.
    fn send(&mut self, body: Option<&str>) -> Result<()>;

    /// Cancel the request.
    fn abort(&mut self);

    fn ready_state(&self) -> ReadyState;

    fn status(&self) -> u16;

    fn status_text(&self) -> &str;

    fn response_text(&self) -> Option<&str>;

    fn response_xml(&self) -> Option<&XmlDocument>;

    fn request_headers(&self) -> &Headers;

    /// Case-insensitive response header lookup.
    fn get_response_header(&self, name: &str) -> Option<&str>;

    /// All visible response headers as `"Name: value\r\n"` lines.
    fn get_all_response_headers(&self) -> String;

    fn add_event_listener(&mut self, kind: EventKind, listener: Listener) -> ListenerId;

    /// Returns false when no such listener was registered.
    fn remove_event_listener(&mut self, kind: &EventKind, id: ListenerId) -> bool;

    /// Invoke every listener of the event's kind, returning whether one of them
    /// prevented the default action.
    fn dispatch_event(&self, event: &Event) -> bool;
}
