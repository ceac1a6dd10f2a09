//! The fake transport state machine.
//!
//! `UNSENT -> OPENED -> HEADERS_RECEIVED -> LOADING -> DONE`, plus an
//! independent aborted flag. Asynchronous transports announce every state
//! change with a `readystatechange` event and reaching `DONE` additionally
//! emits `load` then `loadend`. Synchronous transports move silently.

use super::events::{Callbacks, Event, EventKind, EventTarget, Listener, ListenerId};
use super::headers::{self, Headers};
use super::status::reason_phrase;
use super::xml::{self, XmlDocument};
use super::{Body, OpenOptions, ReadyState, Transport};
use crate::error::{DecoyError, Result};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Characters delivered per `LOADING` step unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// Invoked by `send` once the request is marked in flight.
///
/// The server installs one to route intercepted requests; a transport without
/// a hook stays pending until the caller drives it with `respond`.
pub trait SendHook: Send + Sync {
    fn on_send(&self, transport: &mut FakeTransport) -> Result<()>;
}

/// An in-process transport that never touches the network.
pub struct FakeTransport {
    method: String,
    url: String,
    asynchronous: bool,
    username: Option<String>,
    password: Option<String>,
    ready_state: ReadyState,
    request_headers: Headers,
    request_body: Option<String>,
    response_headers: Headers,
    status: u16,
    status_text: String,
    response_text: Option<String>,
    response_xml: Option<XmlDocument>,
    send_flag: bool,
    error_flag: bool,
    aborted: bool,
    chunk_size: usize,
    events: EventTarget,
    callbacks: Callbacks,
    send_hook: Option<Arc<dyn SendHook>>,
}

impl fmt::Debug for FakeTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeTransport")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("ready_state", &self.ready_state)
            .field("status", &self.status)
            .field("aborted", &self.aborted)
            .finish_non_exhaustive()
    }
}

impl Default for FakeTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeTransport {
    /// A detached transport with no send hook.
    pub fn new() -> Self {
        let callbacks = Callbacks::default();
        Self {
            method: String::new(),
            url: String::new(),
            asynchronous: true,
            username: None,
            password: None,
            ready_state: ReadyState::Unsent,
            request_headers: Headers::new(),
            request_body: None,
            response_headers: Headers::new(),
            status: 0,
            status_text: String::new(),
            response_text: None,
            response_xml: None,
            send_flag: false,
            error_flag: false,
            aborted: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            events: EventTarget::with_callbacks(&callbacks),
            callbacks,
            send_hook: None,
        }
    }

    /// A transport that hands every sent request to `hook`.
    pub fn with_hook(hook: Arc<dyn SendHook>) -> Self {
        let mut transport = Self::new();
        transport.send_hook = Some(hook);
        transport
    }

    /// Number of characters delivered per `LOADING` step; zero is treated as one.
    pub fn set_chunk_size(&mut self, chunk_size: usize) {
        self.chunk_size = chunk_size.max(1);
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Install or clear the single-slot callback for `kind`.
    ///
    /// `Error` callbacks run after `abort`; every other kind runs as part of
    /// ordinary event dispatch, ahead of listeners added later.
    pub fn set_callback(&mut self, kind: EventKind, callback: Option<Listener>) {
        let mut callbacks = self.callbacks.lock();
        match callback {
            Some(callback) => {
                callbacks.insert(kind, callback);
            }
            None => {
                callbacks.remove(&kind);
            }
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_async(&self) -> bool {
        self.asynchronous
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn request_body(&self) -> Option<&str> {
        self.request_body.as_deref()
    }

    pub fn response_headers(&self) -> &Headers {
        &self.response_headers
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    pub fn is_sending(&self) -> bool {
        self.send_flag
    }

    pub fn error_flag(&self) -> bool {
        self.error_flag
    }

    /// Deliver a complete response: status, headers, then the body.
    ///
    /// A completed transport refuses a second response. A synchronous
    /// transport emits no events, so its `Load` callback is invoked directly
    /// once the body is in place.
    pub fn respond(&mut self, status: u16, headers: &Headers, body: impl Into<Body>) -> Result<()> {
        if self.ready_state == ReadyState::Done {
            return Err(DecoyError::InvalidState {
                operation: "respond",
                state: self.ready_state,
            });
        }
        self.status = status;
        self.status_text = reason_phrase(status).unwrap_or_default().to_string();
        self.set_response_headers(headers);
        self.set_response_body(body.into())?;

        if !self.asynchronous {
            let callback = self.callbacks.lock().get(&EventKind::Load).cloned();
            if let Some(callback) = callback {
                callback(&self.event(EventKind::Load));
            }
        }
        Ok(())
    }

    fn set_response_headers(&mut self, headers: &Headers) {
        self.response_headers = headers.clone();
        if self.asynchronous {
            self.ready_state_change(ReadyState::HeadersReceived);
        } else {
            self.ready_state = ReadyState::HeadersReceived;
        }
    }

    fn set_response_body(&mut self, body: Body) -> Result<()> {
        if self.ready_state == ReadyState::Done
            || (self.asynchronous && self.ready_state != ReadyState::HeadersReceived)
        {
            return Err(DecoyError::InvalidState {
                operation: "deliver a response body",
                state: self.ready_state,
            });
        }
        let body = body.into_text()?;

        // An empty body still passes through LOADING once.
        let chars: Vec<char> = body.chars().collect();
        let chunks: Vec<String> = if chars.is_empty() {
            vec![String::new()]
        } else {
            chars
                .chunks(self.chunk_size)
                .map(|chunk| chunk.iter().collect())
                .collect()
        };

        self.response_text = Some(String::with_capacity(body.len()));
        for chunk in chunks {
            if self.asynchronous {
                self.ready_state_change(ReadyState::Loading);
            }
            self.response_text
                .get_or_insert_with(String::new)
                .push_str(&chunk);
        }

        let content_type = headers::find(&self.response_headers, "Content-Type");
        if !body.is_empty() && xml::is_xml_content_type(content_type) {
            self.response_xml = xml::parse(&body);
        }

        if self.asynchronous {
            self.ready_state_change(ReadyState::Done);
        } else {
            self.ready_state = ReadyState::Done;
        }
        Ok(())
    }

    fn verify_open(&self, operation: &'static str) -> Result<()> {
        if self.ready_state != ReadyState::Opened || self.send_flag {
            return Err(DecoyError::InvalidState {
                operation,
                state: self.ready_state,
            });
        }
        Ok(())
    }

    fn event(&self, kind: EventKind) -> Event {
        let event = Event::new(kind, self.ready_state, self.status);
        if self.ready_state < ReadyState::HeadersReceived {
            return event;
        }
        event.with_response(self.response_headers.clone(), self.response_text.clone())
    }

    fn ready_state_change(&mut self, state: ReadyState) {
        debug!("{} {} -> {}", self.method, self.url, state);
        self.ready_state = state;
        self.events.dispatch(&self.event(EventKind::ReadyStateChange));

        if state == ReadyState::Done {
            self.events.dispatch(&self.event(EventKind::Load));
            self.events.dispatch(&self.event(EventKind::LoadEnd));
        }
    }
}

impl Transport for FakeTransport {
    fn open(&mut self, method: &str, url: &str, options: OpenOptions) {
        self.method = method.to_string();
        self.url = url.to_string();
        self.asynchronous = options.asynchronous;
        self.username = options.username;
        self.password = options.password;
        self.request_headers.clear();
        self.request_body = None;
        self.response_headers.clear();
        self.status = 0;
        self.status_text.clear();
        self.response_text = None;
        self.response_xml = None;
        self.send_flag = false;
        self.ready_state_change(ReadyState::Opened);
    }

    fn set_request_header(&mut self, name: &str, value: &str) -> Result<()> {
        self.verify_open("set a request header")?;
        if headers::is_unsafe_header(name) {
            return Err(DecoyError::ForbiddenHeader(name.to_string()));
        }
        headers::append(&mut self.request_headers, name, value);
        Ok(())
    }

    fn send(&mut self, body: Option<&str>) -> Result<()> {
        self.verify_open("send")?;

        let method = self.method.to_ascii_uppercase();
        if method != "GET" && method != "HEAD" {
            headers::normalize_content_type(&mut self.request_headers);
            self.request_body = body.map(str::to_string);
        }

        self.error_flag = false;
        self.send_flag = self.asynchronous;
        self.ready_state_change(ReadyState::Opened);
        self.events.dispatch(&self.event(EventKind::LoadStart));

        match self.send_hook.clone() {
            Some(hook) => hook.on_send(self),
            None => Ok(()),
        }
    }

    fn abort(&mut self) {
        self.aborted = true;
        self.response_text = None;
        self.error_flag = true;
        self.request_headers.clear();

        if self.ready_state > ReadyState::Unsent && self.send_flag {
            self.ready_state_change(ReadyState::Done);
            self.send_flag = false;
        }
        self.ready_state = ReadyState::Unsent;

        self.events.dispatch(&self.event(EventKind::Abort));
        let on_error = self.callbacks.lock().get(&EventKind::Error).cloned();
        if let Some(on_error) = on_error {
            on_error(&self.event(EventKind::Error));
        }
    }

    fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    fn status(&self) -> u16 {
        self.status
    }

    fn status_text(&self) -> &str {
        &self.status_text
    }

    fn response_text(&self) -> Option<&str> {
        self.response_text.as_deref()
    }

    fn response_xml(&self) -> Option<&XmlDocument> {
        self.response_xml.as_ref()
    }

    fn request_headers(&self) -> &Headers {
        &self.request_headers
    }

    fn get_response_header(&self, name: &str) -> Option<&str> {
        if self.ready_state < ReadyState::HeadersReceived {
            return None;
        }
        headers::find(&self.response_headers, name)
    }

    fn get_all_response_headers(&self) -> String {
        if self.ready_state < ReadyState::HeadersReceived {
            return String::new();
        }
        headers::format_all(&self.response_headers)
    }

    fn add_event_listener(&mut self, kind: EventKind, listener: Listener) -> ListenerId {
        self.events.add(kind, listener)
    }

    fn remove_event_listener(&mut self, kind: &EventKind, id: ListenerId) -> bool {
        self.events.remove(kind, id)
    }

    fn dispatch_event(&self, event: &Event) -> bool {
        self.events.dispatch(event)
    }
}
