//! Request interception and dispatch.
//!
//! This module provides:
//! - `Server`: owned interception handle with per-method route tables
//! - `Dispatcher`: resolves intercepted requests and delivers handler responses
//! - `RequestHooks`: overridable reactions to routing misses and handler faults
//!
//! ## Module Structure
//!
//! - `types`: methods, request snapshots, handler results, dispatch outcomes
//! - `handler`: handler callbacks and call counters
//! - `registry`: per-method recognizers
//! - `hooks`: default, logging and policy-driven hooks
//! - `dispatcher`: the send hook wired into fake transports
//! - `core`: the `Server` handle

mod core;
mod dispatcher;
mod handler;
mod hooks;
mod registry;
mod types;

#[cfg(test)]
mod tests;

pub use core::Server;
pub use dispatcher::Dispatcher;
pub use handler::{HandlerFn, RouteHandler};
pub use hooks::{DefaultHooks, LoggingHooks, PolicyHooks, RequestHooks};
pub use registry::{Registry, Resolved};
pub use types::{DispatchOutcome, HandlerResult, InterceptedRequest, Method};
