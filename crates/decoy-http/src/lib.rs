// Library exports for the decoy binary and for test suites embedding the fake transport

// ===== Routing =====
pub mod recognizer;

// ===== Fake transport and interception =====
pub mod server;
pub mod transport;

// ===== Fixtures and record stores =====
pub mod agent;

pub mod config;
pub mod error;

pub use agent::{Agent, Store};
pub use config::DecoyConfig;
pub use error::{DecoyError, Result};
pub use recognizer::Recognizer;
pub use server::{HandlerResult, InterceptedRequest, Method, Server};
pub use transport::{FakeTransport, OpenOptions, ReadyState, Transport, TransportBinding};
