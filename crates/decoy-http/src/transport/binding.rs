//! Transport factories and the swappable binding application code creates
//! transports through.

use super::fake::{FakeTransport, SendHook, DEFAULT_CHUNK_SIZE};
use super::Transport;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Produces fresh transports.
pub trait TransportFactory: Send + Sync {
    fn create(&self) -> Box<dyn Transport>;
}

impl<F> TransportFactory for F
where
    F: Fn() -> Box<dyn Transport> + Send + Sync,
{
    fn create(&self) -> Box<dyn Transport> {
        self()
    }
}

/// Builds fake transports, optionally wired to a send hook.
#[derive(Clone)]
pub struct FakeTransportFactory {
    chunk_size: usize,
    hook: Option<Arc<dyn SendHook>>,
}

impl Default for FakeTransportFactory {
    fn default() -> Self {
        Self::detached()
    }
}

impl FakeTransportFactory {
    /// Transports that wait for the caller to `respond`.
    pub fn detached() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            hook: None,
        }
    }

    /// Transports that hand every sent request to `hook`.
    pub fn hooked(hook: Arc<dyn SendHook>) -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            hook: Some(hook),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// A concrete fake transport, for callers that need `respond`.
    pub fn build(&self) -> FakeTransport {
        let mut transport = match &self.hook {
            Some(hook) => FakeTransport::with_hook(Arc::clone(hook)),
            None => FakeTransport::new(),
        };
        transport.set_chunk_size(self.chunk_size);
        transport
    }
}

impl TransportFactory for FakeTransportFactory {
    fn create(&self) -> Box<dyn Transport> {
        Box::new(self.build())
    }
}

static GLOBAL: Lazy<Arc<TransportBinding>> = Lazy::new(|| Arc::new(TransportBinding::new()));

/// The factory application code obtains transports from.
///
/// Interception swaps the factory and restores the previous one on shutdown.
/// Only one interception should be active per binding at a time; stacking
/// them restores factories in whatever order the handles are released.
pub struct TransportBinding {
    current: RwLock<Arc<dyn TransportFactory>>,
}

impl fmt::Debug for TransportBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportBinding").finish_non_exhaustive()
    }
}

impl Default for TransportBinding {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportBinding {
    /// A binding whose transports are detached fakes.
    pub fn new() -> Self {
        Self::with_factory(Arc::new(FakeTransportFactory::detached()))
    }

    pub fn with_factory(factory: Arc<dyn TransportFactory>) -> Self {
        Self {
            current: RwLock::new(factory),
        }
    }

    /// The process-wide binding.
    pub fn global() -> Arc<TransportBinding> {
        Arc::clone(&GLOBAL)
    }

    /// Create a transport from the current factory.
    pub fn create(&self) -> Box<dyn Transport> {
        let factory = Arc::clone(&*self.current.read());
        factory.create()
    }

    pub fn current(&self) -> Arc<dyn TransportFactory> {
        Arc::clone(&*self.current.read())
    }

    /// Install `factory`, returning the one it replaces.
    pub fn replace(&self, factory: Arc<dyn TransportFactory>) -> Arc<dyn TransportFactory> {
        debug!("Swapping transport factory");
        std::mem::replace(&mut *self.current.write(), factory)
    }
}
