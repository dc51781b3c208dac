use std::collections::HashMap;

use bytes::Bytes;
use tracing::trace;

use sandbridge_frame::MessageKind;

use crate::endpoint::Endpoint;
use crate::error::{ProtocolViolation, Result};

/// A registered message handler.
///
/// Runs synchronously on the thread pumping the endpoint — the process's
/// script-execution thread — so handlers never race script code.
pub type Handler = Box<dyn FnMut(&mut Endpoint, Bytes) -> Result<()> + Send>;

/// Maps received message kinds to handlers.
///
/// The bridge kinds (`call`, `call-reply`, `release`) are handled inside
/// [`Endpoint`] itself and never reach the dispatcher. Every other kind
/// valid for the process's role must have a handler: an unregistered
/// kind is a fatal misconfiguration, not something to drop silently,
/// because proceeding would desynchronize downstream script state.
#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<MessageKind, Handler>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for a message kind, replacing any previous
    /// registration.
    pub fn register<F>(&mut self, kind: MessageKind, handler: F)
    where
        F: FnMut(&mut Endpoint, Bytes) -> Result<()> + Send + 'static,
    {
        self.handlers.insert(kind, Box::new(handler));
    }

    /// Whether a handler is registered for `kind`.
    pub fn is_registered(&self, kind: MessageKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Invoke the registered handler for a received message.
    pub fn dispatch(
        &mut self,
        endpoint: &mut Endpoint,
        kind: MessageKind,
        payload: Bytes,
    ) -> Result<()> {
        match self.handlers.get_mut(&kind) {
            Some(handler) => {
                trace!(kind = kind.name(), len = payload.len(), "dispatching");
                handler(endpoint, payload)
            }
            None => Err(ProtocolViolation::UnhandledKind { kind: kind.name() }.into()),
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<&str> = self.handlers.keys().map(|kind| kind.name()).collect();
        kinds.sort_unstable();
        f.debug_struct("Dispatcher").field("kinds", &kinds).finish()
    }
}
