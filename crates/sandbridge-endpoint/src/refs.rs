use std::collections::HashMap;

use tracing::debug;

use sandbridge_wire::{RefId, Value};

/// A script-level failure raised by a callable during a remote call.
///
/// Captured on the executing side and round-tripped to the original
/// caller as a normal reply; it never crosses the link as a transport
/// error and never crashes either process.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ScriptFault(pub String);

impl ScriptFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

/// A local scripting-runtime callable exported to the peer.
///
/// Invoked with the target context id and the decoded call arguments;
/// returns result values or a captured script fault.
pub type ScriptCallable =
    Box<dyn FnMut(u64, &[Value]) -> std::result::Result<Vec<Value>, ScriptFault> + Send>;

/// The remote-reference table of one endpoint.
///
/// Arena+index of locally owned script objects that the peer holds
/// references to, keyed by integer id. Ownership cannot cross a process
/// boundary, so the table keeps exactly one counted reference per
/// exported object and drops it when the peer's `release` message
/// arrives (or on endpoint teardown). Scoped to the endpoint instance,
/// never process-wide.
#[derive(Default)]
pub struct RefTable {
    next_id: RefId,
    entries: HashMap<RefId, ScriptCallable>,
}

impl RefTable {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            entries: HashMap::new(),
        }
    }

    /// Export a callable, returning the id the peer will use to invoke
    /// or release it. Ids are never reused within one endpoint lifetime.
    pub fn export(&mut self, callable: ScriptCallable) -> RefId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(id, callable);
        id
    }

    /// Invoke an exported callable.
    ///
    /// An unknown id yields a script fault, not a protocol error: the
    /// peer may race a call against a release during crash/respawn.
    pub fn invoke(
        &mut self,
        id: RefId,
        context: u64,
        args: &[Value],
    ) -> std::result::Result<Vec<Value>, ScriptFault> {
        match self.entries.get_mut(&id) {
            Some(callable) => callable(context, args),
            None => Err(ScriptFault::new(format!("no exported object with id {id}"))),
        }
    }

    /// Drop the owned handle for `id`. Idempotent: releasing an unknown
    /// or already-released id is a no-op, because crash/respawn races
    /// can duplicate or delay release messages.
    pub fn release(&mut self, id: RefId) -> bool {
        let released = self.entries.remove(&id).is_some();
        if released {
            debug!(id, "released exported object");
        } else {
            debug!(id, "release for unknown id; ignoring");
        }
        released
    }

    /// Drop every owned handle. Returns how many were released.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    /// Number of live exported objects.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `id` is currently exported.
    pub fn contains(&self, id: RefId) -> bool {
        self.entries.contains_key(&id)
    }
}

impl std::fmt::Debug for RefTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefTable")
            .field("next_id", &self.next_id)
            .field("entries", &self.entries.len())
            .finish()
    }
}
