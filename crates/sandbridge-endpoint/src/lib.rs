//! Per-connection protocol state and the remote-call bridge.
//!
//! One [`Endpoint`] owns one controller/worker connection: its frame
//! reader and writer, the pending-call table for in-flight remote
//! invocations, and the remote-reference table for script objects the
//! peer holds across the process boundary. The [`ConnectionAcceptor`]
//! hands a fresh controller-side endpoint to the application for every
//! worker that connects; [`Endpoint::connect`] is the worker side.
//!
//! All receive-side work for a given endpoint — including the handlers a
//! [`Dispatcher`] routes to — runs on the thread that pumps it, never
//! concurrently with script execution on that thread.

pub mod acceptor;
pub mod dispatcher;
pub mod endpoint;
pub mod error;
pub mod message;
pub mod refs;

pub use acceptor::ConnectionAcceptor;
pub use dispatcher::{Dispatcher, Handler};
pub use endpoint::Endpoint;
pub use error::{EndpointError, ProtocolViolation, Result};
pub use message::{
    CallReply, CallRequest, ContentReady, FunctionRegistration, MessageError, ModuleRequire,
    ReleaseRecord, ScrollEvent,
};
pub use refs::{RefTable, ScriptCallable, ScriptFault};

pub use sandbridge_frame::{MessageKind, Role};
pub use sandbridge_wire::{RefId, Value};
