//! Controller/worker IPC over Unix sockets with a remote-call bridge.
//!
//! sandbridge carries the private protocol between a controller process
//! and its sandboxed script workers: a compact wire codec for script
//! value sequences, length-prefixed kind-tagged framing, per-connection
//! endpoints with role-checked dispatch, and a blocking remote-call
//! bridge with message-driven reference management.
//!
//! # Crate Structure
//!
//! - [`transport`] — Unix-domain-socket rendezvous and connected streams
//! - [`wire`] — script value sequences and their binary codec
//! - [`frame`] — kind-tagged length-prefixed framing and the message-kind set
//! - [`endpoint`] — per-connection state, dispatch, and the call bridge
//!   (behind the `endpoint` feature)

/// Re-export transport types.
pub mod transport {
    pub use sandbridge_transport::*;
}

/// Re-export wire codec types.
pub mod wire {
    pub use sandbridge_wire::*;
}

/// Re-export frame types.
pub mod frame {
    pub use sandbridge_frame::*;
}

/// Re-export endpoint types (requires `endpoint` feature).
#[cfg(feature = "endpoint")]
pub mod endpoint {
    pub use sandbridge_endpoint::*;
}
