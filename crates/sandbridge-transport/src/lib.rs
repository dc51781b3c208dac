//! Rendezvous transport for the controller/worker link.
//!
//! The controller binds a private Unix domain socket under its per-run
//! cache directory; each worker process connects to it once at startup.
//! This is the lowest layer of sandbridge. Everything else builds on top
//! of the [`LinkStream`] type provided here.

pub mod error;
pub mod stream;

#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use stream::LinkStream;

#[cfg(unix)]
pub use uds::{rendezvous_path, RendezvousListener, RENDEZVOUS_FILE_NAME};
