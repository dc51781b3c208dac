use crate::message::MessageError;
use crate::refs::ScriptFault;

/// Errors surfaced by endpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] sandbridge_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] sandbridge_frame::FrameError),

    /// A received payload could not be decoded. The endpoint closes the
    /// connection, since continuing to read would desynchronize framing.
    #[error("malformed payload: {0}")]
    Payload(#[from] MessageError),

    /// The peer is gone: its process exited, crashed, or closed the
    /// connection. Pending calls resolve with this error; the endpoint's
    /// remote-reference table has been cleared.
    #[error("peer lost")]
    PeerLost,

    /// The callee's script-level failure during a remote call. Fully
    /// recoverable; round-tripped to the caller as a normal outcome.
    #[error("script invocation failed: {0}")]
    Script(ScriptFault),

    /// A protocol invariant was violated. Fatal: it signals a
    /// controller/worker version mismatch that cannot be safely worked
    /// around, so receive loops abort the process on it.
    #[error("protocol violation: {0}")]
    Protocol(ProtocolViolation),
}

/// The unrecoverable protocol-invariant violations.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolViolation {
    /// The frame header's kind code is outside the closed set.
    #[error("unknown message kind code {code}")]
    UnknownKind { code: u32 },

    /// A kind arrived at a role that must never receive it.
    #[error("kind {kind} is not receivable by a {role} endpoint")]
    WrongRole { kind: &'static str, role: &'static str },

    /// An attempt to send a kind the peer's role must never receive.
    #[error("kind {kind} cannot be sent to a {peer_role} peer")]
    WrongRoleSend {
        kind: &'static str,
        peer_role: &'static str,
    },

    /// A kind valid for this role arrived with no registered handler.
    #[error("no handler registered for kind {kind}")]
    UnhandledKind { kind: &'static str },
}

impl From<ProtocolViolation> for EndpointError {
    fn from(violation: ProtocolViolation) -> Self {
        EndpointError::Protocol(violation)
    }
}

impl From<sandbridge_wire::WireError> for EndpointError {
    fn from(err: sandbridge_wire::WireError) -> Self {
        EndpointError::Payload(MessageError::Wire(err))
    }
}

pub type Result<T> = std::result::Result<T, EndpointError>;
