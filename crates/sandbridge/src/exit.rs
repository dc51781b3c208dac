use std::fmt;
use std::io;

use sandbridge_endpoint::{EndpointError, MessageError};
use sandbridge_frame::FrameError;
use sandbridge_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
/// A protocol-invariant violation: unknown kind, wrong-role delivery, or
/// an unhandled kind. Signals a controller/worker version mismatch, so
/// the process aborts rather than limping on.
pub const PROTOCOL_VIOLATION: i32 = 70;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::PayloadTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn message_error(context: &str, err: MessageError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn endpoint_error(context: &str, err: EndpointError) -> CliError {
    match err {
        EndpointError::Transport(err) => transport_error(context, err),
        EndpointError::Frame(err) => frame_error(context, err),
        EndpointError::Payload(err) => message_error(context, err),
        EndpointError::PeerLost => CliError::new(FAILURE, format!("{context}: peer lost")),
        EndpointError::Script(fault) => {
            CliError::new(FAILURE, format!("{context}: script fault: {fault}"))
        }
        EndpointError::Protocol(violation) => {
            CliError::new(PROTOCOL_VIOLATION, format!("{context}: {violation}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sandbridge_endpoint::ProtocolViolation;

    #[test]
    fn protocol_violations_get_their_own_code() {
        let err = endpoint_error(
            "receive failed",
            EndpointError::Protocol(ProtocolViolation::UnknownKind { code: 999 }),
        );
        assert_eq!(err.code, PROTOCOL_VIOLATION);
        assert!(err.message.contains("999"));
    }

    #[test]
    fn peer_loss_is_a_plain_failure() {
        let err = endpoint_error("call failed", EndpointError::PeerLost);
        assert_eq!(err.code, FAILURE);
    }

    #[test]
    fn permission_denied_maps_through() {
        let err = io_error(
            "bind failed",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.code, PERMISSION_DENIED);
    }
}
