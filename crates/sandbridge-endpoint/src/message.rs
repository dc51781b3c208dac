//! Typed payload records for the protocol's message kinds.
//!
//! Two payload families exist on the wire: codec-encoded value
//! sequences (`call`, `call-reply`, `module-require`,
//! `script-function-register`, and the opaque script messages) and
//! fixed-layout records in network byte order (`release`,
//! `content-ready`, `scroll-event`). Each record here carries its own
//! encode/decode pair; the endpoint never interprets payload bytes
//! directly.

use bytes::BytesMut;

use sandbridge_wire::{self as wire, RefId, Value, WireError};

use crate::refs::ScriptFault;

/// Errors from decoding a typed payload record.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// The value sequence itself is malformed.
    #[error(transparent)]
    Wire(#[from] WireError),

    /// The sequence decoded, but not into the expected shape.
    #[error("unexpected {kind} payload shape: {reason}")]
    Shape {
        kind: &'static str,
        reason: &'static str,
    },

    /// A fixed-layout record has the wrong length.
    #[error("{kind} record length mismatch (got {got} bytes, want {want})")]
    FixedLen {
        kind: &'static str,
        got: usize,
        want: usize,
    },
}

/// `call` payload: callee reference, target context, correlation id,
/// and the invocation arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRequest {
    pub callee: RefId,
    pub context: u64,
    pub call_id: u64,
    pub args: Vec<Value>,
}

impl CallRequest {
    pub fn encode(&self) -> BytesMut {
        let mut values = Vec::with_capacity(3 + self.args.len());
        values.push(Value::Ref(self.callee));
        values.push(Value::Int(self.context as i64));
        values.push(Value::Int(self.call_id as i64));
        values.extend(self.args.iter().cloned());
        wire::encode(&values)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, MessageError> {
        let mut values = wire::decode(bytes)?;
        if values.len() < 3 {
            return Err(MessageError::Shape {
                kind: "call",
                reason: "fewer than three leading values",
            });
        }
        let args = values.split_off(3);
        let callee = values[0].as_ref_id().ok_or(MessageError::Shape {
            kind: "call",
            reason: "callee is not a reference",
        })?;
        let context = values[1].as_int().ok_or(MessageError::Shape {
            kind: "call",
            reason: "context id is not an integer",
        })? as u64;
        let call_id = values[2].as_int().ok_or(MessageError::Shape {
            kind: "call",
            reason: "call id is not an integer",
        })? as u64;
        Ok(Self {
            callee,
            context,
            call_id,
            args,
        })
    }
}

/// `call-reply` payload: correlation id, success flag, then either the
/// result values or the captured fault message.
#[derive(Debug, Clone, PartialEq)]
pub struct CallReply {
    pub call_id: u64,
    pub outcome: Result<Vec<Value>, ScriptFault>,
}

impl CallReply {
    pub fn encode(&self) -> BytesMut {
        let mut values = vec![Value::Int(self.call_id as i64)];
        match &self.outcome {
            Ok(results) => {
                values.push(Value::Bool(true));
                values.extend(results.iter().cloned());
            }
            Err(fault) => {
                values.push(Value::Bool(false));
                values.push(Value::Str(fault.message().to_string()));
            }
        }
        wire::encode(&values)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, MessageError> {
        let mut values = wire::decode(bytes)?;
        if values.len() < 2 {
            return Err(MessageError::Shape {
                kind: "call-reply",
                reason: "missing call id or success flag",
            });
        }
        let rest = values.split_off(2);
        let call_id = values[0].as_int().ok_or(MessageError::Shape {
            kind: "call-reply",
            reason: "call id is not an integer",
        })? as u64;
        let ok = values[1].as_bool().ok_or(MessageError::Shape {
            kind: "call-reply",
            reason: "success flag is not a boolean",
        })?;

        let outcome = if ok {
            Ok(rest)
        } else {
            let message = rest
                .first()
                .and_then(|value| value.as_str())
                .ok_or(MessageError::Shape {
                    kind: "call-reply",
                    reason: "failure reply carries no message string",
                })?;
            Err(ScriptFault::new(message))
        };

        Ok(Self { call_id, outcome })
    }
}

/// `release` payload: the fixed 8-byte reference id, network order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseRecord(pub RefId);

impl ReleaseRecord {
    pub fn encode(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, MessageError> {
        Ok(Self(fixed_u64("release", bytes)?))
    }
}

/// `content-ready` payload: the fixed 8-byte content-context id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentReady(pub u64);

impl ContentReady {
    pub fn encode(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, MessageError> {
        Ok(Self(fixed_u64("content-ready", bytes)?))
    }
}

/// `scroll-event` payload: fixed record of the two axis deltas.
///
/// The controller fans one scroll record out to every content view, so
/// the record carries no view id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollEvent {
    pub dx: f64,
    pub dy: f64,
}

impl ScrollEvent {
    pub const WIRE_SIZE: usize = 16;

    pub fn encode(&self) -> [u8; Self::WIRE_SIZE] {
        let mut out = [0u8; Self::WIRE_SIZE];
        out[..8].copy_from_slice(&self.dx.to_bits().to_be_bytes());
        out[8..].copy_from_slice(&self.dy.to_bits().to_be_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, MessageError> {
        if bytes.len() != Self::WIRE_SIZE {
            return Err(MessageError::FixedLen {
                kind: "scroll-event",
                got: bytes.len(),
                want: Self::WIRE_SIZE,
            });
        }
        let dx = f64::from_bits(u64::from_be_bytes(
            bytes[..8].try_into().expect("8-byte slice"),
        ));
        let dy = f64::from_bits(u64::from_be_bytes(
            bytes[8..].try_into().expect("8-byte slice"),
        ));
        Ok(Self { dx, dy })
    }
}

/// `module-require` payload: module name plus the requesting context id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRequire {
    pub module: String,
    pub context: u64,
}

impl ModuleRequire {
    pub fn encode(&self) -> BytesMut {
        wire::encode(&[
            Value::Str(self.module.clone()),
            Value::Int(self.context as i64),
        ])
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, MessageError> {
        let values = wire::decode(bytes)?;
        match values.as_slice() {
            [Value::Str(module), Value::Int(context)] => Ok(Self {
                module: module.clone(),
                context: *context as u64,
            }),
            _ => Err(MessageError::Shape {
                kind: "module-require",
                reason: "expected [string, int]",
            }),
        }
    }
}

/// `script-function-register` payload: a function descriptor naming an
/// exported callable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionRegistration {
    pub name: String,
    pub func: RefId,
}

impl FunctionRegistration {
    pub fn encode(&self) -> BytesMut {
        wire::encode(&[Value::Str(self.name.clone()), Value::Ref(self.func)])
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, MessageError> {
        let values = wire::decode(bytes)?;
        match values.as_slice() {
            [Value::Str(name), Value::Ref(func)] => Ok(Self {
                name: name.clone(),
                func: *func,
            }),
            _ => Err(MessageError::Shape {
                kind: "script-function-register",
                reason: "expected [string, ref]",
            }),
        }
    }
}

fn fixed_u64(kind: &'static str, bytes: &[u8]) -> Result<u64, MessageError> {
    let record: [u8; 8] = bytes.try_into().map_err(|_| MessageError::FixedLen {
        kind,
        got: bytes.len(),
        want: 8,
    })?;
    Ok(u64::from_be_bytes(record))
}
