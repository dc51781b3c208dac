//! JSON <-> wire value conversion for the CLI surface.
//!
//! The protocol's value model is deliberately smaller than JSON: flat
//! sequences of nil, booleans, integers, floats, strings, and object
//! references. JSON arrays map onto sequences; a reference is spelled
//! `{"ref": N}` since JSON has no native handle type.

use sandbridge_frame::MessageKind;
use sandbridge_wire::Value;
use serde_json::Number;

use crate::exit::{CliError, USAGE};

/// Look up a message kind by its protocol name (e.g. `script-message`).
pub fn kind_by_name(name: &str) -> Result<MessageKind, CliError> {
    MessageKind::ALL
        .iter()
        .copied()
        .find(|kind| kind.name() == name)
        .ok_or_else(|| {
            let known: Vec<&str> = MessageKind::ALL.iter().map(|kind| kind.name()).collect();
            CliError::new(
                USAGE,
                format!("unknown message kind {name:?} (known: {})", known.join(", ")),
            )
        })
}

/// Parse a JSON array into a wire value sequence.
pub fn values_from_json(text: &str) -> Result<Vec<Value>, CliError> {
    let parsed: serde_json::Value = serde_json::from_str(text)
        .map_err(|err| CliError::new(USAGE, format!("invalid JSON payload: {err}")))?;
    let serde_json::Value::Array(items) = parsed else {
        return Err(CliError::new(USAGE, "payload must be a JSON array of values"));
    };
    items.iter().map(value_from_json).collect()
}

fn value_from_json(item: &serde_json::Value) -> Result<Value, CliError> {
    match item {
        serde_json::Value::Null => Ok(Value::Nil),
        serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Value::Float(f))
            } else {
                Err(CliError::new(USAGE, format!("unrepresentable number {n}")))
            }
        }
        serde_json::Value::String(s) => Ok(Value::Str(s.clone())),
        serde_json::Value::Object(map) => match map.get("ref") {
            Some(id) if map.len() == 1 => id
                .as_u64()
                .map(Value::Ref)
                .ok_or_else(|| CliError::new(USAGE, "\"ref\" must be a non-negative integer")),
            _ => Err(CliError::new(
                USAGE,
                "objects must be exactly {\"ref\": N}",
            )),
        },
        serde_json::Value::Array(_) => Err(CliError::new(
            USAGE,
            "nested arrays are not representable on the wire",
        )),
    }
}

/// Render a wire value sequence as a JSON array.
pub fn values_to_json(values: &[Value]) -> serde_json::Value {
    serde_json::Value::Array(values.iter().map(value_to_json).collect())
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Nil => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::Number((*i).into()),
        Value::Float(f) => Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Str(s) => serde_json::Value::String(s.clone()),
        Value::Ref(id) => serde_json::json!({ "ref": id }),
    }
}
