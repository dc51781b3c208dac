use bytes::{BufMut, BytesMut};

use crate::error::{Result, WireError};
use crate::value::Value;

// Value tags. One byte each; multi-byte fields are network byte order.
const TAG_NIL: u8 = 0x00;
const TAG_BOOL: u8 = 0x01;
const TAG_INT: u8 = 0x02;
const TAG_FLOAT: u8 = 0x03;
const TAG_STR: u8 = 0x04;
const TAG_REF: u8 = 0x05;

/// Encode an ordered value sequence into a fresh buffer.
pub fn encode(values: &[Value]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(wire_size(values));
    encode_into(values, &mut buf);
    buf
}

/// Encode an ordered value sequence, appending to `dst`.
///
/// Wire format, per value:
/// ```text
/// ┌──────────┬─────────────────────────────────────────────┐
/// │ Tag (1B) │ nil: none       bool: 1B (0/1)              │
/// │          │ int: 8B BE      float: 8B BE (IEEE-754 bits)│
/// │          │ str: 4B BE len + UTF-8 bytes                │
/// │          │ ref: 8B BE id                               │
/// └──────────┴─────────────────────────────────────────────┘
/// ```
pub fn encode_into(values: &[Value], dst: &mut BytesMut) {
    dst.reserve(wire_size(values));
    for value in values {
        match value {
            Value::Nil => dst.put_u8(TAG_NIL),
            Value::Bool(b) => {
                dst.put_u8(TAG_BOOL);
                dst.put_u8(u8::from(*b));
            }
            Value::Int(n) => {
                dst.put_u8(TAG_INT);
                dst.put_i64(*n);
            }
            Value::Float(f) => {
                dst.put_u8(TAG_FLOAT);
                dst.put_u64(f.to_bits());
            }
            Value::Str(s) => {
                dst.put_u8(TAG_STR);
                dst.put_u32(s.len() as u32);
                dst.put_slice(s.as_bytes());
            }
            Value::Ref(id) => {
                dst.put_u8(TAG_REF);
                dst.put_u64(*id);
            }
        }
    }
}

/// Decode a complete value sequence from `bytes`.
///
/// The whole buffer must be consumed; a trailing partial value is a
/// `Truncated` error, never a silent stop. The decoder performs a bounds
/// check before every read and cannot run past the buffer.
pub fn decode(bytes: &[u8]) -> Result<Vec<Value>> {
    let mut cursor = Cursor { bytes, pos: 0 };
    let mut values = Vec::new();

    while !cursor.is_empty() {
        values.push(cursor.read_value()?);
    }

    Ok(values)
}

/// Total encoded size of a value sequence.
fn wire_size(values: &[Value]) -> usize {
    values
        .iter()
        .map(|value| match value {
            Value::Nil => 1,
            Value::Bool(_) => 2,
            Value::Int(_) | Value::Float(_) | Value::Ref(_) => 9,
            Value::Str(s) => 5 + s.len(),
        })
        .sum()
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let remaining = self.bytes.len() - self.pos;
        if remaining < n {
            return Err(WireError::Truncated {
                needed: n - remaining,
            });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes(bytes.try_into().expect("4-byte slice")))
    }

    fn read_u64(&mut self) -> Result<u64> {
        let bytes = self.take(8)?;
        Ok(u64::from_be_bytes(bytes.try_into().expect("8-byte slice")))
    }

    fn read_value(&mut self) -> Result<Value> {
        let tag = self.read_u8()?;
        match tag {
            TAG_NIL => Ok(Value::Nil),
            TAG_BOOL => match self.read_u8()? {
                0 => Ok(Value::Bool(false)),
                1 => Ok(Value::Bool(true)),
                other => Err(WireError::InvalidBool(other)),
            },
            TAG_INT => Ok(Value::Int(self.read_u64()? as i64)),
            TAG_FLOAT => Ok(Value::Float(f64::from_bits(self.read_u64()?))),
            TAG_STR => {
                let len = self.read_u32()? as usize;
                let bytes = self.take(len)?;
                let text = std::str::from_utf8(bytes)?;
                Ok(Value::Str(text.to_string()))
            }
            TAG_REF => Ok(Value::Ref(self.read_u64()?)),
            other => Err(WireError::UnknownTag(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_all_kinds() {
        let values = vec![
            Value::Nil,
            Value::Bool(true),
            Value::Bool(false),
            Value::Int(-42),
            Value::Int(i64::MAX),
            Value::Float(3.5),
            Value::Str("module.init".to_string()),
            Value::Str(String::new()),
            Value::Ref(7),
        ];

        let encoded = encode(&values);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn roundtrip_empty_sequence() {
        let encoded = encode(&[]);
        assert!(encoded.is_empty());
        assert_eq!(decode(&encoded).unwrap(), Vec::<Value>::new());
    }

    #[test]
    fn roundtrip_large_string() {
        let values = vec![Value::Str("x".repeat(256 * 1024))];
        let encoded = encode(&values);
        assert_eq!(decode(&encoded).unwrap(), values);
    }

    #[test]
    fn roundtrip_non_ascii_string() {
        let values = vec![Value::Str("gemütlich ▶ 日本語".to_string())];
        let encoded = encode(&values);
        assert_eq!(decode(&encoded).unwrap(), values);
    }

    #[test]
    fn integers_encode_in_network_order() {
        let encoded = encode(&[Value::Int(1)]);
        assert_eq!(
            encoded.as_ref(),
            &[0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01]
        );
    }

    #[test]
    fn ref_tag_marks_opaque_references() {
        let encoded = encode(&[Value::Ref(0x0102030405060708)]);
        assert_eq!(encoded[0], 0x05);
        // The id itself is carried opaquely; only the tag distinguishes
        // it from a plain integer.
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, vec![Value::Ref(0x0102030405060708)]);
    }

    #[test]
    fn truncated_scalar_rejected() {
        let mut encoded = encode(&[Value::Int(99)]);
        encoded.truncate(5);
        assert!(matches!(
            decode(&encoded),
            Err(WireError::Truncated { .. })
        ));
    }

    #[test]
    fn truncated_string_body_rejected() {
        let mut encoded = encode(&[Value::Str("hello world".to_string())]);
        let cut = encoded.len() - 3;
        encoded.truncate(cut);
        assert!(matches!(
            decode(&encoded),
            Err(WireError::Truncated { .. })
        ));
    }

    #[test]
    fn string_length_never_reads_past_buffer() {
        // Claims a 1 GiB string but supplies 2 bytes.
        let mut bytes = vec![TAG_STR];
        bytes.extend_from_slice(&0x4000_0000u32.to_be_bytes());
        bytes.extend_from_slice(b"ab");
        assert!(matches!(decode(&bytes), Err(WireError::Truncated { .. })));
    }

    #[test]
    fn unknown_tag_rejected() {
        assert!(matches!(decode(&[0x7f]), Err(WireError::UnknownTag(0x7f))));
    }

    #[test]
    fn invalid_bool_byte_rejected() {
        assert!(matches!(
            decode(&[TAG_BOOL, 0x02]),
            Err(WireError::InvalidBool(0x02))
        ));
    }

    #[test]
    fn invalid_utf8_rejected() {
        let mut bytes = vec![TAG_STR];
        bytes.extend_from_slice(&2u32.to_be_bytes());
        bytes.extend_from_slice(&[0xff, 0xfe]);
        assert!(matches!(decode(&bytes), Err(WireError::InvalidUtf8(_))));
    }

    #[test]
    fn encode_into_appends() {
        let mut buf = BytesMut::new();
        encode_into(&[Value::Nil], &mut buf);
        encode_into(&[Value::Bool(true)], &mut buf);
        assert_eq!(
            decode(&buf).unwrap(),
            vec![Value::Nil, Value::Bool(true)]
        );
    }
}
