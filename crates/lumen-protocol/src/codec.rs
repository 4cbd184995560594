//! The codec contract: `FromJson`/`ToJson` with one impl per message type.
//!
//! Decoders are tolerant of unknown fields and of null-where-optional, and
//! strict on missing required fields: the error names the first missing
//! field. Missing optional numerics decode to the `-1` sentinel; the
//! sentinel is translated to a proper `Option` before values leave the wire
//! boundary. Encoders omit absent optionals entirely (never `null`) and
//! encode empty vectors as `[]`.

use lumen_position::{Position, Range};
use serde_json::{Map, Value};
use thiserror::Error;

/// A decode failure, pointing at the first missing or malformed field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A required field was missing or null.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    /// A field was present but had the wrong shape.
    #[error("invalid field `{0}`")]
    InvalidField(&'static str),
}

/// Decode a typed record from a JSON value.
pub trait FromJson: Sized {
    /// Decodes `value`, failing on the first missing required field.
    fn from_json(value: &Value) -> Result<Self, DecodeError>;
}

/// Encode a typed record into a JSON value.
pub trait ToJson {
    /// Encodes `self`. Infallible; absent optionals are omitted.
    fn to_json(&self) -> Value;
}

/// The field if present and non-null.
pub fn field<'a>(value: &'a Value, name: &str) -> Option<&'a Value> {
    match value.get(name) {
        Some(Value::Null) | None => None,
        Some(v) => Some(v),
    }
}

/// The field, required.
pub fn require<'a>(value: &'a Value, name: &'static str) -> Result<&'a Value, DecodeError> {
    field(value, name).ok_or(DecodeError::MissingField(name))
}

/// The field as an object, required.
pub fn require_object<'a>(
    value: &'a Value,
    name: &'static str,
) -> Result<&'a Value, DecodeError> {
    let inner = require(value, name)?;
    if inner.is_object() {
        Ok(inner)
    } else {
        Err(DecodeError::InvalidField(name))
    }
}

/// String field with a default, tolerant of absence and wrong types.
pub fn str_or(value: &Value, name: &str, default: &str) -> String {
    field(value, name).and_then(Value::as_str).unwrap_or(default).to_string()
}

/// Required string field.
pub fn require_str(value: &Value, name: &'static str) -> Result<String, DecodeError> {
    match require(value, name)?.as_str() {
        Some(s) => Ok(s.to_string()),
        None => Err(DecodeError::InvalidField(name)),
    }
}

/// Signed 32-bit field with a default (`-1` is the conventional sentinel).
pub fn i32_or(value: &Value, name: &str, default: i32) -> i32 {
    field(value, name).and_then(Value::as_i64).map(|n| n as i32).unwrap_or(default)
}

/// Signed 64-bit field with a default.
pub fn i64_or(value: &Value, name: &str, default: i64) -> i64 {
    field(value, name).and_then(Value::as_i64).unwrap_or(default)
}

/// Boolean field with a default.
pub fn bool_or(value: &Value, name: &str, default: bool) -> bool {
    field(value, name).and_then(Value::as_bool).unwrap_or(default)
}

/// Decodes a `{line, character}` object; both coordinates are required.
pub fn decode_position(value: &Value) -> Result<Position, DecodeError> {
    let line = require(value, "line")?;
    let character = require(value, "character")?;
    match (line.as_i64(), character.as_i64()) {
        (Some(line), Some(character)) => Ok(Position::new(line as i32, character as i32)),
        (None, _) => Err(DecodeError::InvalidField("line")),
        (_, None) => Err(DecodeError::InvalidField("character")),
    }
}

/// Decodes a `{start, end}` range of positions.
pub fn decode_range(value: &Value) -> Result<Range, DecodeError> {
    let start = decode_position(require_object(value, "start")?)?;
    let end = decode_position(require_object(value, "end")?)?;
    Ok(Range::new(start, end))
}

/// Encodes a position as `{line, character}`.
pub fn position_json(pos: Position) -> Value {
    let mut obj = Map::new();
    obj.insert("line".to_string(), Value::from(pos.line));
    obj.insert("character".to_string(), Value::from(pos.column));
    Value::Object(obj)
}

/// Encodes a range as `{start, end}`.
pub fn range_json(range: Range) -> Value {
    let mut obj = Map::new();
    obj.insert("start".to_string(), position_json(range.start));
    obj.insert("end".to_string(), position_json(range.end));
    Value::Object(obj)
}

/// Encodes a slice, yielding `[]` (never null) when empty.
pub fn array_json<T, F: Fn(&T) -> Value>(items: &[T], encode: F) -> Value {
    Value::Array(items.iter().map(encode).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_treats_null_as_absent() {
        let v = json!({"a": null, "b": 1});
        assert!(field(&v, "a").is_none());
        assert!(field(&v, "b").is_some());
        assert!(field(&v, "c").is_none());
    }

    #[test]
    fn test_require_names_missing_field() {
        let v = json!({});
        assert_eq!(require(&v, "uri"), Err(DecodeError::MissingField("uri")));
    }

    #[test]
    fn test_numeric_sentinel_default() {
        let v = json!({"present": 5});
        assert_eq!(i32_or(&v, "present", -1), 5);
        assert_eq!(i32_or(&v, "absent", -1), -1);
        assert_eq!(i32_or(&json!({"bad": "x"}), "bad", -1), -1);
    }

    #[test]
    fn test_position_round_trip() {
        let wire = json!({"line": 3, "character": 9});
        let pos = decode_position(&wire).expect("decode");
        assert_eq!(position_json(pos), wire);
    }

    #[test]
    fn test_position_requires_both_coordinates() {
        assert_eq!(
            decode_position(&json!({"line": 3})),
            Err(DecodeError::MissingField("character"))
        );
        assert_eq!(
            decode_position(&json!({"character": 3})),
            Err(DecodeError::MissingField("line"))
        );
    }

    #[test]
    fn test_empty_array_is_brackets() {
        let encoded = array_json::<i32, _>(&[], |v| Value::from(*v));
        assert_eq!(serde_json::to_string(&encoded).expect("serialize"), "[]");
    }
}
