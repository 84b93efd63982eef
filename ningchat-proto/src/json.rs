//! Typed field access over loosely-typed JSON objects.
//!
//! The Ning endpoints answer with JSON whose shape drifts between
//! releases: fields appear and disappear, and the same field may be a
//! bool on one endpoint and a `"0"`/`"1"` string on another. Every
//! accessor here returns an explicit [`FieldError`] instead of
//! panicking; callers decide whether a missing field is fatal to the
//! current stage or just means "no update this tick".

use serde_json::{Map, Value};

/// Errors produced when a JSON payload does not have the expected shape.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FieldError {
    /// The payload was not valid JSON at all.
    #[error("invalid JSON: {0}")]
    Parse(String),

    /// The payload parsed, but the top level is not an object.
    #[error("expected a JSON object at the top level")]
    NotAnObject,

    /// A required field is absent.
    #[error("field not found: {0}")]
    Missing(String),

    /// A field is present but has the wrong JSON type.
    #[error("type mismatch for field '{field}': expected {expected}")]
    TypeMismatch {
        /// Name of the offending field.
        field: String,
        /// The JSON type that was expected.
        expected: &'static str,
    },
}

/// Parses raw response bytes into a JSON object.
///
/// # Errors
///
/// Returns [`FieldError::Parse`] if the bytes are not valid JSON and
/// [`FieldError::NotAnObject`] if the top-level value is not an object.
pub fn parse_object(bytes: &[u8]) -> Result<Map<String, Value>, FieldError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| FieldError::Parse(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(FieldError::NotAnObject),
    }
}

/// Returns a required string field.
///
/// # Errors
///
/// [`FieldError::Missing`] if absent, [`FieldError::TypeMismatch`] if
/// present but not a string.
pub fn str_field<'a>(obj: &'a Map<String, Value>, name: &str) -> Result<&'a str, FieldError> {
    match obj.get(name) {
        None | Some(Value::Null) => Err(FieldError::Missing(name.to_string())),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(FieldError::TypeMismatch {
            field: name.to_string(),
            expected: "string",
        }),
    }
}

/// Returns a required integer field.
///
/// # Errors
///
/// [`FieldError::Missing`] if absent, [`FieldError::TypeMismatch`] if
/// present but not an integer.
pub fn int_field(obj: &Map<String, Value>, name: &str) -> Result<i64, FieldError> {
    match obj.get(name) {
        None | Some(Value::Null) => Err(FieldError::Missing(name.to_string())),
        Some(Value::Number(n)) => n.as_i64().ok_or_else(|| FieldError::TypeMismatch {
            field: name.to_string(),
            expected: "integer",
        }),
        Some(_) => Err(FieldError::TypeMismatch {
            field: name.to_string(),
            expected: "integer",
        }),
    }
}

/// Returns a required nested object field.
///
/// # Errors
///
/// [`FieldError::Missing`] if absent, [`FieldError::TypeMismatch`] if
/// present but not an object.
pub fn object_field<'a>(
    obj: &'a Map<String, Value>,
    name: &str,
) -> Result<&'a Map<String, Value>, FieldError> {
    match obj.get(name) {
        None | Some(Value::Null) => Err(FieldError::Missing(name.to_string())),
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(FieldError::TypeMismatch {
            field: name.to_string(),
            expected: "object",
        }),
    }
}

/// Returns a required array field.
///
/// # Errors
///
/// [`FieldError::Missing`] if absent, [`FieldError::TypeMismatch`] if
/// present but not an array.
pub fn array_field<'a>(obj: &'a Map<String, Value>, name: &str) -> Result<&'a [Value], FieldError> {
    match obj.get(name) {
        None | Some(Value::Null) => Err(FieldError::Missing(name.to_string())),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(FieldError::TypeMismatch {
            field: name.to_string(),
            expected: "array",
        }),
    }
}

/// Returns a string field if present, `None` otherwise.
///
/// Non-string values also yield `None`; this is the best-effort
/// accessor used on the polling path.
#[must_use]
pub fn opt_str_field<'a>(obj: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    obj.get(name).and_then(Value::as_str)
}

/// Returns an array field if present, an empty slice otherwise.
#[must_use]
pub fn opt_array_field<'a>(obj: &'a Map<String, Value>, name: &str) -> &'a [Value] {
    obj.get(name).and_then(Value::as_array).map_or(&[], Vec::as_slice)
}

/// Reads a boolean flag that may be sent as a bool or as a `"0"`/`"1"`
/// string (the outgoing dialect uses strings, the roster uses bools).
///
/// An absent field reads as `false`.
///
/// # Errors
///
/// [`FieldError::TypeMismatch`] if the field is present but neither a
/// bool nor a string.
pub fn flag_field(obj: &Map<String, Value>, name: &str) -> Result<bool, FieldError> {
    match obj.get(name) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::String(s)) => Ok(s == "1" || s.eq_ignore_ascii_case("true")),
        Some(_) => Err(FieldError::TypeMismatch {
            field: name.to_string(),
            expected: "bool or string flag",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(json: &str) -> Map<String, Value> {
        parse_object(json.as_bytes()).unwrap()
    }

    #[test]
    fn parse_object_accepts_valid_object() {
        let map = obj(r#"{"a": 1}"#);
        assert!(map.contains_key("a"));
    }

    #[test]
    fn parse_object_rejects_garbage() {
        let result = parse_object(b"not json at all");
        assert!(matches!(result, Err(FieldError::Parse(_))));
    }

    #[test]
    fn parse_object_rejects_non_object_top_level() {
        let result = parse_object(b"[1, 2, 3]");
        assert_eq!(result.unwrap_err(), FieldError::NotAnObject);
    }

    #[test]
    fn str_field_present() {
        let map = obj(r#"{"result": "ok"}"#);
        assert_eq!(str_field(&map, "result").unwrap(), "ok");
    }

    #[test]
    fn str_field_missing() {
        let map = obj("{}");
        assert_eq!(
            str_field(&map, "result"),
            Err(FieldError::Missing("result".to_string()))
        );
    }

    #[test]
    fn str_field_null_reads_as_missing() {
        let map = obj(r#"{"targetId": null}"#);
        assert_eq!(
            str_field(&map, "targetId"),
            Err(FieldError::Missing("targetId".to_string()))
        );
    }

    #[test]
    fn str_field_wrong_type() {
        let map = obj(r#"{"result": 5}"#);
        assert!(matches!(
            str_field(&map, "result"),
            Err(FieldError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn int_field_present() {
        let map = obj(r#"{"date": 1234567890}"#);
        assert_eq!(int_field(&map, "date").unwrap(), 1_234_567_890);
    }

    #[test]
    fn int_field_wrong_type() {
        let map = obj(r#"{"date": "soon"}"#);
        assert!(matches!(
            int_field(&map, "date"),
            Err(FieldError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn object_and_array_fields() {
        let map = obj(r#"{"sender": {"ningId": "u1"}, "messages": [1]}"#);
        assert_eq!(
            str_field(object_field(&map, "sender").unwrap(), "ningId").unwrap(),
            "u1"
        );
        assert_eq!(array_field(&map, "messages").unwrap().len(), 1);
    }

    #[test]
    fn opt_accessors_tolerate_absence() {
        let map = obj("{}");
        assert!(opt_str_field(&map, "hash").is_none());
        assert!(opt_array_field(&map, "messages").is_empty());
    }

    #[test]
    fn flag_field_accepts_bool_and_string() {
        let map = obj(r#"{"a": true, "b": "1", "c": "0", "d": false}"#);
        assert!(flag_field(&map, "a").unwrap());
        assert!(flag_field(&map, "b").unwrap());
        assert!(!flag_field(&map, "c").unwrap());
        assert!(!flag_field(&map, "d").unwrap());
        assert!(!flag_field(&map, "absent").unwrap());
    }

    #[test]
    fn flag_field_rejects_numbers() {
        let map = obj(r#"{"a": 1}"#);
        assert!(matches!(
            flag_field(&map, "a"),
            Err(FieldError::TypeMismatch { .. })
        ));
    }
}
