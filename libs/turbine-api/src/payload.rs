use std::fmt;

use serde_json::{Map, Value};

use crate::error::TurbineError;
use crate::schema::{FieldValue, SchemaField};

/// Top-level key holding user data.
const PAYLOAD_KEY: &str = "payload";
/// Top-level key holding the schema descriptor object.
const SCHEMA_KEY: &str = "schema";
/// Key under `schema` holding the descriptor array.
const FIELDS_KEY: &str = "fields";

/// Raw record content.
///
/// Semantically a JSON document shaped as
/// `{"payload": {...user data...}, "schema": {"fields": [...]}}`.
/// The bytes are kept as-is until a path operation needs to parse them.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Payload(Vec<u8>);

impl Payload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode the whole document into a generic map.
    pub fn as_map(&self) -> Result<Map<String, Value>, TurbineError> {
        serde_json::from_slice(&self.0).map_err(|e| TurbineError::Decode(e.to_string()))
    }

    /// Read the value at a dot-separated `path` under `payload`.
    ///
    /// Missing paths and undecodable payloads yield `None`.
    pub fn get(&self, path: &str) -> Option<Value> {
        let root: Value = serde_json::from_slice(&self.0).ok()?;
        resolve_path(root.get(PAYLOAD_KEY)?, path).cloned()
    }

    /// Upsert `value` at `path` under `payload`.
    ///
    /// When the path did not exist before the write, a descriptor
    /// `{field: path, optional: true, type: <inferred>}` is appended to
    /// `schema.fields`. Descriptors are never deduplicated.
    pub fn set(&mut self, path: &str, value: impl Into<FieldValue>) -> Result<(), TurbineError> {
        let value = value.into();
        let json = value.to_json().ok_or_else(|| {
            TurbineError::Write(format!("{path}: value has no JSON representation"))
        })?;

        let mut root = self.parse_object()?;
        let existed = root
            .get(PAYLOAD_KEY)
            .is_some_and(|payload| resolve_path(payload, path).is_some());

        let payload = root
            .entry(PAYLOAD_KEY)
            .or_insert_with(|| Value::Object(Map::new()));
        set_path(payload, path, json).map_err(|e| e.with_context(path))?;

        if !existed {
            let descriptor = SchemaField::discovered(path, value.field_type());
            append_descriptor(&mut root, descriptor)?;
        }

        self.store(root)
    }

    /// Remove the value at `path` under `payload`.
    ///
    /// Schema descriptors previously appended for `path` are left in place.
    /// Removing a missing path succeeds without changes.
    pub fn delete(&mut self, path: &str) -> Result<(), TurbineError> {
        let mut root = self.parse_object()?;
        let removed = match root.get_mut(PAYLOAD_KEY) {
            Some(payload) => delete_path(payload, path),
            None => false,
        };
        if removed {
            self.store(root)?;
        }
        Ok(())
    }

    fn parse_object(&self) -> Result<Map<String, Value>, TurbineError> {
        if self.0.iter().all(u8::is_ascii_whitespace) {
            return Ok(Map::new());
        }
        match serde_json::from_slice(&self.0) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(TurbineError::Write("payload document is not a JSON object".into())),
            Err(e) => Err(TurbineError::Decode(e.to_string())),
        }
    }

    fn store(&mut self, root: Map<String, Value>) -> Result<(), TurbineError> {
        self.0 = serde_json::to_vec(&Value::Object(root))
            .map_err(|e| TurbineError::Write(e.to_string()))?;
        Ok(())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Payload")
            .field(&String::from_utf8_lossy(&self.0))
            .finish()
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

// ════════════════════════════════════════════════════════════════
//  Path helpers
// ════════════════════════════════════════════════════════════════

/// Resolve a dot-notation path in a `serde_json::Value`.
///
/// Object segments are looked up by key; a numeric segment indexes an array.
/// Returns `None` if any segment is missing.
pub fn resolve_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn set_path(target: &mut Value, path: &str, value: Value) -> Result<(), TurbineError> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(TurbineError::Write(format!("invalid path '{path}'")));
    }
    let Some((last, parents)) = segments.split_last() else {
        return Err(TurbineError::Write("empty path".into()));
    };

    let mut current = target;
    for segment in parents {
        current = match current {
            Value::Object(map) => map
                .entry(*segment)
                .or_insert_with(|| Value::Object(Map::new())),
            Value::Array(items) => array_slot(items, segment)?,
            other => {
                return Err(TurbineError::Write(format!(
                    "cannot index '{segment}' into {}",
                    kind_of(other)
                )));
            }
        };
    }

    match current {
        Value::Object(map) => {
            map.insert((*last).to_owned(), value);
            Ok(())
        }
        Value::Array(items) => {
            *array_slot(items, last)? = value;
            Ok(())
        }
        other => Err(TurbineError::Write(format!(
            "cannot set '{last}' on {}",
            kind_of(other)
        ))),
    }
}

fn delete_path(target: &mut Value, path: &str) -> bool {
    let (parent, last) = match path.rsplit_once('.') {
        Some((parent, last)) => match resolve_path_mut(target, parent) {
            Some(value) => (value, last),
            None => return false,
        },
        None => (target, path),
    };
    match parent {
        Value::Object(map) => map.shift_remove(last).is_some(),
        Value::Array(items) => match last.parse::<usize>() {
            Ok(idx) if idx < items.len() => {
                items.remove(idx);
                true
            }
            _ => false,
        },
        _ => false,
    }
}

fn resolve_path_mut<'a>(value: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get_mut(segment)?,
            Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn array_slot<'a>(items: &'a mut [Value], segment: &str) -> Result<&'a mut Value, TurbineError> {
    let len = items.len();
    segment
        .parse::<usize>()
        .ok()
        .and_then(|idx| items.get_mut(idx))
        .ok_or_else(|| {
            TurbineError::Write(format!("array index '{segment}' out of range (len {len})"))
        })
}

fn append_descriptor(root: &mut Map<String, Value>, field: SchemaField) -> Result<(), TurbineError> {
    let schema = root
        .entry(SCHEMA_KEY)
        .or_insert_with(|| Value::Object(Map::new()));
    let Value::Object(schema) = schema else {
        return Err(TurbineError::Write("'schema' is not an object".into()));
    };
    let fields = schema
        .entry(FIELDS_KEY)
        .or_insert_with(|| Value::Array(Vec::new()));
    let Value::Array(fields) = fields else {
        return Err(TurbineError::Write("'schema.fields' is not an array".into()));
    };
    fields.push(serde_json::to_value(field).map_err(|e| TurbineError::Write(e.to_string()))?);
    Ok(())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Payload {
        Payload::new(serde_json::to_vec(&value).unwrap())
    }

    fn descriptors(p: &Payload) -> Vec<Value> {
        p.as_map()
            .unwrap()
            .get("schema")
            .and_then(|schema| schema.get("fields"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }

    #[test]
    fn get_nested_value() {
        let p = payload(json!({"payload": {"user": {"email": "a@b.c"}}}));
        assert_eq!(p.get("user.email"), Some(json!("a@b.c")));
        assert_eq!(p.get("user.missing"), None);
        assert_eq!(p.get("user.email.deeper"), None);
    }

    #[test]
    fn get_on_invalid_json_is_absent() {
        let p = Payload::from("not json");
        assert_eq!(p.get("anything"), None);
    }

    #[test]
    fn as_map_rejects_invalid_json() {
        let err = Payload::from("{oops").as_map().unwrap_err();
        assert!(matches!(err, TurbineError::Decode(_)));
    }

    #[test]
    fn set_then_get_returns_value() {
        let mut p = payload(json!({"payload": {}}));
        p.set("name", "ada").unwrap();
        p.set("age", 36i32).unwrap();
        p.set("score", 9.5f64).unwrap();
        p.set("active", true).unwrap();
        p.set("tags", json!(["a", "b"])).unwrap();

        assert_eq!(p.get("name"), Some(json!("ada")));
        assert_eq!(p.get("age"), Some(json!(36)));
        assert_eq!(p.get("score"), Some(json!(9.5)));
        assert_eq!(p.get("active"), Some(json!(true)));
        assert_eq!(p.get("tags"), Some(json!(["a", "b"])));
    }

    #[test]
    fn set_then_get_every_integer_and_float_width() {
        let big = (1i64 << 53) + 1;
        let mut p = payload(json!({"payload": {}}));
        p.set("i8", i8::MIN).unwrap();
        p.set("i16", i16::MAX).unwrap();
        p.set("i32", -7i32).unwrap();
        p.set("i64", big).unwrap();
        p.set("i64_max", i64::MAX).unwrap();
        p.set("f32", 1.5f32).unwrap();
        p.set("f64", -0.25f64).unwrap();

        assert_eq!(p.get("i8"), Some(json!(-128)));
        assert_eq!(p.get("i16"), Some(json!(32767)));
        assert_eq!(p.get("i32"), Some(json!(-7)));
        assert_eq!(p.get("i64").and_then(|v| v.as_i64()), Some(big));
        assert_eq!(p.get("i64_max").and_then(|v| v.as_i64()), Some(i64::MAX));
        assert_eq!(p.get("f32").and_then(|v| v.as_f64()), Some(1.5));
        assert_eq!(p.get("f64").and_then(|v| v.as_f64()), Some(-0.25));

        let types: Vec<Value> = descriptors(&p).iter().map(|d| d["type"].clone()).collect();
        assert_eq!(
            types,
            [
                json!("int8"),
                json!("int16"),
                json!("int32"),
                json!("int64"),
                json!("int64"),
                json!("float32"),
                json!("float64")
            ]
        );
    }

    #[test]
    fn new_path_appends_descriptor_with_inferred_type() {
        let cases: Vec<(FieldValue, &str)> = vec![
            (FieldValue::from("x"), "string"),
            (FieldValue::from(1i8), "int8"),
            (FieldValue::from(1i16), "int16"),
            (FieldValue::from(1i32), "int32"),
            (FieldValue::from(1i64), "int64"),
            (FieldValue::from(1.25f32), "float32"),
            (FieldValue::from(1.25f64), "float64"),
            (FieldValue::from(false), "boolean"),
            (FieldValue::from(json!({"nested": 1})), "unsupported"),
        ];

        for (value, expected) in cases {
            let mut p = payload(json!({"payload": {"id": 1}}));
            p.set("added", value).unwrap();

            let fields = descriptors(&p);
            assert_eq!(fields.len(), 1, "type {expected}");
            assert_eq!(
                fields[0],
                json!({"field": "added", "optional": true, "type": expected})
            );
        }
    }

    #[test]
    fn existing_path_appends_no_descriptor() {
        let mut p = payload(json!({"payload": {"email": "a@b.c"}}));
        p.set("email", "hidden").unwrap();

        assert_eq!(p.get("email"), Some(json!("hidden")));
        assert!(descriptors(&p).is_empty());
    }

    #[test]
    fn descriptors_are_appended_after_existing_ones() {
        let mut p = payload(json!({
            "payload": {"id": 1},
            "schema": {"fields": [{"field": "id", "optional": false, "type": "int32"}]}
        }));
        p.set("user.country", "NL").unwrap();

        let fields = descriptors(&p);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0]["field"], json!("id"));
        assert_eq!(fields[1]["field"], json!("user.country"));
        assert_eq!(p.get("user.country"), Some(json!("NL")));
    }

    #[test]
    fn set_grows_intermediate_objects() {
        let mut p = Payload::default();
        p.set("a.b.c", 7i64).unwrap();
        assert_eq!(p.get("a.b.c"), Some(json!(7)));
        assert_eq!(p.get("a"), Some(json!({"b": {"c": 7}})));
    }

    #[test]
    fn set_through_scalar_fails() {
        let mut p = payload(json!({"payload": {"id": 1}}));
        let err = p.set("id.inner", "x").unwrap_err();
        assert!(matches!(err, TurbineError::Write(_)));
        assert_eq!(p.get("id"), Some(json!(1)));
    }

    #[test]
    fn set_rejects_non_finite_float() {
        let mut p = payload(json!({"payload": {}}));
        assert!(matches!(p.set("x", f64::NAN), Err(TurbineError::Write(_))));
    }

    #[test]
    fn delete_removes_value_but_keeps_descriptor() {
        let mut p = payload(json!({"payload": {}}));
        p.set("user.email", "a@b.c").unwrap();
        p.delete("user.email").unwrap();

        assert_eq!(p.get("user.email"), None);
        assert_eq!(p.get("user"), Some(json!({})));
        assert_eq!(descriptors(&p).len(), 1);
    }

    #[test]
    fn delete_missing_path_is_noop() {
        let original = payload(json!({"payload": {"id": 1}}));
        let mut p = original.clone();
        p.delete("nope.nothing").unwrap();
        assert_eq!(p, original);
    }

    #[test]
    fn key_order_is_preserved() {
        let mut p = Payload::from(r#"{"payload":{"z":1,"a":2}}"#);
        p.set("z", 3i32).unwrap();
        assert_eq!(p.to_string(), r#"{"payload":{"z":3,"a":2}}"#);
    }
}
