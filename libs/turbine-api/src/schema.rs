use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed vocabulary of field types recorded in a payload's schema.
///
/// Names follow the Kafka Connect schema types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Boolean,
    Unsupported,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int8 => "int8",
            FieldType::Int16 => "int16",
            FieldType::Int32 => "int32",
            FieldType::Int64 => "int64",
            FieldType::Float32 => "float32",
            FieldType::Float64 => "float64",
            FieldType::Boolean => "boolean",
            FieldType::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of `schema.fields` inside a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub field: String,
    pub optional: bool,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl SchemaField {
    /// Descriptor for a field discovered by `Payload::set`. Always optional.
    pub fn discovered(field: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            field: field.into(),
            optional: true,
            field_type,
        }
    }
}

/// Typed value written into a payload.
///
/// The variant decides the inferred schema type; anything that is not one
/// of the scalar kinds goes through `Other` and is recorded as `unsupported`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Boolean(bool),
    Other(serde_json::Value),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::String(_) => FieldType::String,
            FieldValue::Int8(_) => FieldType::Int8,
            FieldValue::Int16(_) => FieldType::Int16,
            FieldValue::Int32(_) => FieldType::Int32,
            FieldValue::Int64(_) => FieldType::Int64,
            FieldValue::Float32(_) => FieldType::Float32,
            FieldValue::Float64(_) => FieldType::Float64,
            FieldValue::Boolean(_) => FieldType::Boolean,
            FieldValue::Other(_) => FieldType::Unsupported,
        }
    }

    /// JSON representation. `None` for NaN and infinities, which JSON cannot hold.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        use serde_json::Value;
        let value = match self {
            FieldValue::String(s) => Value::String(s.clone()),
            FieldValue::Int8(v) => Value::from(*v),
            FieldValue::Int16(v) => Value::from(*v),
            FieldValue::Int32(v) => Value::from(*v),
            FieldValue::Int64(v) => Value::from(*v),
            FieldValue::Float32(v) => Value::Number(serde_json::Number::from_f64(f64::from(*v))?),
            FieldValue::Float64(v) => Value::Number(serde_json::Number::from_f64(*v)?),
            FieldValue::Boolean(v) => Value::Bool(*v),
            FieldValue::Other(v) => v.clone(),
        };
        Some(value)
    }
}

macro_rules! field_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(v: $ty) -> Self {
                    FieldValue::$variant(v)
                }
            }
        )*
    };
}

field_value_from!(
    String => String,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f32 => Float32,
    f64 => Float64,
    bool => Boolean,
    serde_json::Value => Other,
);

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_owned())
    }
}
