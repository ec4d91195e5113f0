use std::collections::BTreeMap;
use time::OffsetDateTime;

/// A live value as held by a structured-record database in the target context.
///
/// This is the shape records have *before* normalization on capture and
/// *after* denormalization on restore. Binary payloads only ever exist on the
/// capture side; once elided they come back as [`RuntimeValue::Placeholder`].
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Date(OffsetDateTime),
    /// Raw byte buffer
    Bytes(Vec<u8>),
    /// Typed view over a byte buffer (element type name, raw bytes)
    ByteView { element: String, bytes: Vec<u8> },
    /// Opaque blob-like object; only metadata is visible
    Blob { mime_type: String, size: u64 },
    Array(Vec<RuntimeValue>),
    Object(BTreeMap<String, RuntimeValue>),
    /// Marker left behind where data was elided during capture
    Placeholder(String),
}

impl RuntimeValue {
    /// Build an object from `(key, value)` pairs.
    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, RuntimeValue)>) -> Self {
        RuntimeValue::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn is_binary(&self) -> bool {
        matches!(
            self,
            RuntimeValue::Bytes(_) | RuntimeValue::ByteView { .. } | RuntimeValue::Blob { .. }
        )
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, RuntimeValue::Placeholder(_))
    }
}

impl From<&str> for RuntimeValue {
    fn from(value: &str) -> Self {
        RuntimeValue::String(value.to_string())
    }
}

impl From<String> for RuntimeValue {
    fn from(value: String) -> Self {
        RuntimeValue::String(value)
    }
}

impl From<f64> for RuntimeValue {
    fn from(value: f64) -> Self {
        RuntimeValue::Number(value)
    }
}

impl From<i64> for RuntimeValue {
    fn from(value: i64) -> Self {
        RuntimeValue::Number(value as f64)
    }
}

impl From<bool> for RuntimeValue {
    fn from(value: bool) -> Self {
        RuntimeValue::Bool(value)
    }
}

impl From<OffsetDateTime> for RuntimeValue {
    fn from(value: OffsetDateTime) -> Self {
        RuntimeValue::Date(value)
    }
}

impl From<serde_json::Value> for RuntimeValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => RuntimeValue::Null,
            Value::Bool(b) => RuntimeValue::Bool(b),
            Value::Number(n) => RuntimeValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => RuntimeValue::String(s),
            Value::Array(items) => RuntimeValue::Array(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => {
                RuntimeValue::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}
