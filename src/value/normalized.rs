//! JSON-safe tagged form of captured database records.
//!
//! Wire encoding:
//!
//! | Variant | JSON |
//! |---------|------|
//! | `Scalar` | `null`, `true`, `1.5`, `"text"` |
//! | `TaggedDate` | `{"__type": "Date", "value": "2024-01-01T00:00:00Z"}` |
//! | `Elided` | `{"__type": "Elided", "reason": "binary"}` |
//! | `Sequence` | `[...]` |
//! | `Record` | `{...}` |
//! | `Record` with a `__type` key | `{"__type": "Record", "value": {...}}` |
//!
//! Older exports wrote elided data as bare placeholder strings
//! (`"[Blob - skipped]"`, `"[Max depth reached]"`, ...). Decoding keeps those
//! as strings; [`NormalizedValue::upgrade_legacy_placeholders`] turns them
//! into `Elided` for files known to come from such exports.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fmt;

const TYPE_TAG: &str = "__type";
const DATE_TAG: &str = "Date";
const ELIDED_TAG: &str = "Elided";
const RECORD_TAG: &str = "Record";

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

/// Why a value was not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElisionReason {
    Binary,
    MaxDepth,
    NonFinite,
    Other(String),
}

impl ElisionReason {
    pub fn as_str(&self) -> &str {
        match self {
            ElisionReason::Binary => "binary",
            ElisionReason::MaxDepth => "max-depth",
            ElisionReason::NonFinite => "non-finite",
            ElisionReason::Other(reason) => reason,
        }
    }

    pub fn parse(reason: &str) -> Self {
        match reason {
            "binary" => ElisionReason::Binary,
            "max-depth" => ElisionReason::MaxDepth,
            "non-finite" => ElisionReason::NonFinite,
            other => ElisionReason::Other(other.to_string()),
        }
    }

    fn from_legacy_placeholder(s: &str) -> Option<Self> {
        match s {
            "[Max depth reached]" => Some(ElisionReason::MaxDepth),
            "[ArrayBuffer - skipped]" | "[Binary data - skipped]" | "[Blob - skipped]" => {
                Some(ElisionReason::Binary)
            }
            _ => None,
        }
    }
}

impl fmt::Display for ElisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "Value", from = "Value")]
pub enum NormalizedValue {
    Scalar(Scalar),
    /// ISO-8601 / RFC 3339 timestamp
    TaggedDate(String),
    Elided(ElisionReason),
    Sequence(Vec<NormalizedValue>),
    Record(BTreeMap<String, NormalizedValue>),
}

impl NormalizedValue {
    pub fn null() -> Self {
        NormalizedValue::Scalar(Scalar::Null)
    }

    pub fn string(s: impl Into<String>) -> Self {
        NormalizedValue::Scalar(Scalar::String(s.into()))
    }

    pub fn number(n: f64) -> Self {
        NormalizedValue::Scalar(Scalar::Number(n))
    }

    pub fn is_elided(&self) -> bool {
        matches!(self, NormalizedValue::Elided(_))
    }

    /// Number of `Elided` nodes anywhere in this value.
    pub fn elided_count(&self) -> usize {
        match self {
            NormalizedValue::Elided(_) => 1,
            NormalizedValue::Sequence(items) => items.iter().map(Self::elided_count).sum(),
            NormalizedValue::Record(fields) => fields.values().map(Self::elided_count).sum(),
            _ => 0,
        }
    }

    /// Rewrite the bare placeholder strings older exports used for elided data.
    pub fn upgrade_legacy_placeholders(self) -> Self {
        match self {
            NormalizedValue::Scalar(Scalar::String(s)) => {
                match ElisionReason::from_legacy_placeholder(&s) {
                    Some(reason) => NormalizedValue::Elided(reason),
                    None => NormalizedValue::Scalar(Scalar::String(s)),
                }
            }
            NormalizedValue::Sequence(items) => NormalizedValue::Sequence(
                items
                    .into_iter()
                    .map(Self::upgrade_legacy_placeholders)
                    .collect(),
            ),
            NormalizedValue::Record(fields) => NormalizedValue::Record(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, v.upgrade_legacy_placeholders()))
                    .collect(),
            ),
            other => other,
        }
    }
}

fn tagged(tag: &str, key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(TYPE_TAG.into(), Value::String(tag.into()));
    map.insert(key.into(), value);
    Value::Object(map)
}

impl From<NormalizedValue> for Value {
    fn from(value: NormalizedValue) -> Self {
        match value {
            NormalizedValue::Scalar(Scalar::Null) => Value::Null,
            NormalizedValue::Scalar(Scalar::Bool(b)) => Value::Bool(b),
            // Non-finite numbers never reach here from the normalizer; fall back to null.
            NormalizedValue::Scalar(Scalar::Number(n)) => {
                Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
            }
            NormalizedValue::Scalar(Scalar::String(s)) => Value::String(s),
            NormalizedValue::TaggedDate(iso) => tagged(DATE_TAG, "value", Value::String(iso)),
            NormalizedValue::Elided(reason) => {
                tagged(ELIDED_TAG, "reason", Value::String(reason.as_str().to_string()))
            }
            NormalizedValue::Sequence(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            NormalizedValue::Record(fields) => {
                // A user key named `__type` would collide with the tags.
                let escape = fields.contains_key(TYPE_TAG);
                let object =
                    Value::Object(fields.into_iter().map(|(k, v)| (k, Value::from(v))).collect());
                if escape {
                    tagged(RECORD_TAG, "value", object)
                } else {
                    object
                }
            }
        }
    }
}

impl From<Value> for NormalizedValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => NormalizedValue::null(),
            Value::Bool(b) => NormalizedValue::Scalar(Scalar::Bool(b)),
            Value::Number(n) => match n.as_f64() {
                Some(f) => NormalizedValue::number(f),
                None => NormalizedValue::Elided(ElisionReason::NonFinite),
            },
            Value::String(s) => NormalizedValue::Scalar(Scalar::String(s)),
            Value::Array(items) => {
                NormalizedValue::Sequence(items.into_iter().map(NormalizedValue::from).collect())
            }
            Value::Object(map) => decode_object(map),
        }
    }
}

fn decode_object(mut map: Map<String, Value>) -> NormalizedValue {
    if map.len() == 2 {
        let tag = map.get(TYPE_TAG).and_then(Value::as_str).map(str::to_owned);
        match tag.as_deref() {
            Some(DATE_TAG) => {
                if let Some(Value::String(iso)) = map.remove("value") {
                    return NormalizedValue::TaggedDate(iso);
                }
            }
            Some(ELIDED_TAG) => {
                if let Some(Value::String(reason)) = map.remove("reason") {
                    return NormalizedValue::Elided(ElisionReason::parse(&reason));
                }
            }
            Some(RECORD_TAG) => {
                if let Some(Value::Object(fields)) = map.remove("value") {
                    return decode_fields(fields);
                }
            }
            _ => {}
        }
    }

    decode_fields(map)
}

fn decode_fields(map: Map<String, Value>) -> NormalizedValue {
    NormalizedValue::Record(
        map.into_iter()
            .map(|(k, v)| (k, NormalizedValue::from(v)))
            .collect(),
    )
}
