use crate::config::DEFAULT_MAX_NORMALIZE_DEPTH;
use crate::value::normalized::{ElisionReason, NormalizedValue, Scalar};
use crate::value::runtime::RuntimeValue;
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

/// Converts runtime values to their persisted form and back.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    max_depth: usize,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_NORMALIZE_DEPTH)
    }
}

impl Normalizer {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn normalize(&self, value: &RuntimeValue) -> NormalizedValue {
        self.normalize_at(value, 0)
    }

    /// Normalize `value` as if it sat `depth` levels below a record root.
    ///
    /// Anything deeper than `max_depth` is elided; nulls are kept at every depth.
    pub fn normalize_at(&self, value: &RuntimeValue, depth: usize) -> NormalizedValue {
        if matches!(value, RuntimeValue::Null) {
            return NormalizedValue::null();
        }
        if depth > self.max_depth {
            return NormalizedValue::Elided(ElisionReason::MaxDepth);
        }

        match value {
            RuntimeValue::Null => NormalizedValue::null(),
            RuntimeValue::Bool(b) => NormalizedValue::Scalar(Scalar::Bool(*b)),
            RuntimeValue::Number(n) if n.is_finite() => NormalizedValue::number(*n),
            RuntimeValue::Number(_) => NormalizedValue::Elided(ElisionReason::NonFinite),
            RuntimeValue::String(s) => NormalizedValue::string(s.clone()),
            RuntimeValue::Date(d) => NormalizedValue::TaggedDate(format_date(*d)),
            RuntimeValue::Bytes(_) | RuntimeValue::ByteView { .. } | RuntimeValue::Blob { .. } => {
                NormalizedValue::Elided(ElisionReason::Binary)
            }
            RuntimeValue::Placeholder(reason) => {
                NormalizedValue::Elided(ElisionReason::parse(reason))
            }
            RuntimeValue::Array(items) => NormalizedValue::Sequence(
                items
                    .iter()
                    .map(|item| self.normalize_at(item, depth + 1))
                    .collect(),
            ),
            RuntimeValue::Object(fields) => NormalizedValue::Record(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), self.normalize_at(v, depth + 1)))
                    .collect(),
            ),
        }
    }

    /// Inverse of [`normalize`](Self::normalize) for every tag except `Elided`.
    pub fn denormalize(&self, value: &NormalizedValue) -> RuntimeValue {
        denormalize(value)
    }
}

/// Normalize with the default depth limit.
pub fn normalize(value: &RuntimeValue) -> NormalizedValue {
    Normalizer::default().normalize(value)
}

/// Reconstruct a runtime value. `Elided` becomes a visible [`RuntimeValue::Placeholder`].
pub fn denormalize(value: &NormalizedValue) -> RuntimeValue {
    match value {
        NormalizedValue::Scalar(Scalar::Null) => RuntimeValue::Null,
        NormalizedValue::Scalar(Scalar::Bool(b)) => RuntimeValue::Bool(*b),
        NormalizedValue::Scalar(Scalar::Number(n)) => RuntimeValue::Number(*n),
        NormalizedValue::Scalar(Scalar::String(s)) => RuntimeValue::String(s.clone()),
        NormalizedValue::TaggedDate(iso) => match OffsetDateTime::parse(iso, &Rfc3339) {
            Ok(date) => RuntimeValue::Date(date),
            Err(_) => {
                tracing::debug!(value = %iso, "unparseable tagged date, keeping string");
                RuntimeValue::String(iso.clone())
            }
        },
        NormalizedValue::Elided(reason) => RuntimeValue::Placeholder(reason.as_str().to_string()),
        NormalizedValue::Sequence(items) => RuntimeValue::Array(items.iter().map(denormalize).collect()),
        NormalizedValue::Record(fields) => RuntimeValue::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), denormalize(v)))
                .collect(),
        ),
    }
}

fn format_date(date: OffsetDateTime) -> String {
    // Rfc3339 only fails for years outside 0..=9999; keep those as unix seconds.
    let utc = date.to_offset(UtcOffset::UTC);
    utc.format(&Rfc3339)
        .unwrap_or_else(|_| utc.unix_timestamp().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use time::macros::datetime;

    #[test]
    fn test_scalars_pass_through() {
        assert_eq!(normalize(&RuntimeValue::Bool(true)), NormalizedValue::Scalar(Scalar::Bool(true)));
        assert_eq!(normalize(&RuntimeValue::Number(1.5)), NormalizedValue::number(1.5));
        assert_eq!(normalize(&"x".into()), NormalizedValue::string("x"));
    }

    #[test]
    fn test_date_is_tagged_in_utc() {
        let date = datetime!(2024-03-01 12:00:00 +02:00);
        let normalized = normalize(&RuntimeValue::Date(date));
        assert_eq!(normalized, NormalizedValue::TaggedDate("2024-03-01T10:00:00Z".into()));
        assert_eq!(denormalize(&normalized), RuntimeValue::Date(date));
    }

    #[test]
    fn test_binary_field_is_replaced_not_dropped() {
        let value = RuntimeValue::object([
            ("name", RuntimeValue::from("avatar")),
            ("data", RuntimeValue::Bytes(vec![1, 2, 3])),
        ]);
        let normalized = normalize(&value);

        let mut expected = BTreeMap::new();
        expected.insert("name".to_string(), NormalizedValue::string("avatar"));
        expected.insert("data".to_string(), NormalizedValue::Elided(ElisionReason::Binary));
        assert_eq!(normalized, NormalizedValue::Record(expected));
    }

    #[test]
    fn test_non_finite_number_is_elided() {
        assert_eq!(
            normalize(&RuntimeValue::Number(f64::NAN)),
            NormalizedValue::Elided(ElisionReason::NonFinite)
        );
    }

    #[test]
    fn test_null_survives_past_depth_limit() {
        let normalizer = Normalizer::new(0);
        assert_eq!(normalizer.normalize_at(&RuntimeValue::Null, 5), NormalizedValue::null());
        assert_eq!(
            normalizer.normalize_at(&RuntimeValue::Bool(false), 1),
            NormalizedValue::Elided(ElisionReason::MaxDepth)
        );
    }

    #[test]
    fn test_elided_denormalizes_to_placeholder() {
        let restored = denormalize(&NormalizedValue::Elided(ElisionReason::Binary));
        assert_eq!(restored, RuntimeValue::Placeholder("binary".into()));
    }
}
