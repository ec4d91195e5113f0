use crate::base::{SnapError, SnapResult};
use crate::context::domain_of;
use crate::cookies::CookieRecord;
use crate::database::DatabaseSet;
use crate::storage::{KeyValueMap, StoreScope};
use crate::value::NormalizedValue;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use url::Url;
use uuid::Uuid;

/// Field names written by older exports.
const LEGACY_FIELDS: [&str; 3] = ["localStorage", "sessionStorage", "indexedDB"];

/// A captured copy of one origin's client-side state.
///
/// This is also the import/export file format. Files written by older tools
/// that use `localStorage`, `sessionStorage`, `indexedDB` and `timestamp`
/// are read through field aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRecord {
    #[serde(default)]
    pub id: String,
    pub name: String,
    /// Host (and port) of `url`, fixed at capture
    pub domain: String,
    #[serde(default)]
    pub url: String,
    #[serde(default = "OffsetDateTime::now_utc", alias = "timestamp", with = "created_at")]
    pub created_at: OffsetDateTime,
    pub cookies: Vec<CookieRecord>,
    #[serde(default, alias = "localStorage", deserialize_with = "null_as_default")]
    pub key_value_store_a: KeyValueMap,
    #[serde(default, alias = "sessionStorage", deserialize_with = "null_as_default")]
    pub key_value_store_b: KeyValueMap,
    #[serde(default, alias = "indexedDB", deserialize_with = "null_as_default")]
    pub embedded_databases: DatabaseSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<SnapshotSummary>,
    /// Cookie partition the snapshot was captured from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_store_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    pub cookie_count: usize,
    pub key_value_store_a_count: usize,
    pub key_value_store_b_count: usize,
    pub embedded_database_count: usize,
}

impl SnapshotRecord {
    /// An empty snapshot of `url` with a fresh id and the current time.
    pub fn new(name: impl Into<String>, url: &Url) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            domain: domain_of(url),
            url: url.to_string(),
            created_at: OffsetDateTime::now_utc(),
            cookies: Vec::new(),
            key_value_store_a: KeyValueMap::new(),
            key_value_store_b: KeyValueMap::new(),
            embedded_databases: DatabaseSet::new(),
            summary: None,
            cookie_store_id: None,
        }
    }

    pub fn store(&self, scope: StoreScope) -> &KeyValueMap {
        match scope {
            StoreScope::Local => &self.key_value_store_a,
            StoreScope::Session => &self.key_value_store_b,
        }
    }

    pub fn store_mut(&mut self, scope: StoreScope) -> &mut KeyValueMap {
        match scope {
            StoreScope::Local => &mut self.key_value_store_a,
            StoreScope::Session => &mut self.key_value_store_b,
        }
    }

    pub fn compute_summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            cookie_count: self.cookies.len(),
            key_value_store_a_count: self.key_value_store_a.len(),
            key_value_store_b_count: self.key_value_store_b.len(),
            embedded_database_count: self.embedded_databases.len(),
        }
    }

    /// Recompute the stored summary from the current contents.
    pub fn refresh_summary(&mut self) {
        self.summary = Some(self.compute_summary());
    }

    pub fn key_value_item_count(&self) -> usize {
        self.key_value_store_a.len() + self.key_value_store_b.len()
    }

    pub fn to_json_bytes(&self) -> SnapResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn to_json_pretty(&self) -> SnapResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Serialized size as stored in a catalog.
    pub fn byte_size(&self) -> SnapResult<usize> {
        Ok(self.to_json_bytes()?.len())
    }

    /// Decode a record previously written by [`to_json_bytes`](Self::to_json_bytes).
    ///
    /// Files using the older field names also get their placeholder strings
    /// turned back into elided values.
    pub fn from_json_slice(bytes: &[u8]) -> SnapResult<Self> {
        let malformed = |e: serde_json::Error| {
            SnapError::invalid_snapshot(format!("malformed snapshot: {e}"))
        };
        let raw: Value = serde_json::from_slice(bytes).map_err(malformed)?;
        let legacy = raw
            .as_object()
            .is_some_and(|fields| LEGACY_FIELDS.iter().any(|f| fields.contains_key(*f)));

        let mut record: Self = serde_json::from_value(raw).map_err(malformed)?;
        if legacy {
            record.upgrade_legacy_placeholders();
        }
        Ok(record)
    }

    fn upgrade_legacy_placeholders(&mut self) {
        for collections in self.embedded_databases.values_mut() {
            for records in collections.values_mut() {
                for value in records.iter_mut() {
                    *value = std::mem::replace(value, NormalizedValue::null())
                        .upgrade_legacy_placeholders();
                }
            }
        }
    }

    /// Parse an externally produced snapshot file.
    ///
    /// `name`, `domain` and `cookies` are required. The record gets a fresh id
    /// so imports never overwrite an existing snapshot; cookies are normalized
    /// and the summary is recomputed.
    pub fn parse_import(bytes: &[u8]) -> SnapResult<Self> {
        let mut record = Self::from_json_slice(bytes)?;
        if record.name.trim().is_empty() {
            return Err(SnapError::invalid_snapshot("snapshot has no name"));
        }
        if record.domain.trim().is_empty() {
            return Err(SnapError::invalid_snapshot("snapshot has no domain"));
        }

        record.id = Uuid::new_v4().to_string();
        record.cookies = record
            .cookies
            .into_iter()
            .map(CookieRecord::normalized)
            .collect();
        record.refresh_summary();
        Ok(record)
    }

    /// Suggested export file name, `session_<name>_<id>.json`.
    ///
    /// Characters outside `[A-Za-z0-9_-]` in the name become `_`.
    pub fn export_file_name(&self) -> String {
        let name: String = self
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        format!("session_{}_{}.json", name, self.id)
    }

    /// URL to navigate to when restoring onto the original origin.
    ///
    /// Local hosts are addressed over `http`, everything else over `https`.
    pub fn original_url(&self) -> SnapResult<Url> {
        let host = self.domain.split(':').next().unwrap_or("");
        let scheme = if host == "localhost" || host == "127.0.0.1" {
            "http"
        } else {
            "https"
        };
        Url::parse(&format!("{scheme}://{}", self.domain)).map_err(|e| {
            SnapError::invalid_snapshot(format!("snapshot domain {} is not navigable: {e}", self.domain))
        })
    }
}

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// RFC 3339 on output; RFC 3339 or epoch milliseconds on input.
mod created_at {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use time::format_description::well_known::Rfc3339;
    use time::OffsetDateTime;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(t: &OffsetDateTime, s: S) -> Result<S::Ok, S::Error> {
        let text = t.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
        s.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<OffsetDateTime, D::Error> {
        match Raw::deserialize(d)? {
            Raw::Millis(ms) => OffsetDateTime::from_unix_timestamp_nanos((ms * 1_000_000.0) as i128)
                .map_err(de::Error::custom),
            Raw::Text(text) => OffsetDateTime::parse(&text, &Rfc3339).map_err(de::Error::custom),
        }
    }
}
