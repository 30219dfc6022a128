//! Records of the local JSON store file.
//!
//! The file is a JSON array rewritten wholesale on every write. Readers are
//! lenient: records that fail to parse are skipped when reading, but kept
//! verbatim when the file is rewritten. Fields this crate does not know
//! about survive a read-modify-write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capital: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "text_or_number"
    )]
    pub population: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub politics: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub economics: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StoreRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            summary: None,
            capital: None,
            population: None,
            politics: None,
            economics: None,
            created_at: None,
            updated_at: None,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    Json(String),
    NotAnArray,
    Io(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Json(msg) => write!(f, "store is not valid JSON: {msg}"),
            StoreError::NotAnArray => write!(f, "store must be a JSON array of records"),
            StoreError::Io(msg) => write!(f, "store I/O error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Updated,
}

/// The store file as a whole.
///
/// Items that do not parse as records are kept verbatim, so rewriting the
/// file after an upsert never drops them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreDocument {
    items: Vec<Value>,
}

impl StoreDocument {
    /// Blank text is an empty store.
    pub fn parse(text: &str) -> Result<Self, StoreError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let value: Value =
            serde_json::from_str(text).map_err(|e| StoreError::Json(e.to_string()))?;
        let Value::Array(items) = value else {
            return Err(StoreError::NotAnArray);
        };
        Ok(Self { items })
    }

    /// Items that parse as records; the rest are skipped.
    pub fn records(&self) -> Vec<StoreRecord> {
        let records: Vec<StoreRecord> = self
            .items
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect();
        if records.len() != self.items.len() {
            debug!(
                skipped = self.items.len() - records.len(),
                "ignored malformed store records"
            );
        }
        records
    }

    /// Inserts or updates the record for `name`.
    ///
    /// `updatedAt` is always set to `now`; a new record also gets `createdAt`
    /// equal to it. A `None` summary leaves an existing summary untouched.
    /// An existing item that is not a valid record is patched in place and
    /// its other fields are left as they are.
    pub fn upsert(
        &mut self,
        name: &str,
        summary: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Upsert, StoreError> {
        let found = self
            .items
            .iter()
            .position(|item| item.get("name").and_then(Value::as_str) == Some(name));
        let Some(index) = found else {
            let mut record = StoreRecord::new(name);
            record.summary = summary;
            record.created_at = Some(now);
            record.updated_at = Some(now);
            self.items.push(to_value(&record)?);
            return Ok(Upsert::Inserted);
        };

        let item = &mut self.items[index];
        match serde_json::from_value::<StoreRecord>(item.clone()) {
            Ok(mut record) => {
                if summary.is_some() {
                    record.summary = summary;
                }
                record.updated_at = Some(now);
                record.created_at.get_or_insert(now);
                *item = to_value(&record)?;
            }
            Err(_) => {
                let stamp = to_value(&now)?;
                if let Value::Object(fields) = item {
                    if let Some(summary) = summary {
                        fields.insert("summary".to_string(), Value::String(summary));
                    }
                    fields.insert("updatedAt".to_string(), stamp.clone());
                    fields.entry("createdAt").or_insert(stamp);
                }
            }
        }
        Ok(Upsert::Updated)
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        serde_json::to_string_pretty(&self.items).map_err(|e| StoreError::Json(e.to_string()))
    }
}

/// Parses the store document leniently into its valid records.
pub fn parse_store(text: &str) -> Result<Vec<StoreRecord>, StoreError> {
    StoreDocument::parse(text).map(|doc| doc.records())
}

pub fn find_record<'a>(records: &'a [StoreRecord], name: &str) -> Option<&'a StoreRecord> {
    records.iter().find(|r| r.name == name)
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::Json(e.to_string()))
}

fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
