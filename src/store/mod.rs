use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::Result;

pub mod memory;

pub use memory::MemoryStore;

/// Schemaless document fields, keyed by wire name.
pub type Fields = Map<String, Value>;

/// One stored document: store-assigned id plus its field map.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// String field, `None` when absent or not a string.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// String field with the store's lenient default (empty string).
    pub fn string_or_empty(&self, key: &str) -> String {
        self.str_field(key).unwrap_or_default().to_string()
    }

    /// Integer field; accepts JSON numbers only, not numeric strings.
    pub fn i64_field(&self, key: &str) -> Option<i64> {
        self.fields.get(key).and_then(Value::as_i64)
    }

    /// Boolean field, defaulting to false when absent.
    pub fn bool_field(&self, key: &str) -> bool {
        self.fields
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Timestamp field stored as an RFC 3339 string.
    pub fn instant_field(&self, key: &str) -> Option<DateTime<Utc>> {
        self.fields.get(key).and_then(value_to_instant)
    }
}

/// Encode an instant into its stored wire form.
pub fn instant_to_value(instant: DateTime<Utc>) -> Value {
    Value::String(instant.to_rfc3339())
}

/// Decode a stored instant; `None` for non-timestamp values.
pub fn value_to_instant(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Query predicates supported by the store seam.
#[derive(Debug, Clone)]
pub enum FieldFilter {
    Eq(String, Value),
    Gte(String, Value),
    Lt(String, Value),
}

impl FieldFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(field.into(), value.into())
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Gte(field.into(), value.into())
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Lt(field.into(), value.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Result ordering for a query.
#[derive(Debug, Clone)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
        }
    }
}

/// Abstract document store the engine runs against.
///
/// Matches the behavior of a document database: schemaless collections,
/// server-assigned ids on create, merge semantics on update. Implementations
/// must be safe to share behind an `Arc`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch documents matching every filter, optionally ordered.
    async fn query(
        &self,
        collection: &str,
        filters: &[FieldFilter],
        order_by: Option<&OrderBy>,
    ) -> Result<Vec<Document>>;

    /// Fetch a single document, `None` when absent.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Create a document, returning its assigned id.
    async fn create(&self, collection: &str, fields: Fields) -> Result<String>;

    /// Merge fields into an existing document; absent documents are an error.
    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<()>;
}
