//! Document store collaborator.
//!
//! Collections of JSON documents keyed by a store-generated id. Writes may
//! carry the [`server_timestamp`] sentinel, which the store replaces with its
//! own clock reading at write time.

pub mod error;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub use error::StoreError;
pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;

/// Stored document body
pub type Fields = Map<String, Value>;

/// Field values accepted on write
#[derive(Debug, Clone, PartialEq)]
pub enum WriteValue {
    Value(Value),
    ServerTimestamp,
}

impl From<Value> for WriteValue {
    fn from(value: Value) -> Self {
        WriteValue::Value(value)
    }
}

impl From<String> for WriteValue {
    fn from(value: String) -> Self {
        WriteValue::Value(Value::String(value))
    }
}

impl From<&str> for WriteValue {
    fn from(value: &str) -> Self {
        WriteValue::Value(Value::String(value.to_string()))
    }
}

/// Fields of a write, in key order
pub type WriteFields = BTreeMap<String, WriteValue>;

/// Sentinel resolved to the store's current time when the write lands
pub fn server_timestamp() -> WriteValue {
    WriteValue::ServerTimestamp
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Direction::Ascending => "ASC",
            Direction::Descending => "DESC",
        }
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document and return its generated id
    async fn insert(&self, collection: &str, fields: WriteFields) -> Result<String, StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// All documents of a collection ordered by one field
    async fn list_ordered(
        &self,
        collection: &str,
        sort_field: &str,
        direction: Direction,
    ) -> Result<Vec<Document>, StoreError>;

    /// Shallow-merge fields into an existing document. `NotFound` if it is gone.
    async fn merge(&self, collection: &str, id: &str, fields: WriteFields) -> Result<(), StoreError>;

    /// Permanently remove a document. `NotFound` if it is gone.
    async fn remove(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Connectivity probe for health checks
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Wire format for stored timestamps. Fixed width, so lexical order is time order.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Replace sentinels with `now`
pub(crate) fn resolve(fields: WriteFields, now: DateTime<Utc>) -> Fields {
    let stamp = format_timestamp(now);
    fields
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                WriteValue::Value(v) => v,
                WriteValue::ServerTimestamp => Value::String(stamp.clone()),
            };
            (key, value)
        })
        .collect()
}

/// Literal fields plus the keys whose value the store stamps itself
pub(crate) fn split_sentinels(fields: WriteFields) -> (Fields, Vec<String>) {
    let mut literal = Fields::new();
    let mut stamped = Vec::new();
    for (key, value) in fields {
        match value {
            WriteValue::Value(v) => {
                literal.insert(key, v);
            }
            WriteValue::ServerTimestamp => stamped.push(key),
        }
    }
    (literal, stamped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn resolves_sentinels_to_the_same_instant() {
        let now = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let mut fields = WriteFields::new();
        fields.insert("title".into(), "hello".into());
        fields.insert("created_at".into(), server_timestamp());
        fields.insert("updated_at".into(), server_timestamp());

        let resolved = resolve(fields, now);
        assert_eq!(resolved["title"], json!("hello"));
        assert_eq!(resolved["created_at"], json!("2025-01-02T03:04:05.000000Z"));
        assert_eq!(resolved["created_at"], resolved["updated_at"]);
        assert_eq!(parse_timestamp(&resolved["created_at"]), Some(now));
    }

    #[test]
    fn timestamp_strings_sort_chronologically() {
        let a = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap();
        let b = a + chrono::Duration::microseconds(1);
        assert!(format_timestamp(a) < format_timestamp(b));
    }

    #[test]
    fn parse_rejects_non_strings() {
        assert_eq!(parse_timestamp(&json!(12)), None);
        assert_eq!(parse_timestamp(&json!("yesterday")), None);
    }

    #[test]
    fn split_separates_sentinel_keys() {
        let mut fields = WriteFields::new();
        fields.insert("title".into(), "hello".into());
        fields.insert("created_at".into(), server_timestamp());
        fields.insert("updated_at".into(), server_timestamp());

        let (literal, stamped) = split_sentinels(fields);
        assert_eq!(Value::Object(literal), json!({ "title": "hello" }));
        assert_eq!(stamped, vec!["created_at".to_string(), "updated_at".to_string()]);
    }
}
