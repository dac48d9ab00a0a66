use async_trait::async_trait;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{resolve, Direction, Document, DocumentStore, Fields, StoreError, WriteFields};

#[derive(Default)]
struct Inner {
    collections: HashMap<String, HashMap<String, Stored>>,
    next_seq: u64,
    last_stamp: Option<DateTime<Utc>>,
}

struct Stored {
    seq: u64,
    fields: Fields,
}

impl Inner {
    /// Server clock that never repeats or runs backwards at stored precision
    fn stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now().trunc_subsecs(6);
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }
}

/// In-process document store used by tests and by the server when no
/// DATABASE_URL is configured. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held in a collection
    pub async fn len(&self, collection: &str) -> usize {
        let inner = self.inner.read().await;
        inner.collections.get(collection).map_or(0, HashMap::len)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert(&self, collection: &str, fields: WriteFields) -> Result<String, StoreError> {
        let mut inner = self.inner.write().await;
        let now = inner.stamp();
        let seq = inner.next_seq;
        inner.next_seq += 1;

        let id = Uuid::new_v4().to_string();
        let stored = Stored {
            seq,
            fields: resolve(fields, now),
        };
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), stored);

        tracing::debug!("memory store: inserted {}/{}", collection, id);
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|stored| Document {
                id: id.to_string(),
                fields: stored.fields.clone(),
            }))
    }

    async fn list_ordered(
        &self,
        collection: &str,
        sort_field: &str,
        direction: Direction,
    ) -> Result<Vec<Document>, StoreError> {
        let inner = self.inner.read().await;
        let Some(docs) = inner.collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut rows: Vec<(&String, &Stored)> = docs.iter().collect();
        rows.sort_by(|(_, a), (_, b)| {
            let ordering = compare_values(a.fields.get(sort_field), b.fields.get(sort_field))
                .then(a.seq.cmp(&b.seq));
            match direction {
                Direction::Ascending => ordering,
                Direction::Descending => ordering.reverse(),
            }
        });

        Ok(rows
            .into_iter()
            .map(|(id, stored)| Document {
                id: id.clone(),
                fields: stored.fields.clone(),
            })
            .collect())
    }

    async fn merge(&self, collection: &str, id: &str, fields: WriteFields) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let now = inner.stamp();
        let stored = inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::not_found(collection, id))?;

        for (key, value) in resolve(fields, now) {
            stored.fields.insert(key, value);
        }
        Ok(())
    }

    async fn remove(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(collection, id))
    }
}

/// Missing values sort first; mismatched types fall back to their JSON text
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}
