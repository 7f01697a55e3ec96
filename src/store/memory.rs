use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use super::{value_to_instant, Direction, Document, DocumentStore, FieldFilter, Fields, OrderBy};
use crate::error::{Result, TrackerError};

/// In-memory document store.
///
/// Backs the test suites and lets embedders run the engine without a real
/// backend. Documents keep insertion order per collection so unordered
/// queries are deterministic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a whole collection in insertion order.
    pub fn all(&self, collection: &str) -> Result<Vec<Document>> {
        let collections = self.lock()?;
        Ok(collections.get(collection).cloned().unwrap_or_default())
    }

    /// Number of documents in a collection.
    pub fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.lock()?;
        Ok(collections.get(collection).map_or(0, Vec::len))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<Document>>>> {
        self.collections
            .lock()
            .map_err(|e| TrackerError::store(format!("memory store lock poisoned: {e}")))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn query(
        &self,
        collection: &str,
        filters: &[FieldFilter],
        order_by: Option<&OrderBy>,
    ) -> Result<Vec<Document>> {
        let collections = self.lock()?;
        let mut matched: Vec<Document> = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| filters.iter().all(|f| matches_filter(doc, f)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        drop(collections);

        if let Some(order) = order_by {
            matched.sort_by(|a, b| {
                let ordering = compare_fields(a, b, &order.field);
                match order.direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            });
        }
        Ok(matched)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let collections = self.lock()?;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned())
    }

    async fn create(&self, collection: &str, fields: Fields) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let mut collections = self.lock()?;
        collections
            .entry(collection.to_string())
            .or_default()
            .push(Document::new(id.clone(), fields));
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<()> {
        let mut collections = self.lock()?;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
            .ok_or_else(|| {
                TrackerError::store(format!("no document '{id}' in '{collection}' to update"))
            })?;
        for (key, value) in fields {
            doc.fields.insert(key, value);
        }
        Ok(())
    }
}

fn matches_filter(doc: &Document, filter: &FieldFilter) -> bool {
    match filter {
        FieldFilter::Eq(field, expected) => doc.fields.get(field) == Some(expected),
        FieldFilter::Gte(field, bound) => match doc.fields.get(field) {
            Some(value) => compare_values(value, bound) != Ordering::Less,
            None => false,
        },
        FieldFilter::Lt(field, bound) => match doc.fields.get(field) {
            Some(value) => compare_values(value, bound) == Ordering::Less,
            None => false,
        },
    }
}

fn compare_fields(a: &Document, b: &Document, field: &str) -> Ordering {
    match (a.fields.get(field), b.fields.get(field)) {
        (Some(left), Some(right)) => compare_values(left, right),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

/// Order two field values: instants chronologically, numbers numerically,
/// strings lexicographically. Mixed types fall back to a stable type rank.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    if let (Some(left), Some(right)) = (value_to_instant(a), value_to_instant(b)) {
        return left.cmp(&right);
    }
    if let (Some(left), Some(right)) = (a.as_f64(), b.as_f64()) {
        return left.partial_cmp(&right).unwrap_or(Ordering::Equal);
    }
    if let (Some(left), Some(right)) = (a.as_str(), b.as_str()) {
        return left.cmp(right);
    }
    if let (Some(left), Some(right)) = (a.as_bool(), b.as_bool()) {
        return left.cmp(&right);
    }
    type_rank(a).cmp(&type_rank(b))
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}
