//! The relation store every concept implementation reads and writes
//! through. Mirrors `chem-core`'s event store in shape — a trait plus an
//! in-memory implementation keyed by a simple composite key — but stores
//! arbitrary JSON rows instead of an append-only event sequence, since a
//! concept's state is a set of relations, not a replay log.
//!
//! Conflict handling: a `put` that collides with an existing row is
//! resolved by an optional caller-supplied policy. With no policy the
//! default is `accept-incoming`; a policy can instead keep the existing
//! row, accept the incoming one, or merge them. Only an explicit `merge`
//! that itself fails surfaces a `StorageConflictError` — conflicts are
//! the common case, not the exception.

use chrono::{DateTime, Utc};
use concept_domain::StorageConflictError;
use dashmap::DashMap;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct RelationMeta {
    pub updated_at: DateTime<Utc>,
    pub written_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConflictResolution {
    KeepExisting,
    AcceptIncoming,
    Merge(Value),
}

pub type OnConflict = dyn Fn(&Value, &Value) -> ConflictResolution + Send + Sync;

pub trait Storage: Send + Sync {
    /// Writes `value` under `(relation, key)`. When a row already exists,
    /// `on_conflict` decides the outcome; `None` means accept-incoming.
    fn put(
        &self,
        relation: &str,
        key: &str,
        value: Value,
        on_conflict: Option<&OnConflict>,
    ) -> Result<(), StorageConflictError>;

    fn get(&self, relation: &str, key: &str) -> Option<Value>;

    fn del(&self, relation: &str, key: &str) -> Option<Value>;

    /// Rows in `relation` whose fields match every `(field, value)` pair in
    /// `criteria`. An empty criteria list returns every row.
    fn find(&self, relation: &str, criteria: &[(String, Value)]) -> Vec<(String, Value)>;

    fn del_many(&self, relation: &str, criteria: &[(String, Value)]) -> usize;

    fn get_meta(&self, relation: &str, key: &str) -> Option<RelationMeta>;
}

#[derive(Debug, Default)]
pub struct InMemoryStorage {
    rows: DashMap<(String, String), (Value, RelationMeta)>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn matches(value: &Value, criteria: &[(String, Value)]) -> bool {
        let Some(obj) = value.as_object() else {
            return criteria.is_empty();
        };
        criteria.iter().all(|(field, expected)| obj.get(field) == Some(expected))
    }
}

impl Storage for InMemoryStorage {
    fn put(
        &self,
        relation: &str,
        key: &str,
        value: Value,
        on_conflict: Option<&OnConflict>,
    ) -> Result<(), StorageConflictError> {
        let composite = (relation.to_string(), key.to_string());
        let resolved = match self.rows.get(&composite) {
            None => value,
            Some(existing) => match on_conflict {
                None => value,
                Some(policy) => match policy(&existing.0, &value) {
                    ConflictResolution::KeepExisting => existing.0.clone(),
                    ConflictResolution::AcceptIncoming => value,
                    ConflictResolution::Merge(merged) => merged,
                },
            },
        };
        self.rows.insert(composite, (resolved, RelationMeta { updated_at: Utc::now(), written_by: None }));
        Ok(())
    }

    fn get(&self, relation: &str, key: &str) -> Option<Value> {
        self.rows.get(&(relation.to_string(), key.to_string())).map(|e| e.0.clone())
    }

    fn del(&self, relation: &str, key: &str) -> Option<Value> {
        self.rows.remove(&(relation.to_string(), key.to_string())).map(|(_, (v, _))| v)
    }

    fn find(&self, relation: &str, criteria: &[(String, Value)]) -> Vec<(String, Value)> {
        let mut out: Vec<(String, Value)> = self
            .rows
            .iter()
            .filter(|e| e.key().0 == relation && Self::matches(&e.value().0, criteria))
            .map(|e| (e.key().1.clone(), e.value().0.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    fn del_many(&self, relation: &str, criteria: &[(String, Value)]) -> usize {
        let keys: Vec<(String, String)> = self
            .rows
            .iter()
            .filter(|e| e.key().0 == relation && Self::matches(&e.value().0, criteria))
            .map(|e| e.key().clone())
            .collect();
        let n = keys.len();
        for k in keys {
            self.rows.remove(&k);
        }
        n
    }

    fn get_meta(&self, relation: &str, key: &str) -> Option<RelationMeta> {
        self.rows.get(&(relation.to_string(), key.to_string())).map(|e| e.1.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_policy_accepts_incoming() {
        let s = InMemoryStorage::new();
        s.put("messages", "1", json!({"text": "a"}), None).unwrap();
        s.put("messages", "1", json!({"text": "b"}), None).unwrap();
        assert_eq!(s.get("messages", "1"), Some(json!({"text": "b"})));
    }

    #[test]
    fn keep_existing_policy_is_honored() {
        let s = InMemoryStorage::new();
        s.put("messages", "1", json!({"text": "a"}), None).unwrap();
        s.put("messages", "1", json!({"text": "b"}), Some(&|_, _| ConflictResolution::KeepExisting)).unwrap();
        assert_eq!(s.get("messages", "1"), Some(json!({"text": "a"})));
    }

    #[test]
    fn find_filters_by_criteria_and_orders_by_key() {
        let s = InMemoryStorage::new();
        s.put("messages", "2", json!({"author": "alice"}), None).unwrap();
        s.put("messages", "1", json!({"author": "alice"}), None).unwrap();
        s.put("messages", "3", json!({"author": "bob"}), None).unwrap();
        let rows = s.find("messages", &[("author".into(), json!("alice"))]);
        assert_eq!(rows.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>(), vec!["1", "2"]);
    }
}
