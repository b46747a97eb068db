// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory document store with the same write semantics as Firestore:
//! full-document sets, masked (merge) updates, ordered listing and
//! equality counts. Used by tests and local development without the emulator.
//!
//! Reads carry the document key under [`DOC_ID_FIELD`], as Firestore reads do.

use crate::db::DOC_ID_FIELD;
use crate::time_utils::parse_utc_rfc3339;
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Shared in-memory collections of JSON documents.
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<DashMap<String, BTreeMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, collection: &str, id: &str) -> Option<Value> {
        self.collections
            .get(collection)
            .and_then(|docs| docs.get(id).map(|doc| with_key(id, doc)))
    }

    /// Replace the whole document.
    pub fn set(&self, collection: &str, id: &str, doc: Value) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), doc);
    }

    /// Apply an update mask: every listed path takes its value from `doc`,
    /// or is removed when `doc` has no value there. Other fields are kept.
    /// Creates the document when it does not exist.
    pub fn merge(&self, collection: &str, id: &str, doc: &Value, field_paths: &[String]) {
        let mut docs = self.collections.entry(collection.to_string()).or_default();
        let existing = docs
            .entry(id.to_string())
            .or_insert_with(|| Value::Object(Map::new()));

        for path in field_paths {
            let segments: Vec<&str> = path.split('.').collect();
            match lookup(doc, &segments) {
                Some(value) => assign(existing, &segments, value.clone()),
                None => remove(existing, &segments),
            }
        }
    }

    /// Deleting a missing document is not an error.
    pub fn delete(&self, collection: &str, id: &str) {
        if let Some(mut docs) = self.collections.get_mut(collection) {
            docs.remove(id);
        }
    }

    /// All documents ordered by `field`. Documents missing the field are
    /// excluded, as with a Firestore `orderBy` query.
    pub fn list_ordered(&self, collection: &str, field: &str, descending: bool) -> Vec<Value> {
        let mut docs: Vec<Value> = self
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, d)| d.get(field).is_some())
                    .map(|(id, d)| with_key(id, d))
                    .collect()
            })
            .unwrap_or_default();

        docs.sort_by(|a, b| {
            let ord = compare_values(&a[field], &b[field]);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        });
        docs
    }

    /// Number of documents, optionally restricted to `field == value`.
    pub fn count(&self, collection: &str, filter: Option<(&str, &str)>) -> usize {
        self.collections
            .get(collection)
            .map(|docs| {
                docs.values()
                    .filter(|d| match filter {
                        Some((field, value)) => d.get(field).and_then(Value::as_str) == Some(value),
                        None => true,
                    })
                    .count()
            })
            .unwrap_or(0)
    }
}

fn with_key(id: &str, doc: &Value) -> Value {
    let mut doc = doc.clone();
    if let Value::Object(map) = &mut doc {
        map.insert(DOC_ID_FIELD.to_string(), Value::String(id.to_string()));
    }
    doc
}

fn lookup<'a>(doc: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    segments
        .iter()
        .try_fold(doc, |current, segment| current.get(*segment))
}

fn assign(doc: &mut Value, segments: &[&str], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut current = doc;
    for segment in parents {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        current = match current {
            Value::Object(map) => map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
            _ => return,
        };
    }
    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    if let Value::Object(map) = current {
        map.insert(last.to_string(), value);
    }
}

fn remove(doc: &mut Value, segments: &[&str]) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut current = doc;
    for segment in parents {
        current = match current.get_mut(*segment) {
            Some(next) => next,
            None => return,
        };
    }
    if let Value::Object(map) = current {
        map.remove(*last);
    }
}

/// Timestamps compare as instants, other strings lexically.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::String(a), Value::String(b)) => match (parse_utc_rfc3339(a), parse_utc_rfc3339(b)) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => a.cmp(b),
        },
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .unwrap_or_default()
            .partial_cmp(&b.as_f64().unwrap_or_default())
            .unwrap_or(Ordering::Equal),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}
