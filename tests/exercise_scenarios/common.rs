//! Shared setup for the scenario suites.

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{json, Value};
use stashkit::{into_document, Document, InstrumentedCache, KeyValueClient, MemoryKvStore};

/// Fresh in-memory store and a cache over it.
pub fn setup() -> (Arc<dyn KeyValueClient>, InstrumentedCache) {
    let client: Arc<dyn KeyValueClient> = Arc::new(MemoryKvStore::new());
    let cache = InstrumentedCache::initialize(client.clone()).expect("cache init");
    (client, cache)
}

pub fn doc(v: Value) -> Document {
    into_document(v).expect("object literal")
}

/// Schools used across the document scenarios.
pub fn schools() -> Vec<Document> {
    vec![
        doc(json!({"name": "Holberton school", "topics": ["Algo", "C", "Python", "React"]})),
        doc(json!({"name": "UCSF", "topics": ["Algo", "MongoDB"]})),
        doc(json!({"name": "UCLA", "topics": ["C", "Python"]})),
    ]
}

/// Students with per-topic scores.
pub fn students() -> Vec<Document> {
    vec![
        doc(json!({"name": "John", "topics": [
            {"title": "Algo", "score": 10.3},
            {"title": "C", "score": 6.2},
            {"title": "Python", "score": 12.1}
        ]})),
        doc(json!({"name": "Bob", "topics": [
            {"title": "Algo", "score": 5.4},
            {"title": "C", "score": 4.9},
            {"title": "Python", "score": 7.9}
        ]})),
        doc(json!({"name": "Sonia", "topics": [
            {"title": "Algo", "score": 14.8},
            {"title": "C", "score": 8.8},
            {"title": "Python", "score": 15.7}
        ]})),
        doc(json!({"name": "Amy", "topics": [
            {"title": "Algo", "score": 9.1},
            {"title": "C", "score": 14.2},
            {"title": "Python", "score": 4.8}
        ]})),
        doc(json!({"name": "Julia", "topics": [
            {"title": "Algo", "score": 10.5},
            {"title": "C", "score": 10.2},
            {"title": "Python", "score": 10.1}
        ]})),
    ]
}
