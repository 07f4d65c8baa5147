//! In-memory document collection
//!
//! Documents live in insertion order inside a `parking_lot::RwLock`.
//! Reads take the shared lock; `insert_one` and `update_many` take the
//! exclusive lock, so each call is atomic with respect to the others.
//!
//! `update_many` applies its changes to copies first: a type error on any
//! matching document leaves the whole collection untouched.

use parking_lot::RwLock;
use serde_json::Value;
use stashkit_core::{
    Document, DocumentId, DocumentStoreClient, Error, Result, UpdateOutcome, ID_FIELD,
};
use tracing::debug;

use crate::pipeline::Pipeline;
use crate::query::Filter;
use crate::update::Update;

/// Schema-less collection held in process memory
#[derive(Debug, Default)]
pub struct MemoryCollection {
    name: String,
    docs: RwLock<Vec<Document>>,
}

impl MemoryCollection {
    /// Create an empty collection
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            docs: RwLock::new(Vec::new()),
        }
    }

    /// Collection name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Copy of every document in insertion order
    pub fn snapshot(&self) -> Vec<Document> {
        self.docs.read().clone()
    }
}

fn id_of(doc: &Document) -> Result<DocumentId> {
    match doc.get(ID_FIELD) {
        Some(Value::String(s)) => Ok(DocumentId::from_string(s.clone())),
        Some(Value::Number(n)) => Ok(DocumentId::from_string(n.to_string())),
        Some(other) => Err(Error::InvalidUpdate(format!(
            "_id must be a string or number, got {}",
            stashkit_core::document::type_name(other)
        ))),
        None => Err(Error::InvalidUpdate("document has no _id".into())),
    }
}

impl DocumentStoreClient for MemoryCollection {
    fn find(&self, filter: &Document) -> Result<Vec<Document>> {
        let filter = Filter::compile(filter)?;
        let docs = self.docs.read();
        let found: Vec<Document> = docs.iter().filter(|d| filter.matches(d)).cloned().collect();
        debug!(target: "stashkit::docs", collection = %self.name, hits = found.len(), "find");
        Ok(found)
    }

    fn insert_one(&self, mut document: Document) -> Result<DocumentId> {
        let id = if document.contains_key(ID_FIELD) {
            id_of(&document)?
        } else {
            let id = DocumentId::generate();
            document.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
            id
        };

        let mut docs = self.docs.write();
        if docs.iter().any(|d| id_of(d).ok().as_ref() == Some(&id)) {
            return Err(Error::Backend(format!(
                "duplicate _id '{}' in collection '{}'",
                id, self.name
            )));
        }
        docs.push(document);
        debug!(target: "stashkit::docs", collection = %self.name, id = %id, "insert_one");
        Ok(id)
    }

    fn update_many(&self, filter: &Document, update: &Document) -> Result<UpdateOutcome> {
        let filter = Filter::compile(filter)?;
        let update = Update::compile(update)?;

        let mut docs = self.docs.write();
        let mut staged = Vec::new();
        for (idx, doc) in docs.iter().enumerate() {
            if filter.matches(doc) {
                let mut copy = doc.clone();
                let changed = update.apply(&mut copy)?;
                staged.push((idx, changed, copy));
            }
        }

        let mut outcome = UpdateOutcome {
            matched: staged.len() as u64,
            modified: 0,
        };
        for (idx, changed, copy) in staged {
            if changed {
                docs[idx] = copy;
                outcome.modified += 1;
            }
        }
        debug!(
            target: "stashkit::docs",
            collection = %self.name,
            matched = outcome.matched,
            modified = outcome.modified,
            "update_many"
        );
        Ok(outcome)
    }

    fn aggregate(&self, pipeline: &[Value]) -> Result<Vec<Document>> {
        let pipeline = Pipeline::compile(pipeline)?;
        let input = self.snapshot();
        pipeline.run(input)
    }

    fn count(&self) -> Result<u64> {
        Ok(self.docs.read().len() as u64)
    }
}
