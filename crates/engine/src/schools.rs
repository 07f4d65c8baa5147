//! School and student helpers over a document collection
//!
//! Each helper is one request against a [`DocumentStoreClient`]:
//!
//! - `list_all` - every document (`find {}`)
//! - `insert_school` - insert one document, return its id
//! - `update_topics` - `$set` the topics of every school with a given name
//! - `schools_by_topic` - schools whose `topics` array contains a topic
//! - `top_students` - students ranked by the mean of `topics.score`

use serde_json::{json, Value};
use stashkit_core::{into_document, Document, DocumentId, DocumentStoreClient, Result, UpdateOutcome};
use tracing::debug;

/// Field added by [`top_students`]
pub const AVERAGE_SCORE_FIELD: &str = "averageScore";

/// Every document in the collection
///
/// An empty collection short-circuits to an empty list without a `find`.
pub fn list_all<C: DocumentStoreClient + ?Sized>(collection: &C) -> Result<Vec<Document>> {
    if collection.count()? == 0 {
        return Ok(Vec::new());
    }
    collection.find(&Document::new())
}

/// Insert `fields` as a new document and return the id it was given
pub fn insert_school<C: DocumentStoreClient + ?Sized>(
    collection: &C,
    fields: Document,
) -> Result<DocumentId> {
    let id = collection.insert_one(fields)?;
    debug!(target: "stashkit::docs", id = %id, "Inserted school");
    Ok(id)
}

/// Replace the topics of every school named `name`
pub fn update_topics<C, I, S>(collection: &C, name: &str, topics: I) -> Result<UpdateOutcome>
where
    C: DocumentStoreClient + ?Sized,
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let topics: Vec<Value> = topics.into_iter().map(|t| Value::String(t.into())).collect();
    let filter = into_document(json!({ "name": name }))?;
    let update = into_document(json!({ "$set": { "topics": topics } }))?;
    collection.update_many(&filter, &update)
}

/// Schools whose `topics` contain `topic`
pub fn schools_by_topic<C: DocumentStoreClient + ?Sized>(
    collection: &C,
    topic: &str,
) -> Result<Vec<Document>> {
    let filter = into_document(json!({ "topics": topic }))?;
    collection.find(&filter)
}

/// All students, best average score first
///
/// Each returned document gains an `averageScore` field: the mean of its
/// `topics[].score` values, or null when it has none. Students without a
/// score sort last.
pub fn top_students<C: DocumentStoreClient + ?Sized>(collection: &C) -> Result<Vec<Document>> {
    collection.aggregate(&[
        json!({ "$addFields": { AVERAGE_SCORE_FIELD: { "$avg": "$topics.score" } } }),
        json!({ "$sort": { AVERAGE_SCORE_FIELD: -1 } }),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use stashkit_storage::MemoryCollection;

    fn doc(v: Value) -> Document {
        into_document(v).unwrap()
    }

    fn names(docs: &[Document]) -> Vec<&str> {
        docs.iter().filter_map(|d| d["name"].as_str()).collect()
    }

    #[test]
    fn test_list_all_empty() {
        let coll = MemoryCollection::new("school");
        assert!(list_all(&coll).unwrap().is_empty());
    }

    #[test]
    fn test_list_all_returns_inserted() {
        let coll = MemoryCollection::new("school");
        insert_school(&coll, doc(json!({"name": "UCSF"}))).unwrap();
        insert_school(&coll, doc(json!({"name": "UCLA"}))).unwrap();
        assert_eq!(names(&list_all(&coll).unwrap()), vec!["UCSF", "UCLA"]);
    }

    #[test]
    fn test_insert_school_returns_id() {
        let coll = MemoryCollection::new("school");
        let id = insert_school(&coll, doc(json!({"name": "UCSF", "address": "505 Parnassus Ave"})))
            .unwrap();
        let found = coll.find(&doc(json!({"_id": id.as_str()}))).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["address"], json!("505 Parnassus Ave"));
    }

    #[test]
    fn test_update_topics_then_by_topic() {
        let coll = MemoryCollection::new("school");
        insert_school(&coll, doc(json!({"name": "Holberton school"}))).unwrap();
        insert_school(&coll, doc(json!({"name": "UCSF"}))).unwrap();

        let outcome = update_topics(&coll, "Holberton school", ["Sys admin", "AI", "Algorithm"]).unwrap();
        assert_eq!(outcome.matched, 1);

        assert_eq!(names(&schools_by_topic(&coll, "AI").unwrap()), vec!["Holberton school"]);
        assert!(schools_by_topic(&coll, "Python").unwrap().is_empty());

        update_topics(&coll, "Holberton school", vec![String::from("iOS")]).unwrap();
        assert!(schools_by_topic(&coll, "AI").unwrap().is_empty());
    }

    #[test]
    fn test_update_topics_unknown_name_matches_nothing() {
        let coll = MemoryCollection::new("school");
        insert_school(&coll, doc(json!({"name": "UCSF"}))).unwrap();
        let outcome = update_topics(&coll, "Nowhere", ["C"]).unwrap();
        assert_eq!(outcome, UpdateOutcome::default());
    }

    #[test]
    fn test_top_students_ranking() {
        let coll = MemoryCollection::new("students");
        for student in [
            json!({"name": "Low", "topics": [{"title": "C", "score": 2}, {"title": "Go", "score": 4}]}),
            json!({"name": "High", "topics": [{"title": "C", "score": 9}]}),
            json!({"name": "Mid", "topics": [{"title": "C", "score": 5}, {"title": "Go", "score": 6}]}),
        ] {
            insert_school(&coll, doc(student)).unwrap();
        }

        let ranked = top_students(&coll).unwrap();
        assert_eq!(names(&ranked), vec!["High", "Mid", "Low"]);
        assert_eq!(ranked[1][AVERAGE_SCORE_FIELD].as_f64(), Some(5.5));
        assert_eq!(ranked[2][AVERAGE_SCORE_FIELD].as_f64(), Some(3.0));
    }

    #[test]
    fn test_helpers_accept_trait_objects() {
        let coll = MemoryCollection::new("school");
        let dyn_coll: &dyn DocumentStoreClient = &coll;
        insert_school(dyn_coll, doc(json!({"name": "X", "topics": ["C"]}))).unwrap();
        assert_eq!(schools_by_topic(dyn_coll, "C").unwrap().len(), 1);
    }
}
