//! School and student helpers against the in-memory collection.

use serde_json::json;
use stashkit::{
    insert_school, list_all, schools_by_topic, top_students, update_topics, DocumentStoreClient,
    MemoryCollection, AVERAGE_SCORE_FIELD, ID_FIELD,
};

use crate::common::{doc, schools, students};

fn seeded(name: &str, docs: Vec<stashkit::Document>) -> MemoryCollection {
    let coll = MemoryCollection::new(name);
    for d in docs {
        insert_school(&coll, d).unwrap();
    }
    coll
}

#[test]
fn list_all_on_empty_and_seeded_collections() {
    assert!(list_all(&MemoryCollection::new("school")).unwrap().is_empty());

    let coll = seeded("school", schools());
    let all = list_all(&coll).unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.iter().all(|d| d.contains_key(ID_FIELD)));
}

#[test]
fn insert_then_find_by_returned_id() {
    let coll = MemoryCollection::new("school");
    let id = insert_school(
        &coll,
        doc(json!({"name": "UCSF", "address": "505 Parnassus Ave"})),
    )
    .unwrap();

    let found = coll.find(&doc(json!({"_id": id.to_string()}))).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["name"], json!("UCSF"));
}

#[test]
fn update_topics_then_search_by_topic() {
    let coll = seeded("school", schools());

    let python: Vec<_> = schools_by_topic(&coll, "Python")
        .unwrap()
        .into_iter()
        .map(|d| d["name"].clone())
        .collect();
    assert_eq!(python, vec![json!("Holberton school"), json!("UCLA")]);

    update_topics(&coll, "Holberton school", ["Sys admin", "AI", "Algorithm"]).unwrap();
    update_topics(&coll, "UCSF", ["Algo", "MongoDB", "AI"]).unwrap();

    let ai = schools_by_topic(&coll, "AI").unwrap();
    assert_eq!(ai.len(), 2);
    let python = schools_by_topic(&coll, "Python").unwrap();
    assert_eq!(python.len(), 1);
    assert_eq!(python[0]["name"], json!("UCLA"));
}

#[test]
fn top_students_sorted_by_average() {
    let coll = seeded("students", students());
    let ranked = top_students(&coll).unwrap();

    let names: Vec<&str> = ranked.iter().filter_map(|d| d["name"].as_str()).collect();
    assert_eq!(names, vec!["Sonia", "Julia", "John", "Amy", "Bob"]);

    let sonia = ranked[0][AVERAGE_SCORE_FIELD].as_f64().unwrap();
    assert!((sonia - 13.1).abs() < 1e-9);

    let averages: Vec<f64> = ranked
        .iter()
        .filter_map(|d| d[AVERAGE_SCORE_FIELD].as_f64())
        .collect();
    assert!(averages.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn top_students_leaves_stored_documents_alone() {
    let coll = seeded("students", students());
    top_students(&coll).unwrap();
    assert!(list_all(&coll)
        .unwrap()
        .iter()
        .all(|d| !d.contains_key(AVERAGE_SCORE_FIELD)));
}
