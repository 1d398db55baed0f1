//! Integration tests for Collection
//!
//! CRUD operations, predicate evaluation and persistence on a file-backed
//! database in a temporary directory.

use fastdb_core::{
    Collection, Database, DocumentId, FastDbError, FieldFilter, Operator, Predicate,
    StorageEngine,
};
use serde_json::{json, Value};
use tempfile::TempDir;

fn create_test_db() -> (TempDir, Database) {
    let dir = TempDir::new().unwrap();
    let db = Database::open_at("test", dir.path()).unwrap();
    (dir, db)
}

fn create_test_collection(name: &str) -> (TempDir, Database, Collection<Value, StorageEngine>) {
    let (dir, db) = create_test_db();
    let collection = db.collection::<Value>(name).unwrap();
    (dir, db, collection)
}

fn data_of(docs: &[fastdb_core::Document]) -> Vec<Value> {
    docs.iter().map(|d| d.data().clone()).collect()
}

// ========== INSERT TESTS ==========

#[test]
fn test_insert_one_returns_document() {
    let (_dir, _db, users) = create_test_collection("users");

    let doc = users.insert_one(json!({"name": "Alice"})).unwrap();

    assert_eq!(doc.data()["name"], "Alice");
    assert_eq!(doc.created_at(), doc.updated_at());
    assert!(!doc.is_deleted());
    assert_eq!(users.count(), 1);
}

#[test]
fn test_insert_many_preserves_order() {
    let (_dir, _db, nums) = create_test_collection("nums");

    let docs = nums
        .insert_many((0..10).map(|i| json!({"i": i})).collect())
        .unwrap();

    assert_eq!(docs.len(), 10);
    let all = nums.find_all();
    let ids: Vec<&DocumentId> = all.iter().map(|d| d.id()).collect();
    let expected: Vec<&DocumentId> = docs.iter().map(|d| d.id()).collect();
    assert_eq!(ids, expected);
}

#[test]
fn test_insert_many_empty_is_noop() {
    let (dir, _db, nums) = create_test_collection("nums");

    let docs = nums.insert_many(vec![]).unwrap();

    assert!(docs.is_empty());
    assert!(!dir.path().join("nums").join("nums.json").exists());
}

// ========== FIND TESTS ==========

#[test]
fn test_find_by_id_after_insert() {
    let (_dir, _db, users) = create_test_collection("users");

    let doc = users.insert_one(json!({"name": "Bob"})).unwrap();
    let found = users.find_by_id(doc.id()).unwrap();

    assert_eq!(found, doc);
}

#[test]
fn test_find_by_id_missing() {
    let (_dir, _db, users) = create_test_collection("users");
    users.insert_one(json!({"name": "Bob"})).unwrap();

    let err = users.find_by_id(&DocumentId::new()).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_gt_preserves_sequence_order() {
    let (_dir, _db, c) = create_test_collection("c");
    c.insert_many(vec![json!({"a": 1}), json!({"a": 2}), json!({"a": 3})])
        .unwrap();

    let found = c.find_many(&Predicate::new("a", Operator::Gt, json!(1))).unwrap();

    assert_eq!(data_of(&found), vec![json!({"a": 2}), json!({"a": 3})]);
}

#[test]
fn test_in_operator() {
    let (_dir, _db, c) = create_test_collection("c");
    c.insert_many(vec![json!({"a": 1}), json!({"a": 2}), json!({"a": 3})])
        .unwrap();

    let found = c.find_many(&Predicate::new("a", "in", json!([1, 3]))).unwrap();

    assert_eq!(data_of(&found), vec![json!({"a": 1}), json!({"a": 3})]);
}

#[test]
fn test_unknown_operator_matches_nothing() {
    let (_dir, _db, c) = create_test_collection("c");
    c.insert_many(vec![json!({"a": 1}), json!({"a": 2})]).unwrap();

    for operand in [json!(1), json!(null), json!([1, 2]), json!("a")] {
        let found = c
            .find_many(&Predicate::new("a", "between", operand))
            .unwrap();
        assert!(found.is_empty());
    }
}

#[test]
fn test_every_operator() {
    let (_dir, _db, c) = create_test_collection("people");
    c.insert_many(vec![
        json!({"name": "Alice", "age": 30, "city": "Budapest"}),
        json!({"name": "Bob", "age": 25, "city": "Debrecen"}),
        json!({"name": "Carol", "age": 35}),
    ])
    .unwrap();

    let names = |op: &str, field: &str, value: Value| -> Vec<String> {
        c.find_many(&Predicate::new(field, op, value))
            .unwrap()
            .iter()
            .map(|d| d.data()["name"].as_str().unwrap().to_string())
            .collect()
    };

    assert_eq!(names("eq", "age", json!(25)), vec!["Bob"]);
    assert_eq!(names("neq", "age", json!(25)), vec!["Alice", "Carol"]);
    assert_eq!(names("gte", "age", json!(30)), vec!["Alice", "Carol"]);
    assert_eq!(names("lt", "age", json!(30)), vec!["Bob"]);
    assert_eq!(names("lte", "age", json!(30)), vec!["Alice", "Bob"]);
    assert_eq!(names("nin", "age", json!([30, 35])), vec!["Bob"]);
    assert_eq!(names("contains", "city", json!("pest")), vec!["Alice"]);
    assert_eq!(names("ncontains", "city", json!("pest")), vec!["Bob"]);
    assert_eq!(names("neq", "city", json!("Budapest")), vec!["Bob", "Carol"]);
}

#[test]
fn test_find_one_first_in_order() {
    let (_dir, _db, c) = create_test_collection("c");
    let docs = c
        .insert_many(vec![json!({"k": "x", "n": 1}), json!({"k": "x", "n": 2})])
        .unwrap();

    let found = c.find_one(&Predicate::eq("k", json!("x"))).unwrap();

    assert_eq!(found.id(), docs[0].id());
}

#[test]
fn test_find_one_none_is_not_found_find_many_is_empty() {
    let (_dir, _db, c) = create_test_collection("c");
    c.insert_one(json!({"k": "x"})).unwrap();

    let predicate = Predicate::eq("k", json!("y"));
    assert!(c.find_one(&predicate).unwrap_err().is_not_found());
    assert!(c.find_many(&predicate).unwrap().is_empty());
}

// ========== UPDATE TESTS ==========

#[test]
fn test_update_by_id_merges_fields() {
    let (_dir, _db, users) = create_test_collection("users");
    let doc = users
        .insert_one(json!({"name": "Alice", "age": 30, "city": "Budapest"}))
        .unwrap();

    let updated = users
        .update_by_id(doc.id(), &json!({"age": 31, "email": "a@example.com"}))
        .unwrap();

    assert_eq!(
        updated.data(),
        &json!({"name": "Alice", "age": 31, "city": "Budapest", "email": "a@example.com"})
    );
    assert_eq!(updated.id(), doc.id());
    assert_eq!(updated.created_at(), doc.created_at());
    assert!(updated.updated_at() > doc.updated_at());
    assert_eq!(users.find_by_id(doc.id()).unwrap(), updated);
}

#[test]
fn test_update_by_id_repeatedly_increases_updated_at() {
    let (_dir, _db, c) = create_test_collection("c");
    let doc = c.insert_one(json!({"v": 0})).unwrap();

    let mut last = doc.updated_at();
    for v in 1..20 {
        let updated = c.update_by_id(doc.id(), &json!({"v": v})).unwrap();
        assert!(updated.updated_at() > last);
        last = updated.updated_at();
    }
}

#[test]
fn test_update_by_id_missing() {
    let (_dir, _db, c) = create_test_collection("c");
    let err = c.update_by_id(&DocumentId::new(), &json!({"v": 1})).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_update_one_touches_only_first_match() {
    let (_dir, _db, c) = create_test_collection("c");
    let docs = c
        .insert_many(vec![json!({"k": 1, "v": "a"}), json!({"k": 1, "v": "b"})])
        .unwrap();

    let updated = c
        .update_one(&Predicate::eq("k", json!(1)), &json!({"v": "z"}))
        .unwrap();

    assert_eq!(updated.id(), docs[0].id());
    assert_eq!(c.find_by_id(docs[1].id()).unwrap().data()["v"], "b");
}

#[test]
fn test_update_many() {
    let (_dir, _db, c) = create_test_collection("c");
    c.insert_many((0..6).map(|i| json!({"i": i, "flag": false})).collect())
        .unwrap();

    let updated = c
        .update_many(&Predicate::new("i", "gte", json!(3)), &json!({"flag": true}))
        .unwrap();

    assert_eq!(updated.len(), 3);
    let flagged = c.find_many(&Predicate::eq("flag", json!(true))).unwrap();
    assert_eq!(
        flagged.iter().map(|d| d.data()["i"].clone()).collect::<Vec<_>>(),
        vec![json!(3), json!(4), json!(5)]
    );
}

#[test]
fn test_update_many_without_match_is_not_found() {
    let (_dir, _db, c) = create_test_collection("c");
    c.insert_one(json!({"i": 1})).unwrap();

    let err = c
        .update_many(&Predicate::new("i", "gt", json!(100)), &json!({"x": 1}))
        .unwrap_err();
    assert!(err.is_not_found());
}

// ========== DELETE TESTS ==========

#[test]
fn test_delete_by_id_removes_exactly_one() {
    let (_dir, _db, c) = create_test_collection("c");
    let docs = c
        .insert_many(vec![json!({"n": 1}), json!({"n": 2}), json!({"n": 3})])
        .unwrap();

    let removed = c.delete_by_id(docs[1].id()).unwrap();

    assert_eq!(removed.id(), docs[1].id());
    assert_eq!(c.count(), 2);
    assert!(c.find_by_id(docs[1].id()).unwrap_err().is_not_found());
    assert!(c.delete_by_id(docs[1].id()).unwrap_err().is_not_found());
}

#[test]
fn test_delete_one_uses_equality_filter() {
    let (_dir, _db, c) = create_test_collection("c");
    let docs = c
        .insert_many(vec![
            json!({"kind": "cat", "age": 2}),
            json!({"kind": "cat", "age": 5}),
            json!({"kind": "dog", "age": 5}),
        ])
        .unwrap();

    let filter = FieldFilter::from_json(&json!({"kind": "cat", "age": 5})).unwrap();
    let removed = c.delete_one(&filter).unwrap();

    assert_eq!(removed.id(), docs[1].id());
    assert_eq!(c.count(), 2);
    assert!(c.delete_one(&filter).unwrap_err().is_not_found());
}

#[test]
fn test_delete_many() {
    let (_dir, _db, c) = create_test_collection("c");
    c.insert_many(vec![
        json!({"kind": "cat"}),
        json!({"kind": "dog"}),
        json!({"kind": "cat"}),
    ])
    .unwrap();

    let removed = c
        .delete_many(&FieldFilter::new().field("kind", json!("cat")))
        .unwrap();

    assert_eq!(removed.len(), 2);
    assert_eq!(data_of(&c.find_all()), vec![json!({"kind": "dog"})]);

    let err = c
        .delete_many(&FieldFilter::new().field("kind", json!("cat")))
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_delete_many_empty_filter_removes_all() {
    let (_dir, _db, c) = create_test_collection("c");
    c.insert_many(vec![json!({"a": 1}), json!({"b": 2})]).unwrap();

    let removed = c.delete_many(&FieldFilter::new()).unwrap();

    assert_eq!(removed.len(), 2);
    assert_eq!(c.count(), 0);
}

// ========== DROP / COUNT TESTS ==========

#[test]
fn test_drop_then_count_and_reload() {
    let (_dir, db, c) = create_test_collection("c");
    c.insert_many(vec![json!({"a": 1}), json!({"a": 2})]).unwrap();

    c.drop().unwrap();

    assert_eq!(c.count(), 0);
    let reloaded = db.collection::<Value>("c").unwrap();
    assert_eq!(reloaded.count(), 0);
}

#[test]
fn test_count_is_inserts_minus_deletes() {
    let (_dir, _db, c) = create_test_collection("c");
    let docs = c
        .insert_many((0..8).map(|i| json!({"i": i})).collect())
        .unwrap();
    c.insert_one(json!({"i": 8})).unwrap();

    c.delete_by_id(docs[0].id()).unwrap();
    c.delete_many(&FieldFilter::new().field("i", json!(3))).unwrap();
    let _ = c.delete_by_id(docs[0].id());

    assert_eq!(c.count(), 9 - 2);
}

// ========== PERSISTENCE TESTS ==========

#[test]
fn test_reopen_sees_every_mutation() {
    let (dir, db, c) = create_test_collection("users");
    let alice = c.insert_one(json!({"name": "Alice", "age": 30})).unwrap();
    let bob = c.insert_one(json!({"name": "Bob", "age": 25})).unwrap();
    c.update_by_id(alice.id(), &json!({"age": 31})).unwrap();
    c.delete_by_id(bob.id()).unwrap();
    drop(c);
    drop(db);

    let db = Database::open_at("test", dir.path()).unwrap();
    let reopened = db.collection::<Value>("users").unwrap();

    assert_eq!(reopened.count(), 1);
    let stored = reopened.find_by_id(alice.id()).unwrap();
    assert_eq!(stored.data()["age"], 31);
    assert_eq!(stored.created_at(), alice.created_at());
}

#[test]
fn test_open_fails_on_corrupt_file() {
    let (dir, db) = create_test_db();
    let coll_dir = dir.path().join("broken");
    std::fs::create_dir_all(&coll_dir).unwrap();
    std::fs::write(coll_dir.join("broken.json"), b"[{\"id\": 42}]").unwrap();

    let result = db.collection::<Value>("broken");

    assert!(matches!(result, Err(FastDbError::Corruption(_))));
}

#[test]
fn test_list_collections() {
    let (_dir, db) = create_test_db();
    db.collection::<Value>("b").unwrap().insert_one(json!({})).unwrap();
    db.collection::<Value>("a").unwrap().insert_one(json!({})).unwrap();
    let _never_saved = db.collection::<Value>("c").unwrap();

    assert_eq!(db.list_collections().unwrap(), vec!["a", "b"]);
}

#[test]
fn test_dotted_key_is_queryable_and_deletable() {
    let (_dir, _db, hosts) = create_test_collection("hosts");
    hosts.insert_one(json!({"example.com": 1})).unwrap();
    hosts.insert_one(json!({"example": {"com": 1}})).unwrap();

    let found = hosts.find_many(&Predicate::eq("example.com", json!(1))).unwrap();
    assert_eq!(found.len(), 2);

    let removed = hosts
        .delete_many(&FieldFilter::new().field("example.com", json!(1)))
        .unwrap();
    assert_eq!(removed.len(), 2);
    assert_eq!(hosts.count(), 0);
}
