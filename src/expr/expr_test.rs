use serde_json::json;

use super::*;
use crate::RpcError;

fn assert_invalid(result: std::result::Result<impl std::fmt::Debug, RpcError>) {
    match result {
        Err(RpcError::InvalidExpression(_)) => {}
        other => panic!("expected InvalidExpression, got {:?}", other),
    }
}

#[test]
fn test_bool_and_all_predicates() {
    let record = json!({"id": 1});
    assert!(Predicate::compile(&json!(true)).unwrap().matches(&record));
    assert!(!Predicate::compile(&json!(false)).unwrap().matches(&record));
    assert!(Predicate::compile(&json!({"all": true})).unwrap().matches(&record));
}

#[test]
fn test_equality_is_numeric_aware() {
    let p = Predicate::compile(&json!({"eq": ["/amount", 10]})).unwrap();
    assert!(p.matches(&json!({"amount": 10})));
    assert!(p.matches(&json!({"amount": 10.0})));
    assert!(!p.matches(&json!({"amount": "10"})));
    assert!(!p.matches(&json!({})));
}

#[test]
fn test_ne_matches_missing_field() {
    let p = Predicate::compile(&json!({"ne": ["/state", "done"]})).unwrap();
    assert!(p.matches(&json!({"state": "open"})));
    assert!(p.matches(&json!({})));
    assert!(!p.matches(&json!({"state": "done"})));
}

#[test]
fn test_ordering_operators() {
    let record = json!({"n": 5, "s": "m"});
    let check = |expr| Predicate::compile(&expr).unwrap().matches(&record);

    assert!(check(json!({"gt": ["/n", 4]})));
    assert!(check(json!({"ge": ["/n", 5]})));
    assert!(!check(json!({"lt": ["/n", 5]})));
    assert!(check(json!({"le": ["/n", 5.5]})));
    assert!(check(json!({"gt": ["/s", "a"]})));
    // Mixed kinds never match
    assert!(!check(json!({"gt": ["/s", 1]})));
}

#[test]
fn test_boolean_combinators_and_exists() {
    let p = Predicate::compile(&json!({
        "and": [
            {"exists": "/owner/name"},
            {"or": [{"eq": ["/state", "open"]}, {"eq": ["/state", "new"]}]},
            {"not": {"eq": ["/owner/name", "root"]}}
        ]
    }))
    .unwrap();

    assert!(p.matches(&json!({"state": "new", "owner": {"name": "ann"}})));
    assert!(!p.matches(&json!({"state": "new", "owner": {"name": "root"}})));
    assert!(!p.matches(&json!({"state": "closed", "owner": {"name": "ann"}})));
    assert!(!p.matches(&json!({"state": "open"})));
}

#[test]
fn test_whole_record_pointer() {
    let p = Predicate::compile(&json!({"eq": ["", "plain"]})).unwrap();
    assert!(p.matches(&json!("plain")));
    assert!(!p.matches(&json!("other")));
}

#[test]
fn test_malformed_predicates_are_rejected() {
    assert_invalid(Predicate::compile(&json!(42)));
    assert_invalid(Predicate::compile(&json!({})));
    assert_invalid(Predicate::compile(&json!({"eq": ["/a", 1], "ne": ["/b", 2]})));
    assert_invalid(Predicate::compile(&json!({"eq": "/a"})));
    assert_invalid(Predicate::compile(&json!({"eq": ["a", 1]})));
    assert_invalid(Predicate::compile(&json!({"and": {"eq": ["/a", 1]}})));
    assert_invalid(Predicate::compile(&json!({"like": ["/a", "x%"]})));
}

#[test]
fn test_transform_set_creates_nested_fields() {
    let t = Transform::compile(&json!({
        "where": {"eq": ["/id", 1]},
        "set": {"/state": "done", "/meta/by": "worker-2"}
    }))
    .unwrap();

    let updated = t.apply(&json!({"id": 1, "state": "open"})).unwrap();
    assert_eq!(
        updated,
        json!({"id": 1, "state": "done", "meta": {"by": "worker-2"}})
    );
    assert!(t.apply(&json!({"id": 2})).is_none());
}

#[test]
fn test_transform_remove_and_array_paths() {
    let t = Transform::compile(&json!({
        "set": {"/tags/0": "first", "/tags/-": "appended"},
        "remove": ["/lock", "/tags/1"]
    }))
    .unwrap();

    let updated = t
        .apply(&json!({"lock": true, "tags": ["a", "b", "c"]}))
        .unwrap();
    assert_eq!(updated, json!({"tags": ["first", "c", "appended"]}));
}

#[test]
fn test_transform_replace() {
    let t = Transform::compile(&json!({"where": {"exists": "/old"}, "replace": {"new": true}}))
        .unwrap();
    assert_eq!(t.apply(&json!({"old": 1})), Some(json!({"new": true})));
    assert_eq!(t.apply(&json!({"fresh": 1})), None);
}

#[test]
fn test_transform_without_where_matches_everything() {
    let t = Transform::compile(&json!({"set": {"/seen": true}})).unwrap();
    assert_eq!(t.apply(&json!({})), Some(json!({"seen": true})));
}

#[test]
fn test_malformed_transforms_are_rejected() {
    assert_invalid(Transform::compile(&json!([1, 2])));
    assert_invalid(Transform::compile(&json!({"where": true})));
    assert_invalid(Transform::compile(&json!({"replace": 1, "set": {"/a": 1}})));
    assert_invalid(Transform::compile(&json!({"set": ["/a"]})));
    assert_invalid(Transform::compile(&json!({"remove": [""]})));
    assert_invalid(Transform::compile(&json!({"set": {"/a": 1}, "limit": 3})));
    assert_invalid(Transform::compile(&json!({"where": {"bogus": 1}, "set": {"/a": 1}})));
}
