//! Map adapter tests: keyed reads and writes against a live engine map.

use serde_json::json;
use yproxy::{
    Wrapper,
    y_crdt::{Map, Transact},
};

use crate::helpers::*;

#[test]
fn test_missing_key_then_external_and_wrapper_writes() {
    let (doc, root, session) = setup_map(false);
    let store = map_proxy(&session, &root, None);

    assert!(store.get("foo").unwrap().is_none());

    root.insert(&mut doc.transact_mut(), "foo", "a");
    assert_eq!(get_str(&store, "foo").as_deref(), Some("a"));

    store.set("foo", "b").unwrap();
    let txn = doc.transact();
    assert_eq!(
        root.get(&txn, "foo").map(|out| out.to_string(&txn)),
        Some("b".to_string())
    );
}

#[test]
fn test_nested_write_then_external_edit() {
    let (doc, root, session) = setup_map(false);
    let store = map_proxy(&session, &root, None);

    store.set("foo", json!({ "bar": "a" })).unwrap();
    let foo = get_map(&store, "foo");
    assert_eq!(get_str(&foo, "bar").as_deref(), Some("a"));

    {
        let mut txn = doc.transact_mut();
        let Some(yproxy::y_crdt::Out::YMap(nested)) = root.get(&txn, "foo") else {
            panic!("foo should be a keyed container");
        };
        nested.insert(&mut txn, "bar", "b");
    }
    assert_eq!(get_str(&foo, "bar").as_deref(), Some("b"));
    assert_eq!(get_str(&get_map(&store, "foo"), "bar").as_deref(), Some("b"));
}

#[test]
fn test_keys_and_has_reflect_live_state() {
    let (doc, root, session) = setup_map(false);
    let store = map_proxy(&session, &root, None);
    store.set("a", 1).unwrap();
    store.set("b", 2).unwrap();

    let mut keys = store.keys().unwrap();
    keys.sort();
    assert_eq!(keys, vec!["a", "b"]);
    assert!(store.has("a").unwrap());

    root.remove(&mut doc.transact_mut(), "a");
    assert!(!store.has("a").unwrap());
    assert_eq!(store.keys().unwrap(), vec!["b"]);
    assert_eq!(store.len().unwrap(), 1);
}

#[test]
fn test_delete_always_succeeds() {
    let (doc, root, session) = setup_map(false);
    let store = map_proxy(&session, &root, None);
    store.set("a", true).unwrap();

    store.delete("a").unwrap();
    store.delete("never-there").unwrap();
    assert!(store.is_empty().unwrap());
    assert_eq!(engine_json(&doc, &root), json!({}));
}

#[test]
fn test_object_assignment_is_one_transaction() {
    let (doc, root, session) = setup_map(false);
    let store = map_proxy(&session, &root, None);

    let updates = std::rc::Rc::new(std::cell::Cell::new(0));
    let seen = updates.clone();
    let _sub = doc
        .observe_update_v1(move |_, _| seen.set(seen.get() + 1))
        .unwrap();

    store
        .set("user", json!({ "name": "Ada", "age": 32, "tags": ["a", "b"] }))
        .unwrap();
    assert_eq!(updates.get(), 1);

    store
        .update([("x", json!(1)), ("y", json!({ "z": [true] }))])
        .unwrap();
    assert_eq!(updates.get(), 2);
    assert_eq!(engine_json(&doc, &root)["y"], json!({ "z": [true] }));
}

#[test]
fn test_entries_wrap_nested_containers() {
    let (_doc, root, session) = setup_map(false);
    let store = map_proxy(&session, &root, None);
    store
        .set("todo", json!({ "text": "milk", "tags": ["shop"] }))
        .unwrap();

    let todo = get_map(&store, "todo");
    let mut entries = todo.entries().unwrap();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(entries[0].0, "tags");
    assert!(entries[0].1.as_array().is_some());
    assert_eq!(entries[1].1.as_str(), Some("milk"));
    assert!(entries[0].1 == yproxy::Item::Array(get_array(&todo, "tags")));
}

#[test]
fn test_display_and_json_string() {
    let (_doc, root, session) = setup_map(false);
    let store = map_proxy(&session, &root, None);
    store.set("n", 10).unwrap();
    store.set("list", vec![1.5, 2.0]).unwrap();

    let json = store.to_json().unwrap();
    assert_eq!(json, json!({ "n": 10, "list": [1.5, 2] }));
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&store.to_string()).unwrap(),
        json
    );
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&store.to_json_string().unwrap()).unwrap(),
        json
    );
}

#[test]
fn test_clear_removes_everything() {
    let (doc, root, session) = setup_map(false);
    let store = map_proxy(&session, &root, None);
    store.update([("a", 1), ("b", 2), ("c", 3)]).unwrap();
    store.clear().unwrap();
    assert_eq!(engine_json(&doc, &root), json!({}));
}

#[test]
fn test_node_exposes_engine_container() {
    let (_doc, root, session) = setup_map(false);
    let store = map_proxy(&session, &root, None);
    assert_eq!(store.node().id(), yproxy::Node::from(root).id());
    assert_eq!(store.node().kind(), "map");
}
