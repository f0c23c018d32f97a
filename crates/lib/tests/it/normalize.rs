//! Normalization tests: plain values written through wrappers become engine containers.

use serde_json::json;
use yproxy::{
    Value, Wrapper, normalize,
    y_crdt::{Any, Array, ArrayPrelim, In, Map, MapPrelim, Out, Transact},
};

use crate::helpers::*;

#[test]
fn test_nested_object_becomes_nested_maps() {
    let (doc, root, session) = setup_map(false);
    let store = map_proxy(&session, &root, None);

    store
        .set("user", json!({ "name": "Ada", "profile": { "langs": ["en", "fr"] } }))
        .expect("write failed");

    let txn = doc.transact();
    let Some(Out::YMap(user)) = root.get(&txn, "user") else {
        panic!("user should be stored as a keyed container");
    };
    let Some(Out::YMap(profile)) = user.get(&txn, "profile") else {
        panic!("profile should be stored as a keyed container");
    };
    let Some(Out::YArray(langs)) = profile.get(&txn, "langs") else {
        panic!("langs should be stored as an ordered container");
    };
    assert_eq!(langs.len(&txn), 2);
}

#[test]
fn test_round_trip_through_wrappers() {
    let (doc, root, session) = setup_map(true);
    let store = map_proxy(&session, &root, None);
    let values = [
        json!(null),
        json!(true),
        json!(42),
        json!(-1.25),
        json!("text"),
        json!([]),
        json!({}),
        json!([1, [2, [3, { "deep": [null, false] }]]]),
        json!({ "a": { "b": { "c": { "d": "e" } } }, "list": [{ "x": 1 }, { "y": [2, 3] }] }),
    ];

    for (i, value) in values.iter().enumerate() {
        let key = format!("k{i}");
        store.set(&key, value.clone()).expect("write failed");
        let read = store
            .get(&key)
            .expect("read failed")
            .expect("key should be present");
        assert_eq!(&read.to_json().expect("materialize failed"), value);
    }
    assert_eq!(
        engine_json(&doc, &root)["k8"]["list"][1]["y"],
        json!([2, 3])
    );
}

#[test]
fn test_prelims_pass_through_unchanged() {
    let (doc, root, session) = setup_map(false);
    let store = map_proxy(&session, &root, None);

    let list: ArrayPrelim = [In::Any(Any::Number(1.0)), In::Any(Any::Number(2.0))]
        .into_iter()
        .collect();
    let flags: MapPrelim = [("on".to_string(), In::Any(Any::Bool(true)))]
        .into_iter()
        .collect();
    store.set("list", list).expect("write failed");
    store.set("flags", flags).expect("write failed");

    assert_eq!(
        engine_json(&doc, &root),
        json!({ "list": [1, 2], "flags": { "on": true } })
    );
}

#[test]
fn test_inserting_integrated_container_is_rejected() {
    let (doc, root, session) = setup_map(false);
    let store = map_proxy(&session, &root, None);
    store.set("a", json!({ "x": 1 })).expect("write failed");
    let nested = get_map(&store, "a");

    let err = store.set("b", &nested).unwrap_err();
    assert!(err.is_cross_document());
    assert!(!store.has("b").unwrap());

    let other = yproxy::y_crdt::Doc::new();
    let foreign = other.get_or_insert_map("foreign");
    let err = store
        .set("c", Value::from(vec![Value::from(foreign)]))
        .unwrap_err();
    assert!(err.is_cross_document());
    assert_eq!(engine_json(&doc, &root), json!({ "a": { "x": 1 } }));
}

#[test]
fn test_normalize_keeps_primitives() {
    assert!(matches!(
        normalize(Value::from("x")).unwrap(),
        In::Any(_)
    ));
    assert!(matches!(
        normalize(Value::from(json!({ "k": [1] }))).unwrap(),
        In::Map(_)
    ));
}
