//! Array adapter tests: sequence methods, index access and their engine effects.

use serde_json::json;
use yproxy::{
    Item, Value, Wrapper,
    y_crdt::{Array, ArrayRef, Doc, Observable, Transact},
};

use crate::helpers::*;

fn seed(doc: &Doc, list: &ArrayRef, values: &[f64]) {
    let mut txn = doc.transact_mut();
    for value in values {
        list.push_back(&mut txn, *value);
    }
}

#[test]
fn test_push_external_pop_then_shift() {
    let (doc, list, session) = setup_array(false);
    seed(&doc, &list, &[10.0, 11.0, 12.0, 13.0]);
    let array = array_proxy(&session, &list, None);

    assert_eq!(array.push([21]).unwrap(), 5);
    assert_eq!(engine_json(&doc, &list), json!([10, 11, 12, 13, 21]));

    {
        let mut txn = doc.transact_mut();
        let last = list.len(&txn) - 1;
        list.remove_range(&mut txn, last, 1);
    }
    assert_eq!(engine_json(&doc, &list), json!([10, 11, 12, 13]));
    assert_eq!(array.len().unwrap(), 4);

    let shifted = array.shift().unwrap().expect("array was not empty");
    assert_eq!(shifted.as_i64(), Some(10));
    assert_eq!(engine_json(&doc, &list), json!([11, 12, 13]));
    assert_eq!(array.to_json().unwrap(), json!([11, 12, 13]));
}

#[test]
fn test_splice_emits_one_event_per_call() {
    let (doc, list, session) = setup_array(false);
    seed(&doc, &list, &[10.0, 11.0, 97.0, 13.0]);
    let array = array_proxy(&session, &list, None);

    let (events, on_event) = counter();
    let _sub = list.observe(move |_, _| on_event());

    let removed = array.splice(1, 1, Vec::<Value>::new()).unwrap();
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].as_i64(), Some(11));
    assert_eq!(engine_json(&doc, &list), json!([10, 97, 13]));
    assert_eq!(events.get(), 1);

    let removed = array.splice(1, 0, [95, 96]).unwrap();
    assert!(removed.is_empty());
    assert_eq!(engine_json(&doc, &list), json!([10, 95, 96, 97, 13]));
    assert_eq!(events.get(), 2);

    // Replacing in place is still one event
    array.splice(0, 2, ["a"]).unwrap();
    assert_eq!(engine_json(&doc, &list), json!(["a", 96, 97, 13]));
    assert_eq!(events.get(), 3);
}

#[test]
fn test_splice_clamps_out_of_range_arguments() {
    let (doc, list, session) = setup_array(false);
    seed(&doc, &list, &[1.0, 2.0, 3.0]);
    let array = array_proxy(&session, &list, None);

    let removed = array.splice(2, 100, [9]).unwrap();
    assert_eq!(removed.len(), 1);
    assert_eq!(engine_json(&doc, &list), json!([1, 2, 9]));

    array.splice(50, 1, [4]).unwrap();
    assert_eq!(engine_json(&doc, &list), json!([1, 2, 9, 4]));
}

#[test]
fn test_push_and_unshift_keep_order() {
    let (doc, list, session) = setup_array(false);
    let array = array_proxy(&session, &list, None);

    assert_eq!(array.push(["c", "d"]).unwrap(), 2);
    assert_eq!(array.unshift(["a", "b"]).unwrap(), 4);
    assert_eq!(engine_json(&doc, &list), json!(["a", "b", "c", "d"]));

    assert_eq!(array.pop().unwrap().unwrap().as_str(), Some("d"));
    assert_eq!(array.len().unwrap(), 3);
}

#[test]
fn test_pop_and_shift_on_empty() {
    let (_doc, list, session) = setup_array(false);
    let array = array_proxy(&session, &list, None);
    assert!(array.pop().unwrap().is_none());
    assert!(array.shift().unwrap().is_none());
    assert!(array.is_empty().unwrap());
}

#[test]
fn test_index_set_replaces_in_one_transaction() {
    let (doc, list, session) = setup_array(false);
    seed(&doc, &list, &[1.0, 2.0, 3.0]);
    let array = array_proxy(&session, &list, None);

    let (events, on_event) = counter();
    let _sub = list.observe(move |_, _| on_event());

    array.set("1", json!({ "name": "two" })).unwrap();
    assert_eq!(engine_json(&doc, &list), json!([1, { "name": "two" }, 3]));
    assert_eq!(events.get(), 1);

    array.set_at(3, 4).unwrap();
    assert_eq!(engine_json(&doc, &list), json!([1, { "name": "two" }, 3, 4]));

    let err = array.set_at(10, 0).unwrap_err();
    assert!(err.is_invalid_mutation());
    assert_eq!(array.len().unwrap(), 4);
}

#[test]
fn test_non_integer_keys_are_rejected() {
    let (doc, list, session) = setup_array(true);
    seed(&doc, &list, &[1.0, 2.0]);
    let array = array_proxy(&session, &list, None);

    let err = array.set("foo", 3).unwrap_err();
    assert!(err.is_invalid_mutation());
    let err = array.set("1.5", 3).unwrap_err();
    assert!(err.is_invalid_mutation());
    let err = array.delete("foo").unwrap_err();
    assert!(err.is_invalid_mutation());

    assert_eq!(engine_json(&doc, &list), json!([1, 2]));
    // A rejected write never touches tracking state
    assert!(!array.tracking_info().unwrap().revoked);
    assert!(array_proxy(&session, &list, None) == array);
}

#[test]
fn test_length_is_read_only() {
    let (doc, list, session) = setup_array(false);
    seed(&doc, &list, &[5.0, 6.0]);
    let array = array_proxy(&session, &list, None);

    assert_eq!(array.get("length").unwrap().unwrap().as_i64(), Some(2));
    let err = array.set("length", 0).unwrap_err();
    assert!(err.is_invalid_mutation());
    assert_eq!(array.len().unwrap(), 2);
}

#[test]
fn test_string_key_access() {
    let (doc, list, session) = setup_array(false);
    seed(&doc, &list, &[5.0, 6.0, 7.0]);
    let array = array_proxy(&session, &list, None);

    assert_eq!(array.get("0").unwrap().unwrap().as_i64(), Some(5));
    assert!(array.get("9").unwrap().is_none());
    assert!(array.get("name").unwrap().is_none());
    assert!(array.has("2").unwrap());
    assert!(!array.has("3").unwrap());
    assert!(!array.has("length").unwrap());
    assert_eq!(array.keys().unwrap(), vec!["0", "1", "2"]);

    array.delete("1").unwrap();
    assert_eq!(engine_json(&doc, &list), json!([5, 7]));
    assert!(array.remove_at(2).unwrap_err().is_invalid_mutation());
}

#[test]
fn test_map_filter_find() {
    let (_doc, list, session) = setup_array(false);
    let array = array_proxy(&session, &list, None);
    array
        .push([
            json!({ "text": "milk", "done": true }),
            json!({ "text": "eggs", "done": false }),
            json!({ "text": "tea", "done": false }),
        ])
        .unwrap();

    let texts = array
        .map(|item, _| get_str(item.as_map().unwrap(), "text").unwrap())
        .unwrap();
    assert_eq!(texts, vec!["milk", "eggs", "tea"]);

    let open = array
        .filter(|item, _| {
            item.as_map()
                .and_then(|todo| todo.get("done").unwrap())
                .and_then(|done| done.as_bool())
                == Some(false)
        })
        .unwrap();
    assert_eq!(open.len(), 2);

    let tea = array
        .find(|item, _| get_str(item.as_map().unwrap(), "text").as_deref() == Some("tea"))
        .unwrap()
        .expect("tea should be found");
    assert_eq!(tea.to_json().unwrap(), json!({ "text": "tea", "done": false }));

    let indices = array.map(|_, index| index).unwrap();
    assert_eq!(indices, vec![0, 1, 2]);
    assert!(array.find(|_, _| false).unwrap().is_none());
}

#[test]
fn test_callbacks_may_write_through_wrappers() {
    let (doc, list, session) = setup_array(false);
    let array = array_proxy(&session, &list, None);
    array
        .push([json!({ "done": false }), json!({ "done": false })])
        .unwrap();

    array
        .map(|item, _| item.as_map().unwrap().set("done", true).unwrap())
        .unwrap();
    assert_eq!(
        engine_json(&doc, &list),
        json!([{ "done": true }, { "done": true }])
    );
}

#[test]
fn test_index_of_primitives_and_containers() {
    let (_doc, list, session) = setup_array(false);
    let array = array_proxy(&session, &list, None);
    array
        .push([json!("yjs"), json!(3), json!({ "a": 1 }), json!("yjs")])
        .unwrap();

    assert_eq!(array.index_of("yjs", 0).unwrap(), Some(0));
    assert_eq!(array.index_of("yjs", 1).unwrap(), Some(3));
    assert_eq!(array.index_of(3, 0).unwrap(), Some(1));
    assert_eq!(array.index_of("missing", 0).unwrap(), None);

    let Some(Item::Map(nested)) = array.at(2).unwrap() else {
        panic!("expected a map at index 2");
    };
    assert_eq!(array.index_of(&nested, 0).unwrap(), Some(2));
    // A structurally equal but distinct value is not the same element
    assert_eq!(array.index_of(json!({ "a": 1 }), 0).unwrap(), None);
    assert!(array.contains(3).unwrap());
}

#[test]
fn test_iteration_is_lazy_and_restartable() {
    let (doc, list, session) = setup_array(false);
    seed(&doc, &list, &[1.0, 2.0, 3.0]);
    let array = array_proxy(&session, &list, None);

    let mut iter = array.iter();
    assert_eq!(iter.next().unwrap().unwrap().as_i64(), Some(1));
    list.push_back(&mut doc.transact_mut(), 4.0);
    let rest: Vec<i64> = iter.map(|item| item.unwrap().as_i64().unwrap()).collect();
    assert_eq!(rest, vec![2, 3, 4]);

    let all: Vec<i64> = (&array)
        .into_iter()
        .map(|item| item.unwrap().as_i64().unwrap())
        .collect();
    assert_eq!(all, vec![1, 2, 3, 4]);
}

#[test]
fn test_clear_and_to_vec() {
    let (doc, list, session) = setup_array(false);
    seed(&doc, &list, &[1.0, 2.0]);
    let array = array_proxy(&session, &list, None);
    assert_eq!(array.to_vec().unwrap().len(), 2);
    array.clear().unwrap();
    assert_eq!(engine_json(&doc, &list), json!([]));
    assert_eq!(array.to_string(), "[]");
}

#[test]
fn test_removed_containers_keep_their_contents() {
    let (doc, list, session) = setup_array(true);
    let array = array_proxy(&session, &list, None);
    array
        .push([
            json!({ "text": "milk" }),
            json!({ "text": "tea" }),
            json!(["a", "b"]),
            json!({ "text": "eggs" }),
        ])
        .unwrap();
    let cached = session.cached_wrappers();

    let popped = array.pop().unwrap().expect("array was not empty");
    assert!(popped.as_map().is_none());
    assert_eq!(popped.to_json().unwrap(), json!({ "text": "eggs" }));

    let shifted = array.shift().unwrap().expect("array was not empty");
    assert_eq!(shifted.to_json().unwrap(), json!({ "text": "milk" }));

    let removed = array.splice(1, 1, Vec::<Value>::new()).unwrap();
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].to_json().unwrap(), json!(["a", "b"]));

    assert_eq!(engine_json(&doc, &list), json!([{ "text": "tea" }]));
    // Removed containers never enter the identity cache
    assert!(session.cached_wrappers() <= cached);
}
