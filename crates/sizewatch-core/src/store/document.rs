//! Path operations on an in-memory JSON document.
//!
//! Shared by the memory and file backends. Mirrors realtime-database
//! semantics: objects are created on the way down, a write replaces the
//! subtree, and deleting the last child of an object removes the object.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use super::naming::segments;

pub(crate) fn empty() -> Value {
    Value::Object(Map::new())
}

pub(crate) fn get<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut node = root;
    for segment in segments(path) {
        node = node.as_object()?.get(segment)?;
    }
    if node.is_null() {
        None
    } else {
        Some(node)
    }
}

pub(crate) fn set(root: &mut Value, path: &str, value: Value) {
    let segs = segments(path);
    let Some((last, parents)) = segs.split_last() else {
        *root = if value.is_null() { empty() } else { value };
        return;
    };

    if value.is_null() {
        remove(root, &segs);
        return;
    }

    let mut node = root;
    for segment in parents {
        node = ensure_object(node)
            .entry(segment.to_string())
            .or_insert(Value::Null);
    }
    ensure_object(node).insert(last.to_string(), value);
}

pub(crate) fn children(root: &Value, path: &str) -> BTreeSet<String> {
    get(root, path)
        .and_then(Value::as_object)
        .map(|map| map.keys().cloned().collect())
        .unwrap_or_default()
}

fn remove(node: &mut Value, segs: &[&str]) {
    let Some((first, rest)) = segs.split_first() else {
        return;
    };
    let Value::Object(map) = node else {
        return;
    };
    if rest.is_empty() {
        map.remove(*first);
        return;
    }
    if let Some(child) = map.get_mut(*first) {
        remove(child, rest);
        if child.as_object().is_some_and(Map::is_empty) {
            map.remove(*first);
        }
    }
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = empty();
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced with an object"),
    }
}
