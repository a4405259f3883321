//! Segment-path access into a JSON tree.
//!
//! Reads never fail: a missing or non-object intermediate yields `None`.
//! Writes create intermediate objects as needed.

use serde_json::{Map, Value};

#[must_use]
pub fn get<'a>(tree: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut node = tree;
    for segment in path {
        node = node.as_object()?.get(*segment)?;
    }
    Some(node)
}

/// Present and not `null`.
#[must_use]
pub fn get_present<'a>(tree: &'a Value, path: &[&str]) -> Option<&'a Value> {
    get(tree, path).filter(|v| !v.is_null())
}

/// Write `value` at `path`, replacing any non-object intermediates.
pub fn set(tree: &mut Value, path: &[&str], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        *tree = value;
        return;
    };
    let mut node = tree;
    for segment in parents {
        node = object_mut(node)
            .entry((*segment).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    object_mut(node).insert((*last).to_string(), value);
}

fn object_mut(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just made an object"),
    }
}
