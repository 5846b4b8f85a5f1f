//! Local JSON tree maintenance for streamed `put` / `patch` events.
//!
//! Paths are slash-separated and relative to the subscribed location.
//! Writing `null` deletes, and objects left empty are pruned so the tree
//! never holds `{}` (the database has no notion of an empty node).

use serde_json::{Map, Value};

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn is_empty_node(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Object(m) => m.is_empty(),
        _ => false,
    }
}

/// Replace the value at `path`.
pub fn apply_put(tree: &mut Value, path: &str, data: Value) {
    set_at(tree, &segments(path), data);
    if is_empty_node(tree) {
        *tree = Value::Null;
    }
}

/// Merge each child of `data` into the value at `path`.
///
/// A non-object `data` is treated like a put.
pub fn apply_patch(tree: &mut Value, path: &str, data: Value) {
    let base = segments(path);
    match data {
        Value::Object(children) => {
            for (key, value) in children {
                let mut full = base.clone();
                full.extend(segments(&key));
                set_at(tree, &full, value);
            }
        }
        other => set_at(tree, &base, other),
    }
    if is_empty_node(tree) {
        *tree = Value::Null;
    }
}

/// Borrow the value at `path`, if present.
pub fn value_at<'a>(tree: &'a Value, path: &str) -> Option<&'a Value> {
    let mut node = tree;
    for seg in segments(path) {
        node = node.as_object()?.get(seg)?;
    }
    if node.is_null() { None } else { Some(node) }
}

fn set_at(node: &mut Value, segs: &[&str], data: Value) {
    let Some((first, rest)) = segs.split_first() else {
        *node = if is_empty_node(&data) { Value::Null } else { data };
        return;
    };

    if is_empty_node(&data) {
        let Value::Object(map) = node else {
            return;
        };
        if rest.is_empty() {
            map.remove(*first);
        } else if let Some(child) = map.get_mut(*first) {
            set_at(child, rest, data);
            if is_empty_node(child) {
                map.remove(*first);
            }
        }
        return;
    }

    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        let child = map.entry((*first).to_owned()).or_insert(Value::Null);
        set_at(child, rest, data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn root_put_replaces_everything() {
        let mut tree = json!({"old": 1});
        apply_put(&mut tree, "/", json!({"temperature": 24.5, "humidity": 60}));
        assert_eq!(tree, json!({"temperature": 24.5, "humidity": 60}));
    }

    #[test]
    fn nested_put_creates_and_deletes() {
        let mut tree = Value::Null;
        apply_put(&mut tree, "/servo1", json!(true));
        apply_put(&mut tree, "/system", json!(false));
        assert_eq!(tree, json!({"servo1": true, "system": false}));

        apply_put(&mut tree, "/servo1", Value::Null);
        assert_eq!(tree, json!({"system": false}));

        apply_put(&mut tree, "/system", Value::Null);
        assert_eq!(tree, Value::Null);
    }

    #[test]
    fn deleting_last_grandchild_prunes_parent() {
        let mut tree = json!({"a": {"b": {"c": 1}}, "d": 2});
        apply_put(&mut tree, "/a/b/c", Value::Null);
        assert_eq!(tree, json!({"d": 2}));
    }

    #[test]
    fn patch_merges_children() {
        let mut tree = json!({"temperature": 20, "ldr": 500});
        apply_patch(&mut tree, "/", json!({"temperature": 21, "ldr": null, "rain": 1}));
        assert_eq!(tree, json!({"temperature": 21, "rain": 1}));
    }

    #[test]
    fn patch_with_multi_segment_keys() {
        let mut tree = Value::Null;
        apply_patch(&mut tree, "/a", json!({"b/c": 5}));
        assert_eq!(tree, json!({"a": {"b": {"c": 5}}}));
    }

    #[test]
    fn value_at_walks_path() {
        let tree = json!({"a": {"b": 3}});
        assert_eq!(value_at(&tree, "/a/b"), Some(&json!(3)));
        assert_eq!(value_at(&tree, "a"), Some(&json!({"b": 3})));
        assert_eq!(value_at(&tree, "/missing"), None);
        assert_eq!(value_at(&Value::Null, "/"), None);
    }
}
