//! Structural diff between two state trees.
//!
//! States are compared in their serialized `serde_json::Value` form, so the
//! diff paths match the persisted JSON shape (`["nodes", 0, "position", "x"]`).
//! Objects recurse by key and arrays by index; anything else is compared by
//! value. A stack of the containers on the current path is threaded through
//! the recursion; a container already on the stack is skipped rather than
//! descended into again.

use crate::error::CoreError;
use crate::model::FlowState;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One step in a difference path: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathKey {
    Index(usize),
    Key(String),
}

impl From<&str> for PathKey {
    fn from(s: &str) -> Self {
        PathKey::Key(s.to_string())
    }
}

impl From<usize> for PathKey {
    fn from(i: usize) -> Self {
        PathKey::Index(i)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum Difference {
    Create {
        path: Vec<PathKey>,
        value: Value,
    },
    Remove {
        path: Vec<PathKey>,
        #[serde(rename = "oldValue")]
        old_value: Value,
    },
    Change {
        path: Vec<PathKey>,
        value: Value,
        #[serde(rename = "oldValue")]
        old_value: Value,
    },
}

impl Difference {
    pub fn path(&self) -> &[PathKey] {
        match self {
            Difference::Create { path, .. }
            | Difference::Remove { path, .. }
            | Difference::Change { path, .. } => path,
        }
    }
}

/// Diff two snapshots through their serialized form.
pub fn diff_states(old: &FlowState, new: &FlowState) -> Result<Vec<Difference>, CoreError> {
    let old = serde_json::to_value(old)?;
    let new = serde_json::to_value(new)?;
    Ok(diff(&old, &new))
}

/// Ordered list of differences turning `old` into `new`.
pub fn diff(old: &Value, new: &Value) -> Vec<Difference> {
    let mut out = Vec::new();
    let mut path = Vec::new();
    let mut stack = Vec::new();
    diff_values(old, new, &mut path, &mut stack, &mut out);
    out
}

fn diff_values<'a>(
    old: &'a Value,
    new: &'a Value,
    path: &mut Vec<PathKey>,
    stack: &mut Vec<&'a Value>,
    out: &mut Vec<Difference>,
) {
    if are_comparable_containers(old, new) {
        if stack.iter().any(|seen| std::ptr::eq(*seen, old)) {
            return;
        }
        stack.push(old);
        diff_containers(old, new, path, stack, out);
        stack.pop();
    } else if !values_equal(old, new) {
        out.push(Difference::Change {
            path: path.clone(),
            value: new.clone(),
            old_value: old.clone(),
        });
    }
}

fn diff_containers<'a>(
    old: &'a Value,
    new: &'a Value,
    path: &mut Vec<PathKey>,
    stack: &mut Vec<&'a Value>,
    out: &mut Vec<Difference>,
) {
    match (old, new) {
        (Value::Object(old_map), Value::Object(new_map)) => {
            for (key, old_value) in old_map {
                path.push(PathKey::Key(key.clone()));
                match new_map.get(key) {
                    Some(new_value) => diff_values(old_value, new_value, path, stack, out),
                    None => out.push(Difference::Remove {
                        path: path.clone(),
                        old_value: old_value.clone(),
                    }),
                }
                path.pop();
            }
            for (key, new_value) in new_map {
                if !old_map.contains_key(key) {
                    path.push(PathKey::Key(key.clone()));
                    out.push(Difference::Create {
                        path: path.clone(),
                        value: new_value.clone(),
                    });
                    path.pop();
                }
            }
        }
        (Value::Array(old_items), Value::Array(new_items)) => {
            for (i, old_value) in old_items.iter().enumerate() {
                path.push(PathKey::Index(i));
                match new_items.get(i) {
                    Some(new_value) => diff_values(old_value, new_value, path, stack, out),
                    None => out.push(Difference::Remove {
                        path: path.clone(),
                        old_value: old_value.clone(),
                    }),
                }
                path.pop();
            }
            for (i, new_value) in new_items.iter().enumerate().skip(old_items.len()) {
                path.push(PathKey::Index(i));
                out.push(Difference::Create {
                    path: path.clone(),
                    value: new_value.clone(),
                });
                path.pop();
            }
        }
        _ => {}
    }
}

/// Both objects, or both arrays.
fn are_comparable_containers(a: &Value, b: &Value) -> bool {
    matches!(
        (a, b),
        (Value::Object(_), Value::Object(_)) | (Value::Array(_), Value::Array(_))
    )
}

fn numbers_equal(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

fn numeric(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok()
}

/// Value equality with numeric coercion: `5`, `5.0` and `"5"` are equal,
/// and NaN equals NaN.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => numbers_equal(x, y),
            _ => x == y,
        },
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            match (n.as_f64(), numeric(s)) {
                (Some(x), Some(y)) => numbers_equal(x, y),
                _ => false,
            }
        }
        _ => a == b,
    }
}

/// Replay `diffs` onto `target`. Creations and changes are applied in order,
/// removals afterwards in reverse so trailing array removals stay valid.
pub fn apply_differences(target: &mut Value, diffs: &[Difference]) {
    for d in diffs {
        match d {
            Difference::Create { path, value } | Difference::Change { path, value, .. } => {
                set_at(target, path, value.clone());
            }
            Difference::Remove { .. } => {}
        }
    }
    for d in diffs.iter().rev() {
        if let Difference::Remove { path, .. } = d {
            remove_at(target, path);
        }
    }
}

fn set_at(target: &mut Value, path: &[PathKey], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        *target = value;
        return;
    };
    let mut current = target;
    for key in parents {
        current = match key {
            PathKey::Key(k) => {
                if !current.is_object() {
                    *current = Value::Object(Default::default());
                }
                match current {
                    Value::Object(map) => map.entry(k.clone()).or_insert(Value::Null),
                    _ => return,
                }
            }
            PathKey::Index(i) => match current {
                Value::Array(items) if *i < items.len() => &mut items[*i],
                _ => return,
            },
        };
    }
    match (current, last) {
        (Value::Object(map), PathKey::Key(k)) => {
            map.insert(k.clone(), value);
        }
        (Value::Array(items), PathKey::Index(i)) => {
            if *i < items.len() {
                items[*i] = value;
            } else {
                items.resize(*i, Value::Null);
                items.push(value);
            }
        }
        _ => {}
    }
}

fn remove_at(target: &mut Value, path: &[PathKey]) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut current = target;
    for key in parents {
        let next = match (current, key) {
            (Value::Object(map), PathKey::Key(k)) => map.get_mut(k),
            (Value::Array(items), PathKey::Index(i)) => items.get_mut(*i),
            _ => None,
        };
        match next {
            Some(v) => current = v,
            None => return,
        }
    }
    match (current, last) {
        (Value::Object(map), PathKey::Key(k)) => {
            map.remove(k);
        }
        (Value::Array(items), PathKey::Index(i)) if *i < items.len() => {
            items.remove(*i);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::model::{Edge, Metadata, Node};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn p(keys: &[PathKey]) -> Vec<PathKey> {
        keys.to_vec()
    }

    #[test]
    fn identical_trees_have_no_differences() {
        let v = json!({ "a": [1, 2, { "b": "c" }], "d": null });
        assert!(diff(&v, &v).is_empty());
    }

    #[test]
    fn reports_create_remove_change() {
        let old = json!({ "keep": 1, "gone": true, "nested": { "x": 1 } });
        let new = json!({ "keep": 1, "nested": { "x": 2 }, "fresh": "yes" });
        let diffs = diff(&old, &new);
        assert_eq!(
            diffs,
            vec![
                Difference::Remove {
                    path: p(&["gone".into()]),
                    old_value: json!(true),
                },
                Difference::Change {
                    path: p(&["nested".into(), "x".into()]),
                    value: json!(2),
                    old_value: json!(1),
                },
                Difference::Create {
                    path: p(&["fresh".into()]),
                    value: json!("yes"),
                },
            ]
        );
    }

    #[test]
    fn arrays_compare_by_index() {
        let diffs = diff(&json!([1, 2, 3]), &json!([1, 5]));
        assert_eq!(
            diffs,
            vec![
                Difference::Change {
                    path: p(&[1.into()]),
                    value: json!(5),
                    old_value: json!(2),
                },
                Difference::Remove {
                    path: p(&[2.into()]),
                    old_value: json!(3),
                },
            ]
        );
    }

    #[test]
    fn array_versus_object_is_a_change() {
        let diffs = diff(&json!({ "a": [] }), &json!({ "a": {} }));
        assert_eq!(diffs.len(), 1);
        assert!(matches!(diffs[0], Difference::Change { .. }));
    }

    #[test]
    fn numeric_strings_are_coerced() {
        assert!(diff(&json!({ "a": "5" }), &json!({ "a": 5 })).is_empty());
        assert!(diff(&json!({ "a": 5.0 }), &json!({ "a": 5 })).is_empty());
        assert_eq!(diff(&json!({ "a": "five" }), &json!({ "a": 5 })).len(), 1);
    }

    #[test]
    fn nan_equals_nan() {
        assert!(numbers_equal(f64::NAN, f64::NAN));
        assert!(values_equal(&json!("NaN"), &json!("NaN")));
    }

    #[test]
    fn serialized_difference_shape() {
        let d = Difference::Remove {
            path: p(&["nodes".into(), 0.into()]),
            old_value: json!(1),
        };
        assert_eq!(
            serde_json::to_value(&d).unwrap(),
            json!({ "type": "REMOVE", "path": ["nodes", 0], "oldValue": 1 })
        );
    }

    #[test]
    fn state_diff_is_idempotent() {
        let state = FlowState::new(
            vec![Node::new("1", Point::new(1.0, 2.0))],
            vec![Edge::new("e1", "1", "1")],
            Metadata::default(),
        );
        assert!(diff_states(&state, &state).unwrap().is_empty());
    }

    #[test]
    fn applying_diff_reproduces_new_tree() {
        let old = json!({ "nodes": [{ "id": "a", "x": 1 }, { "id": "b" }], "meta": { "s": 1 } });
        let new = json!({ "nodes": [{ "id": "a", "x": 3, "y": 1 }], "meta": { "s": 2, "t": [1] } });
        let mut replay = old.clone();
        apply_differences(&mut replay, &diff(&old, &new));
        assert_eq!(replay, new);
    }
}
