//! Deep merge for configuration trees.
//!
//! Responsibilities:
//! - Merge two trees with the layering rules: objects merge key-wise,
//!   arrays replace, scalars replace.
//!
//! Does NOT handle:
//! - Placeholder substitution or any other value rewriting.
//!
//! Invariants:
//! - Every output is freshly allocated; callers may mutate results without
//!   aliasing either input.
//! - Result key order is base-first, then new keys in the order `next`
//!   introduces them.

use serde_json::Value;

/// Merge `next` over `base`.
///
/// An absent `next` clones `base`. Two objects merge recursively; any other
/// pairing — including two arrays — resolves to a clone of `next`.
pub fn merge(base: &Value, next: Option<&Value>) -> Value {
    match next {
        None => base.clone(),
        Some(next) => deep_merge(base, next),
    }
}

fn deep_merge(base: &Value, next: &Value) -> Value {
    match (base, next) {
        (Value::Object(base_tree), Value::Object(next_tree)) => {
            let mut out = base_tree.clone();
            for (key, next_value) in next_tree {
                let merged = match base_tree.get(key) {
                    Some(base_value) => deep_merge(base_value, next_value),
                    None => next_value.clone(),
                };
                out.insert(key.clone(), merged);
            }
            Value::Object(out)
        }
        _ => next.clone(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn absent_next_clones_base() {
        let base = json!({"a": 1, "b": {"c": 2}});
        assert_eq!(merge(&base, None), base);
    }

    #[test]
    fn objects_merge_key_wise() {
        let base = json!({"a": 1, "b": {"x": 1, "y": 2}});
        let next = json!({"b": {"y": 3, "z": 4}, "c": 5});
        assert_eq!(
            merge(&base, Some(&next)),
            json!({"a": 1, "b": {"x": 1, "y": 3, "z": 4}, "c": 5})
        );
    }

    #[test]
    fn arrays_replace_instead_of_concatenating() {
        let base = json!({"list": [1, 2, 3]});
        let next = json!({"list": [4]});
        assert_eq!(merge(&base, Some(&next)), json!({"list": [4]}));
    }

    #[test]
    fn scalars_and_mismatched_shapes_replace() {
        assert_eq!(merge(&json!(1), Some(&json!("two"))), json!("two"));
        assert_eq!(merge(&json!({"a": 1}), Some(&json!(null))), json!(null));
        assert_eq!(merge(&json!([1]), Some(&json!({"a": 1}))), json!({"a": 1}));
        assert_eq!(merge(&json!({"a": {"b": 1}}), Some(&json!({"a": 7}))), json!({"a": 7}));
    }

    #[test]
    fn null_values_replace_rather_than_delete() {
        let base = json!({"a": 1, "b": 2});
        let next = json!({"b": null});
        assert_eq!(merge(&base, Some(&next)), json!({"a": 1, "b": null}));
    }

    #[test]
    fn result_keys_keep_base_order_then_next_order() {
        let base = json!({"b": 1, "a": 2});
        let next = json!({"d": 3, "a": 4, "c": 5});
        let merged = merge(&base, Some(&next));

        let keys: Vec<&String> = merged.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["b", "a", "d", "c"]);
    }

    #[test]
    fn outputs_do_not_alias_inputs() {
        let base = json!({"nested": {"k": 1}});
        let next = json!({"other": {"m": 2}});
        let mut merged = merge(&base, Some(&next));

        merged["nested"]["k"] = json!(99);
        merged["other"]["m"] = json!(99);

        assert_eq!(base["nested"]["k"], json!(1));
        assert_eq!(next["other"]["m"], json!(2));
    }
}
