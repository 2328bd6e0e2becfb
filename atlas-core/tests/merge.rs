use atlas_core::merge;
use serde_json::json;

#[test]
fn maps_merge_into_key_union() {
    let a = json!({"x": 1, "shared": {"a": 1}});
    let b = json!({"y": 2, "shared": {"b": 2}});
    let merged = merge(&a, &b);
    assert_eq!(merged, json!({"y": 2, "shared": {"b": 2, "a": 1}, "x": 1}));
}

#[test]
fn key_order_is_right_then_remaining_left() {
    let a = json!({"a": 1, "b": 1});
    let b = json!({"c": 2, "b": 2});
    let merged = merge(&a, &b);
    let keys: Vec<&str> = merged.as_object().unwrap().keys().map(|k| k.as_str()).collect();
    assert_eq!(keys, vec!["c", "b", "a"]);
}

#[test]
fn left_operand_wins_at_leaves() {
    assert_eq!(merge(&json!({"k": "left"}), &json!({"k": "right"})), json!({"k": "left"}));
    assert_eq!(merge(&json!([1]), &json!({"k": 1})), json!([1]));
    assert_eq!(merge(&json!({"k": 1}), &json!([1])), json!({"k": 1}));
    assert_eq!(merge(&json!("s"), &json!(null)), json!("s"));
}

#[test]
fn shared_keys_merge_recursively() {
    let a = json!({"k": {"deep": {"x": 1}}});
    let b = json!({"k": {"deep": {"y": 2}, "other": true}});
    let merged = merge(&a, &b);
    assert_eq!(merged["k"], merge(&a["k"], &b["k"]));
    assert_eq!(merged["k"]["deep"], json!({"y": 2, "x": 1}));
}

#[test]
fn null_left_yields_to_map_only() {
    assert_eq!(merge(&json!(null), &json!({"k": 1})), json!({"k": 1}));
    assert_eq!(merge(&json!(null), &json!(5)), json!(null));
    assert_eq!(merge(&json!(null), &json!(null)), json!(null));
}

#[test]
fn lists_are_not_concatenated() {
    assert_eq!(merge(&json!({"l": [1, 2]}), &json!({"l": [3]})), json!({"l": [1, 2]}));
}
