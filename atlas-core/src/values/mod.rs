//! The dynamic value model shared by every context, operation field and query result.

pub use serde_json::Value;

use serde_json::Map;

/// Deep-merges two values.
///
/// Two maps combine into their key union: `b`'s keys in `b`'s order, then the keys only `a`
/// defines, with shared keys merged recursively. For any other pair of shapes `a` wins, except
/// that a `null` left operand yields to a map on the right.
pub fn merge(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Object(left), Value::Object(right)) => {
            let mut out = Map::with_capacity(left.len().max(right.len()));
            for (key, right_value) in right {
                let merged = match left.get(key) {
                    Some(left_value) => merge(left_value, right_value),
                    None => right_value.clone(),
                };
                out.insert(key.clone(), merged);
            }
            for (key, left_value) in left {
                if !right.contains_key(key) {
                    out.insert(key.clone(), left_value.clone());
                }
            }
            Value::Object(out)
        }
        (Value::Null, Value::Object(_)) => b.clone(),
        _ => a.clone(),
    }
}

/// Condition truthiness: `null`, `false`, `""`, `[]` and `{}` are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(_) => true,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Renders a value as text. `null` has no text.
pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}
