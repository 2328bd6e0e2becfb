use std::collections::HashSet;
use std::sync::Arc;

use atlas_core::{is_query, is_truthy, merge, value_to_string, QueryEvaluator, Value};
use serde_json::Map;

use crate::values::ValuesError;

/// Resolves `(expression)` markers inside value trees.
///
/// Every resolution runs against a set of input contexts. A single context is the common case;
/// several contexts are used to reassemble the results of foreach iterations.
#[derive(Clone)]
pub struct ValuesEngine {
    query: Arc<dyn QueryEvaluator>,
}

impl ValuesEngine {
    pub fn new(query: Arc<dyn QueryEvaluator>) -> Self {
        Self { query }
    }

    pub fn process_values(&self, source: &Value, context: &Value) -> Result<Value, ValuesError> {
        self.process_recursive(source, &[context], false)
    }

    /// Resolves `source` with array promotion, yielding one value set per foreach iteration.
    pub fn process_values_foreach_in(
        &self,
        source: &Value,
        context: &Value,
    ) -> Result<Vec<Value>, ValuesError> {
        match self.process_recursive(source, &[context], true)? {
            Value::Array(items) => Ok(items),
            _ => Err(ValuesError::NoArrays),
        }
    }

    pub fn process_values_foreach_out(
        &self,
        source: &Value,
        contexts: &[Value],
    ) -> Result<Value, ValuesError> {
        let contexts: Vec<&Value> = contexts.iter().collect();
        self.process_recursive(source, &contexts, false)
    }

    pub fn evaluate_to_string(
        &self,
        source: &Value,
        context: &Value,
    ) -> Result<Option<String>, ValuesError> {
        Ok(value_to_string(&self.process_values(source, context)?))
    }

    pub fn evaluate_to_boolean(&self, condition: &str, context: &Value) -> Result<bool, ValuesError> {
        Ok(is_truthy(&self.query.search(condition, context)?))
    }

    fn process_recursive(
        &self,
        source: &Value,
        contexts: &[&Value],
        promote_arrays: bool,
    ) -> Result<Value, ValuesError> {
        match source {
            Value::Object(map) => self.process_map(map, contexts, promote_arrays),
            Value::Array(items) => items
                .iter()
                .map(|item| self.process_recursive(item, contexts, false))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::String(text) if is_query(text) => self.evaluate_query(text, contexts),
            other => Ok(other.clone()),
        }
    }

    fn process_map(
        &self,
        map: &Map<String, Value>,
        contexts: &[&Value],
        promote_arrays: bool,
    ) -> Result<Value, ValuesError> {
        let mut out = Map::with_capacity(map.len());
        let mut promotion = Promotion::default();

        for (key, value) in map {
            if is_query(key) {
                for (computed_key, group) in self.group_by_key(key, contexts)? {
                    let child = self.process_recursive(value, &group, promote_arrays)?;
                    if promote_arrays {
                        promotion.observe(&computed_key, &child)?;
                    }
                    out.insert(computed_key, child);
                }
            } else {
                let child = self.process_recursive(value, contexts, promote_arrays)?;
                if promote_arrays {
                    promotion.observe(key, &child)?;
                }
                out.insert(key.clone(), child);
            }
        }

        match promotion.length {
            Some(length) => Ok(transpose(&out, &promotion.keys, length)),
            None => Ok(Value::Object(out)),
        }
    }

    /// Groups contexts by the text a dynamic key evaluates to, in first-seen order.
    /// Contexts where the key evaluates to `null` produce no property.
    fn group_by_key<'c>(
        &self,
        key: &str,
        contexts: &[&'c Value],
    ) -> Result<Vec<(String, Vec<&'c Value>)>, ValuesError> {
        let mut groups: Vec<(String, Vec<&'c Value>)> = Vec::new();
        for context in contexts {
            let Some(name) = value_to_string(&self.query.search(key, context)?) else {
                continue;
            };
            match groups.iter_mut().find(|(existing, _)| *existing == name) {
                Some((_, members)) => members.push(*context),
                None => groups.push((name, vec![*context])),
            }
        }
        Ok(groups)
    }

    fn evaluate_query(&self, expression: &str, contexts: &[&Value]) -> Result<Value, ValuesError> {
        let mut combined: Option<Value> = None;
        for context in contexts {
            let value = self.query.search(expression, context)?;
            combined = Some(match combined {
                None => value,
                Some(acc) => match (acc, value) {
                    (Value::Array(mut acc), Value::Array(items)) => {
                        acc.extend(items);
                        Value::Array(acc)
                    }
                    (acc, value) => merge(&value, &acc),
                },
            });
        }
        Ok(combined.unwrap_or(Value::Null))
    }
}

#[derive(Default)]
struct Promotion {
    keys: HashSet<String>,
    length: Option<usize>,
}

impl Promotion {
    fn observe(&mut self, key: &str, child: &Value) -> Result<(), ValuesError> {
        let Value::Array(items) = child else {
            return Ok(());
        };
        match self.length {
            Some(expected) if expected != items.len() => {
                return Err(ValuesError::ForeachSizeMismatch {
                    key: key.to_string(),
                    expected,
                    actual: items.len(),
                })
            }
            _ => self.length = Some(items.len()),
        }
        self.keys.insert(key.to_string());
        Ok(())
    }
}

/// Zips a map of parallel arrays into a list of maps; non-array entries repeat in every row.
fn transpose(map: &Map<String, Value>, promoted: &HashSet<String>, length: usize) -> Value {
    let rows = (0..length)
        .map(|index| {
            let row = map
                .iter()
                .map(|(key, value)| {
                    let cell = if promoted.contains(key) {
                        value.get(index).cloned().unwrap_or(Value::Null)
                    } else {
                        value.clone()
                    };
                    (key.clone(), cell)
                })
                .collect::<Map<String, Value>>();
            Value::Object(row)
        })
        .collect();
    Value::Array(rows)
}
