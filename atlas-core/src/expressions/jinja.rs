use minijinja::{Environment, UndefinedBehavior};

use crate::error::QueryError;
use crate::expressions::{register_filters, QueryEvaluator};
use crate::values::Value;

/// Query evaluator backed by minijinja expressions.
///
/// Undefined names and attributes evaluate to `null` rather than failing, so a condition such as
/// `result.body.status == 'Succeeded'` is simply false before `result` exists.
pub struct JinjaQueryEvaluator {
    env: Environment<'static>,
}

impl Default for JinjaQueryEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl JinjaQueryEvaluator {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Chainable);
        register_filters(&mut env);
        Self { env }
    }
}

impl QueryEvaluator for JinjaQueryEvaluator {
    fn search(&self, expression: &str, value: &Value) -> Result<Value, QueryError> {
        let compiled = self
            .env
            .compile_expression(expression)
            .map_err(|e| QueryError::new(expression, e.to_string()))?;
        let result = compiled
            .eval(minijinja::Value::from_serialize(value))
            .map_err(|e| QueryError::new(expression, e.to_string()))?;
        serde_json::to_value(&result).map_err(|e| QueryError::new(expression, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn evaluates_paths_and_comparisons() {
        let q = JinjaQueryEvaluator::new();
        let ctx = json!({"error": {"message": "boom"}, "x1": 1});
        assert_eq!(q.search("(x1)", &ctx).unwrap(), json!(1));
        assert_eq!(q.search("error.message == 'boom'", &ctx).unwrap(), json!(true));
    }

    #[test]
    fn missing_paths_are_null() {
        let q = JinjaQueryEvaluator::new();
        assert_eq!(q.search("result.body.id", &json!({})).unwrap(), json!(null));
    }

    #[test]
    fn syntax_errors_carry_the_expression() {
        let q = JinjaQueryEvaluator::new();
        let err = q.search("x ==", &json!({})).unwrap_err();
        assert_eq!(err.expression, "x ==");
    }
}
