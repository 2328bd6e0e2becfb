mod filters;
mod jinja;

pub use filters::register_filters;
pub use jinja::JinjaQueryEvaluator;

use crate::error::QueryError;
use crate::values::Value;

/// Evaluates a query expression against a value.
pub trait QueryEvaluator: Send + Sync {
    fn search(&self, expression: &str, value: &Value) -> Result<Value, QueryError>;
}

/// A string wrapped in parentheses is a query; anything else is a literal.
pub fn is_query(text: &str) -> bool {
    text.len() >= 2 && text.starts_with('(') && text.ends_with(')')
}

#[cfg(test)]
mod tests {
    use super::is_query;

    #[test]
    fn detects_parenthesized_queries() {
        assert!(is_query("(x1)"));
        assert!(is_query("(a) && (b)"));
        assert!(!is_query("("));
        assert!(!is_query("plain"));
        assert!(!is_query("(unclosed"));
    }
}
