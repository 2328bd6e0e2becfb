use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to parse as JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to parse as YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// A query expression could not be compiled or evaluated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("query `{expression}` failed: {message}")]
pub struct QueryError {
    pub expression: String,
    pub message: String,
}

impl QueryError {
    pub fn new(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            message: message.into(),
        }
    }
}
