use atlas_core::{QueryError, Value};
use serde_json::json;

use crate::blueprint::BlueprintError;
use crate::executor::auth::AuthError;
use crate::executor::http::HttpError;
use crate::templates::TemplateError;
use crate::values::ValuesError;

/// A request completed with a status of 400 or above.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{method} {url} failed with status {status}")]
pub struct RequestError {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub request: Value,
    pub response: Value,
}

/// Raised by an operation's `throw`.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct OperationError {
    pub message: String,
    pub details: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Values(ValuesError),
    #[error(transparent)]
    Request(Box<RequestError>),
    #[error(transparent)]
    Operation(#[from] OperationError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Blueprint(#[from] BlueprintError),
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<ValuesError> for WorkflowError {
    fn from(e: ValuesError) -> Self {
        match e {
            ValuesError::Query(q) => WorkflowError::Query(q),
            other => WorkflowError::Values(other),
        }
    }
}

impl From<RequestError> for WorkflowError {
    fn from(e: RequestError) -> Self {
        WorkflowError::Request(Box::new(e))
    }
}

impl WorkflowError {
    /// Structural values errors are authoring defects and bypass every `catch`.
    pub fn is_catchable(&self) -> bool {
        !matches!(
            self,
            WorkflowError::Values(_)
                | WorkflowError::Blueprint(BlueprintError::Values(
                    ValuesError::ForeachSizeMismatch { .. } | ValuesError::NoArrays
                ))
        )
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            WorkflowError::Query(_) => "QueryError",
            WorkflowError::Values(ValuesError::ForeachSizeMismatch { .. }) => "ForeachSizeMismatch",
            WorkflowError::Values(_) => "NoArraysError",
            WorkflowError::Request(_) => "RequestError",
            WorkflowError::Operation(_) => "OperationError",
            WorkflowError::Template(_) => "TemplateError",
            WorkflowError::Blueprint(_) => "BlueprintError",
            WorkflowError::Http(_) => "HttpError",
            WorkflowError::Auth(_) => "AuthError",
            WorkflowError::InvalidRequest(_) => "InvalidRequestError",
        }
    }

    pub fn details(&self) -> Value {
        match self {
            WorkflowError::Operation(e) => e.details.clone(),
            WorkflowError::Request(e) => json!({
                "request": e.request,
                "response": e.response,
            }),
            WorkflowError::Query(e) => json!({ "expression": e.expression }),
            _ => Value::Null,
        }
    }

    /// `{message, details, type: {name, fullName}}` as seen by `catch` expressions.
    pub fn to_value(&self) -> Value {
        let name = self.type_name();
        json!({
            "message": self.to_string(),
            "details": self.details(),
            "type": {
                "name": name,
                "fullName": format!("atlas::{name}"),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_errors_are_not_catchable() {
        let e = WorkflowError::from(ValuesError::NoArrays);
        assert!(!e.is_catchable());
        let e = WorkflowError::from(ValuesError::Query(QueryError::new("(x", "bad")));
        assert!(matches!(e, WorkflowError::Query(_)));
        assert!(e.is_catchable());
    }

    #[test]
    fn operation_errors_expose_details() {
        let e = WorkflowError::from(OperationError {
            message: "boom".into(),
            details: json!({"code": 7}),
        });
        let v = e.to_value();
        assert_eq!(v["message"], json!("boom"));
        assert_eq!(v["details"]["code"], json!(7));
        assert_eq!(v["type"]["name"], json!("OperationError"));
    }
}
