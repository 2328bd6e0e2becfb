mod audit;
mod auth;
mod context;
mod engine;
mod error;
mod http;
mod request;
mod types;

pub use audit::{file_name as audit_file_name, AuditLog, LogRecord, OperationSummary};
pub use auth::{
    AuthError, EnvTokenProvider, TokenProvider, TokenRequest, DEFAULT_CLIENT, DEFAULT_RESOURCE,
    DEFAULT_TENANT, DEFAULT_TOKEN_VARIABLE,
};
pub use context::{ExecutionContext, OperationContext};
pub use engine::WorkflowEngine;
pub use error::{OperationError, RequestError, WorkflowError};
pub use http::{HttpClient, HttpError, HttpRequestParts, HttpResponseParts, ReqwestHttpClient};
pub use request::{build_request_parts, response_to_value};
pub use types::EngineConfig;
