mod operation;
mod request;
mod workflow;

pub use operation::{Catch, Foreach, Operation, Repeat, Throw};
pub use request::{RequestAuth, RequestInfo};
pub use workflow::Workflow;

pub type AnyValue = serde_json::Value;
