#![forbid(unsafe_code)]

//! Document model, value merging and query evaluation for Atlas workflows.

pub mod error;
pub mod expressions;
pub mod parser;
pub mod types;
pub mod values;

pub use crate::error::{ParseError, QueryError};
pub use crate::expressions::{is_query, JinjaQueryEvaluator, QueryEvaluator};
pub use crate::parser::{parse_values_str, parse_workflow_str, DocumentFormat, ParsedWorkflow};
pub use crate::types::{Operation, RequestInfo, Workflow};
pub use crate::values::{is_truthy, merge, value_to_string, Value};
