use serde::de::DeserializeOwned;

use crate::error::ParseError;
use crate::types::Workflow;
use crate::values::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
    Auto,
}

#[derive(Debug, Clone)]
pub struct ParsedWorkflow {
    pub workflow: Workflow,
    pub format: DocumentFormat,
}

pub fn parse_workflow_str(input: &str, format: DocumentFormat) -> Result<ParsedWorkflow, ParseError> {
    let (workflow, format) = parse_str::<Workflow>(input, format)?;
    Ok(ParsedWorkflow { workflow, format })
}

/// Parse a values document. Blank input is an empty document and yields `null`.
pub fn parse_values_str(input: &str, format: DocumentFormat) -> Result<Value, ParseError> {
    if input.trim().is_empty() {
        return Ok(Value::Null);
    }
    parse_str::<Value>(input, format).map(|(value, _)| value)
}

fn parse_str<T: DeserializeOwned>(
    input: &str,
    format: DocumentFormat,
) -> Result<(T, DocumentFormat), ParseError> {
    match format {
        DocumentFormat::Json => Ok((serde_json::from_str::<T>(input)?, format)),
        DocumentFormat::Yaml => Ok((serde_yaml::from_str::<T>(input)?, format)),
        DocumentFormat::Auto => parse_auto(input),
    }
}

fn parse_auto<T: DeserializeOwned>(input: &str) -> Result<(T, DocumentFormat), ParseError> {
    // JSON always starts with `{` or `[` after trimming; YAML is a superset, so it is the fallback.
    let trimmed = input.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return match serde_json::from_str::<T>(input) {
            Ok(doc) => Ok((doc, DocumentFormat::Json)),
            Err(e) => match serde_yaml::from_str::<T>(input) {
                Ok(doc) => Ok((doc, DocumentFormat::Yaml)),
                Err(_) => Err(ParseError::Json(e)),
            },
        };
    }

    match serde_yaml::from_str::<T>(input) {
        Ok(doc) => Ok((doc, DocumentFormat::Yaml)),
        Err(e) => {
            if let Ok(doc) = serde_json::from_str::<T>(input) {
                return Ok((doc, DocumentFormat::Json));
            }
            Err(ParseError::Yaml(e))
        }
    }
}
