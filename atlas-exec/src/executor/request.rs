use atlas_core::{value_to_string, RequestInfo, Value};
use serde_json::json;

use crate::executor::error::WorkflowError;
use crate::executor::http::{HttpRequestParts, HttpResponseParts};
use crate::secrets::SecretValue;

/// Turns a rendered request into wire parts, attaching `token` as a bearer credential.
pub fn build_request_parts(
    info: &RequestInfo,
    token: Option<&SecretValue>,
) -> Result<HttpRequestParts, WorkflowError> {
    let url = url::Url::parse(&info.url)
        .map_err(|e| WorkflowError::InvalidRequest(format!("invalid url `{}`: {e}", info.url)))?;

    let mut headers = info
        .headers
        .iter()
        .filter_map(|(name, value)| value_to_string(value).map(|v| (name.clone(), v)))
        .collect::<std::collections::BTreeMap<_, _>>();

    let body = match &info.body {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(text)) => text.clone().into_bytes(),
        Some(other) => {
            if !headers.keys().any(|k| k.eq_ignore_ascii_case("content-type")) {
                headers.insert("Content-Type".to_string(), "application/json".to_string());
            }
            serde_json::to_vec(other).map_err(|e| {
                WorkflowError::InvalidRequest(format!("failed to serialize request body: {e}"))
            })?
        }
    };

    if let Some(token) = token {
        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", token.expose_str()),
        );
    }

    Ok(HttpRequestParts {
        method: info.method.to_ascii_uppercase(),
        url,
        headers,
        body,
    })
}

/// `{status, headers, body}`; the body is JSON when it parses, text otherwise, `null` when empty.
pub fn response_to_value(resp: &HttpResponseParts) -> Value {
    let body = if resp.body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&resp.body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&resp.body).into_owned()))
    };
    json!({
        "status": resp.status,
        "headers": resp.headers,
        "body": body,
    })
}

pub fn request_to_value(info: &RequestInfo) -> Value {
    serde_json::to_value(info).unwrap_or(Value::Null)
}
