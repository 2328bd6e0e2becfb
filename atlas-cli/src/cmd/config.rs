use std::path::Path;
use std::time::Duration;

use atlas_core::{merge, parse_values_str, DocumentFormat, Value};
use atlas_exec::blueprint::BlueprintError;
use atlas_exec::{EngineConfig, SecretTracker};
use serde_json::Map;

use crate::exit_codes;
use crate::{HttpArgs, ValuesArgs};

/// Values from `-f` files, then `--set`, then `--secret`; each layer wins over the previous.
/// Secret values are registered with `secrets` before anything is printed.
pub fn load_values(args: &ValuesArgs, secrets: &SecretTracker) -> Result<Value, String> {
    let mut values = Value::Object(Map::new());
    for path in &args.values_files {
        values = merge(&read_values_file(path)?, &values);
    }
    for assignment in &args.set_values {
        let (key, value) = parse_assignment(assignment)?;
        values = merge(&nest(&key, value), &values);
    }
    for assignment in &args.secret_values {
        let (key, raw) = split_assignment(assignment)?;
        secrets.add_secret(raw);
        values = merge(&nest(key, Value::String(raw.to_string())), &values);
    }
    Ok(values)
}

fn read_values_file(path: &Path) -> Result<Value, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read values file {}: {e}", path.display()))?;
    parse_values_str(&content, DocumentFormat::Auto)
        .map_err(|e| format!("invalid values file {}: {e}", path.display()))
}

fn split_assignment(assignment: &str) -> Result<(&str, &str), String> {
    match assignment.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value)),
        _ => Err(format!("expected KEY=VALUE, got `{assignment}`")),
    }
}

/// `KEY=VALUE` where VALUE is read as a YAML scalar, falling back to plain text.
pub fn parse_assignment(assignment: &str) -> Result<(String, Value), String> {
    let (key, raw) = split_assignment(assignment)?;
    if raw.trim().is_empty() {
        return Ok((key.to_string(), Value::Null));
    }
    let value = match serde_yaml::from_str::<Value>(raw) {
        Ok(value @ (Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_))) => value,
        _ => Value::String(raw.to_string()),
    };
    Ok((key.to_string(), value))
}

/// `a.b.c` with `v` becomes `{a: {b: {c: v}}}`.
pub fn nest(key: &str, value: Value) -> Value {
    key.rsplit('.').fold(value, |inner, segment| {
        let mut map = Map::new();
        map.insert(segment.to_string(), inner);
        Value::Object(map)
    })
}

pub fn build_engine_config(http: &HttpArgs) -> EngineConfig {
    EngineConfig {
        request_timeout: Duration::from_millis(http.timeout),
        max_response_bytes: http.max_response_bytes,
    }
}

/// Missing or unreadable blueprints are runtime errors; anything that fails to render or
/// parse is a validation failure.
pub fn blueprint_exit_code(error: &BlueprintError) -> i32 {
    match error {
        BlueprintError::NotFound { .. } | BlueprintError::Read { .. } => exit_codes::RUNTIME_ERROR,
        _ => exit_codes::VALIDATION_FAILED,
    }
}
