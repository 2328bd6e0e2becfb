use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use minijinja::{Environment, Error, ErrorKind, Value};

/// Filters shared by query expressions and templates.
pub fn register_filters(env: &mut Environment<'static>) {
    env.add_filter("tojson", filter_tojson);
    env.add_filter("b64encode", filter_b64encode);
    env.add_filter("b64decode", filter_b64decode);
}

fn filter_tojson(value: Value) -> Result<String, Error> {
    serde_json::to_string(&value).map_err(|e| Error::new(ErrorKind::InvalidOperation, e.to_string()))
}

fn filter_b64encode(value: String) -> String {
    BASE64.encode(value.as_bytes())
}

fn filter_b64decode(value: String) -> Result<String, Error> {
    let bytes = BASE64
        .decode(value.as_bytes())
        .map_err(|e| Error::new(ErrorKind::InvalidOperation, e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| Error::new(ErrorKind::InvalidOperation, e.to_string()))
}
