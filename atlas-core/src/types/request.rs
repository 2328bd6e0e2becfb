use std::collections::BTreeMap;

use crate::types::AnyValue;

/// The value a `request` template renders to.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RequestInfo {
    #[serde(default = "default_method")]
    pub method: String,

    pub url: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, AnyValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<AnyValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<RequestAuth>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl RequestInfo {
    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RequestAuth {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
}
