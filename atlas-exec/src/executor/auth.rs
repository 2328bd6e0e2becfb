use async_trait::async_trait;
use atlas_core::types::RequestAuth;

use crate::secrets::SecretValue;

pub const DEFAULT_TENANT: &str = "common";
pub const DEFAULT_RESOURCE: &str = "https://management.azure.com/";
pub const DEFAULT_CLIENT: &str = "04b07795-8ddb-461a-bbee-02f9e1bf7b46";
pub const DEFAULT_TOKEN_VARIABLE: &str = "ATLAS_TOKEN";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRequest {
    pub tenant: String,
    pub resource: String,
    pub client: String,
    pub interactive: bool,
}

impl TokenRequest {
    /// Fills unset `auth` fields with the well-known defaults.
    pub fn from_auth(auth: &RequestAuth, interactive: bool) -> Self {
        let pick = |field: &Option<String>, default: &str| {
            field
                .as_deref()
                .filter(|s| !s.is_empty())
                .unwrap_or(default)
                .to_string()
        };
        Self {
            tenant: pick(&auth.tenant, DEFAULT_TENANT),
            resource: pick(&auth.resource, DEFAULT_RESOURCE),
            client: pick(&auth.client, DEFAULT_CLIENT),
            interactive,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    #[error("no access token for tenant `{tenant}` and resource `{resource}` (set {variable})")]
    Unavailable {
        tenant: String,
        resource: String,
        variable: String,
    },
    #[error("token acquisition failed: {0}")]
    Other(String),
}

#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn acquire_token(&self, request: &TokenRequest) -> Result<SecretValue, AuthError>;
}

/// Reads a pre-acquired bearer token from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvTokenProvider {
    variable: String,
}

impl Default for EnvTokenProvider {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_VARIABLE)
    }
}

impl EnvTokenProvider {
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for EnvTokenProvider {
    async fn acquire_token(&self, request: &TokenRequest) -> Result<SecretValue, AuthError> {
        match std::env::var(&self.variable) {
            Ok(token) if !token.trim().is_empty() => {
                Ok(SecretValue::from_string(token.trim().to_string()))
            }
            _ => Err(AuthError::Unavailable {
                tenant: request.tenant.clone(),
                resource: request.resource.clone(),
                variable: self.variable.clone(),
            }),
        }
    }
}
