//! Application client (credential principal) models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A client allowed to call gateway APIs.
///
/// Carries no secret. The plaintext is only ever carried by a
/// [`OneTimeSecret`] in a create or regenerate response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppClient {
    pub id: String,
    pub client_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Requests per minute
    #[serde(default)]
    pub rate_limit: Option<u32>,
    #[serde(default)]
    pub max_concurrent: Option<u32>,
    #[serde(default)]
    pub group_ids: Vec<String>,
    /// APIs granted directly, outside any group
    #[serde(default)]
    pub api_assignment_ids: Vec<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

/// A plaintext client secret that can be read exactly once.
///
/// Not `Clone`, not `Serialize`, and redacted in `Debug`/`Display`, so it
/// cannot be cached or logged by accident. [`OneTimeSecret::reveal`]
/// consumes it.
#[derive(Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct OneTimeSecret(String);

impl OneTimeSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Take the plaintext; the secret is gone afterwards
    pub fn reveal(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for OneTimeSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("OneTimeSecret(<redacted>)")
    }
}

impl std::fmt::Display for OneTimeSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<redacted>")
    }
}

/// Response of `POST /clients/{id}/regenerate-secret`
#[derive(Debug, Deserialize)]
pub struct RegenerateSecretResponse {
    pub client_secret: OneTimeSecret,
}

/// Response of `POST /clients`
#[derive(Debug, Deserialize)]
pub struct CreateClientResponse {
    #[serde(flatten)]
    pub client: AppClient,
    /// Plaintext secret (only returned on creation)
    pub client_secret: OneTimeSecret,
}

/// Request to create a client
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateClientRequest {
    #[validate(custom(function = "crate::utils::validation::client_id"))]
    pub client_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1))]
    pub rate_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1))]
    pub max_concurrent: Option<u32>,
    #[serde(default)]
    pub group_ids: Vec<String>,
    #[serde(default)]
    pub api_assignment_ids: Vec<String>,
}

impl CreateClientRequest {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            name: None,
            description: None,
            rate_limit: None,
            max_concurrent: None,
            group_ids: vec![],
            api_assignment_ids: vec![],
        }
    }
}

/// Request to update a client
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateClientRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrent: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_assignment_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Client-credentials grant body for `POST /token/generate`
#[derive(Serialize)]
pub struct TokenRequest {
    pub client_id: String,
    pub client_secret: String,
    pub grant_type: String,
}

impl TokenRequest {
    pub fn client_credentials(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            grant_type: "client_credentials".to_string(),
        }
    }
}

impl std::fmt::Debug for TokenRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRequest")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("grant_type", &self.grant_type)
            .finish()
    }
}

/// Access token issued for a client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}
