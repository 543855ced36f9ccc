//! Admin API client service
//!
//! REST implementation of [`AdminBackend`]. Responses are decoded into the
//! strict model types; a body that does not match is a
//! [`ConsoleError::Schema`] rather than a silently defaulted value.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::ApiConfig;
use crate::models::{
    ApiAssignment, AppClient, CreateApiAssignmentRequest, CreateClientRequest,
    CreateClientResponse, CreateMacroDefRequest, CreateVersionRequest, Datasource, DebugOutcome,
    DebugRequest, Group, MacroDef, Module, OneTimeSecret, PublishRequest, RegenerateSecretResponse,
    Role, TokenRequest, TokenResponse, UpdateApiAssignmentRequest, UpdateClientRequest,
    UpdateMacroDefRequest, VersionCommit, VersionedEntity, VersionedKind,
};
use crate::services::backend::AdminBackend;
use crate::utils::{ConsoleError, ConsoleResult};

/// Path layout of the versioned resources
struct Routes;

impl Routes {
    fn collection(kind: VersionedKind) -> &'static str {
        match kind {
            VersionedKind::ApiAssignment => "api-assignments",
            VersionedKind::MacroDef => "macro-defs",
        }
    }

    fn entity(kind: VersionedKind, id: &str) -> String {
        format!("{}/{}", Self::collection(kind), urlencoding::encode(id))
    }

    fn versions(kind: VersionedKind, entity_id: &str) -> String {
        format!("{}/versions", Self::entity(kind, entity_id))
    }

    /// API versions live at the top level, macro versions under `macro-defs/`
    fn version(kind: VersionedKind, version_id: &str) -> String {
        match kind {
            VersionedKind::ApiAssignment => format!("versions/{}", urlencoding::encode(version_id)),
            VersionedKind::MacroDef => {
                format!("macro-defs/versions/{}", urlencoding::encode(version_id))
            }
        }
    }

    fn restore(kind: VersionedKind, entity_id: &str, version_id: &str) -> String {
        format!(
            "{}/{}/restore",
            Self::versions(kind, entity_id),
            urlencoding::encode(version_id)
        )
    }

    fn revert(kind: VersionedKind, version_id: &str) -> String {
        format!("{}/revert-to-draft", Self::version(kind, version_id))
    }

    fn publish(kind: VersionedKind, entity_id: &str) -> String {
        format!("{}/publish", Self::entity(kind, entity_id))
    }

    fn unpublish(kind: VersionedKind, entity_id: &str) -> String {
        format!("{}/unpublish", Self::entity(kind, entity_id))
    }
}

/// Pull the operator-facing message out of an error body.
///
/// Looks at `error`, `detail` (string or a list of `{msg}` items) and
/// `message`, falling back to the raw body, then to the status reason.
pub fn extract_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        for key in ["error", "detail", "message"] {
            match json.get(key) {
                Some(Value::String(s)) if !s.is_empty() => return s.clone(),
                Some(Value::Array(items)) if !items.is_empty() => {
                    let joined = items
                        .iter()
                        .filter_map(|item| {
                            item.get("msg")
                                .and_then(Value::as_str)
                                .map(String::from)
                                .or_else(|| item.as_str().map(String::from))
                        })
                        .collect::<Vec<_>>()
                        .join("; ");
                    if !joined.is_empty() {
                        return joined;
                    }
                }
                _ => {}
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string()
    } else {
        trimmed.to_string()
    }
}

/// Admin API client
#[derive(Clone)]
pub struct AdminHttpClient {
    client: Client,
    base_url: String,
    access_token: Option<String>,
    debug_timeout: Duration,
}

impl AdminHttpClient {
    /// Create a new admin API client
    pub fn new(config: &ApiConfig) -> ConsoleResult<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConsoleError::Config(format!(
                "URL must start with http:// or https://, got: {}",
                base_url
            )));
        }

        let mut builder = Client::builder().timeout(config.timeout());

        if !config.ssl_verify {
            warn!("SSL certificate verification is DISABLED - this is insecure!");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| ConsoleError::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!("Admin API client initialized for {}", base_url);

        Ok(Self {
            client,
            base_url,
            access_token: config.access_token.clone(),
            debug_timeout: config.debug_timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Override the timeout applied to debug executions
    pub fn with_debug_timeout(mut self, timeout: Duration) -> Self {
        self.debug_timeout = timeout;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url(path);
        debug!("Admin API request: {} {}", method, url);
        let builder = self.client.request(method, url);
        match self.access_token {
            Some(ref token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ConsoleResult<T> {
        self.send(self.request(Method::GET, path)).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ConsoleResult<T> {
        self.send(self.request(Method::POST, path).json(body)).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ConsoleResult<T> {
        self.send(self.request(Method::POST, path)).await
    }

    async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ConsoleResult<T> {
        self.send(self.request(Method::PUT, path).json(body)).await
    }

    async fn delete(&self, path: &str) -> ConsoleResult<()> {
        let response = self.request(Method::DELETE, path).send().await?;
        Self::check_status(response).await.map(|_| ())
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ConsoleResult<T> {
        let response = builder.send().await?;
        Self::handle_response(response).await
    }

    /// Turn a non-success status into [`ConsoleError::Api`] with the server's message
    async fn check_status(response: Response) -> ConsoleResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(status, &body);
        if status.is_server_error() {
            error!(status = status.as_u16(), %message, "Admin API server error");
        } else {
            debug!(status = status.as_u16(), %message, "Admin API rejected request");
        }

        if status == StatusCode::NOT_FOUND {
            return Err(ConsoleError::NotFound(message));
        }
        Err(ConsoleError::api(status.as_u16(), message))
    }

    async fn handle_response<T: DeserializeOwned>(response: Response) -> ConsoleResult<T> {
        let response = Self::check_status(response).await?;
        let body = response.text().await?;
        // 204 and empty bodies decode as JSON null
        let body = if body.trim().is_empty() { "null" } else { body.as_str() };
        serde_json::from_str(body).map_err(ConsoleError::from)
    }

    fn versioned(kind: VersionedKind, value: Value) -> ConsoleResult<VersionedEntity> {
        match kind {
            VersionedKind::ApiAssignment => Ok(VersionedEntity::Api(serde_json::from_value(value)?)),
            VersionedKind::MacroDef => Ok(VersionedEntity::Macro(serde_json::from_value(value)?)),
        }
    }
}

#[async_trait]
impl AdminBackend for AdminHttpClient {
    // ==================== API Assignments ====================

    async fn list_api_assignments(&self) -> ConsoleResult<Vec<ApiAssignment>> {
        self.get("api-assignments").await
    }

    async fn get_api_assignment(&self, id: &str) -> ConsoleResult<ApiAssignment> {
        self.get(&Routes::entity(VersionedKind::ApiAssignment, id)).await
    }

    async fn create_api_assignment(
        &self,
        request: &CreateApiAssignmentRequest,
    ) -> ConsoleResult<ApiAssignment> {
        self.post("api-assignments", request).await
    }

    async fn update_api_assignment(
        &self,
        id: &str,
        request: &UpdateApiAssignmentRequest,
    ) -> ConsoleResult<ApiAssignment> {
        self.put(&Routes::entity(VersionedKind::ApiAssignment, id), request)
            .await
    }

    async fn delete_api_assignment(&self, id: &str) -> ConsoleResult<()> {
        self.delete(&Routes::entity(VersionedKind::ApiAssignment, id))
            .await
    }

    async fn debug_api(&self, id: &str, request: &DebugRequest) -> ConsoleResult<DebugOutcome> {
        let path = format!("{}/debug", Routes::entity(VersionedKind::ApiAssignment, id));
        let builder = self
            .request(Method::POST, &path)
            .timeout(self.debug_timeout)
            .json(request);

        let value: Value = self.send(builder).await.map_err(|e| match e {
            ConsoleError::Timeout(_) => ConsoleError::Timeout(format!(
                "Debug request exceeded {}s",
                self.debug_timeout.as_secs_f64()
            )),
            other => other,
        })?;
        Ok(DebugOutcome::from_value(value))
    }

    // ==================== Versions ====================

    async fn list_versions(
        &self,
        kind: VersionedKind,
        entity_id: &str,
    ) -> ConsoleResult<Vec<VersionCommit>> {
        self.get(&Routes::versions(kind, entity_id)).await
    }

    async fn get_version(
        &self,
        kind: VersionedKind,
        version_id: &str,
    ) -> ConsoleResult<VersionCommit> {
        self.get(&Routes::version(kind, version_id)).await
    }

    async fn create_version(
        &self,
        kind: VersionedKind,
        entity_id: &str,
        request: &CreateVersionRequest,
    ) -> ConsoleResult<VersionCommit> {
        self.post(&Routes::versions(kind, entity_id), request).await
    }

    async fn delete_version(&self, kind: VersionedKind, version_id: &str) -> ConsoleResult<()> {
        self.delete(&Routes::version(kind, version_id)).await
    }

    async fn restore_version(
        &self,
        kind: VersionedKind,
        entity_id: &str,
        version_id: &str,
    ) -> ConsoleResult<VersionedEntity> {
        let value: Value = self
            .post_empty(&Routes::restore(kind, entity_id, version_id))
            .await?;
        Self::versioned(kind, value)
    }

    async fn publish(
        &self,
        kind: VersionedKind,
        entity_id: &str,
        version_id: &str,
    ) -> ConsoleResult<VersionedEntity> {
        let body = PublishRequest {
            version_id: version_id.to_string(),
        };
        let value: Value = self.post(&Routes::publish(kind, entity_id), &body).await?;
        Self::versioned(kind, value)
    }

    async fn unpublish(
        &self,
        kind: VersionedKind,
        entity_id: &str,
    ) -> ConsoleResult<VersionedEntity> {
        let value: Value = self.post_empty(&Routes::unpublish(kind, entity_id)).await?;
        Self::versioned(kind, value)
    }

    async fn revert_version_to_draft(
        &self,
        kind: VersionedKind,
        version_id: &str,
    ) -> ConsoleResult<()> {
        let response = self
            .request(Method::POST, &Routes::revert(kind, version_id))
            .send()
            .await?;
        Self::check_status(response).await.map(|_| ())
    }

    // ==================== Macro Definitions ====================

    async fn list_macro_defs(&self) -> ConsoleResult<Vec<MacroDef>> {
        self.get("macro-defs").await
    }

    async fn get_macro_def(&self, id: &str) -> ConsoleResult<MacroDef> {
        self.get(&Routes::entity(VersionedKind::MacroDef, id)).await
    }

    async fn create_macro_def(&self, request: &CreateMacroDefRequest) -> ConsoleResult<MacroDef> {
        self.post("macro-defs", request).await
    }

    async fn update_macro_def(
        &self,
        id: &str,
        request: &UpdateMacroDefRequest,
    ) -> ConsoleResult<MacroDef> {
        self.put(&Routes::entity(VersionedKind::MacroDef, id), request)
            .await
    }

    async fn delete_macro_def(&self, id: &str) -> ConsoleResult<()> {
        self.delete(&Routes::entity(VersionedKind::MacroDef, id)).await
    }

    // ==================== Clients ====================

    async fn list_clients(&self) -> ConsoleResult<Vec<AppClient>> {
        self.get("clients").await
    }

    async fn get_client(&self, id: &str) -> ConsoleResult<AppClient> {
        self.get(&format!("clients/{}", urlencoding::encode(id))).await
    }

    async fn create_client(
        &self,
        request: &CreateClientRequest,
    ) -> ConsoleResult<CreateClientResponse> {
        self.post("clients", request).await
    }

    async fn update_client(
        &self,
        id: &str,
        request: &UpdateClientRequest,
    ) -> ConsoleResult<AppClient> {
        self.put(&format!("clients/{}", urlencoding::encode(id)), request)
            .await
    }

    async fn delete_client(&self, id: &str) -> ConsoleResult<()> {
        self.delete(&format!("clients/{}", urlencoding::encode(id)))
            .await
    }

    async fn regenerate_secret(&self, id: &str) -> ConsoleResult<OneTimeSecret> {
        let response: RegenerateSecretResponse = self
            .post_empty(&format!(
                "clients/{}/regenerate-secret",
                urlencoding::encode(id)
            ))
            .await?;
        info!(client = %id, "Client secret regenerated");
        Ok(response.client_secret)
    }

    async fn generate_token(&self, request: &TokenRequest) -> ConsoleResult<TokenResponse> {
        self.post("token/generate", request).await
    }

    // ==================== Reference data ====================

    async fn list_groups(&self) -> ConsoleResult<Vec<Group>> {
        self.get("groups").await
    }

    async fn list_roles(&self) -> ConsoleResult<Vec<Role>> {
        self.get("roles").await
    }

    async fn list_modules(&self) -> ConsoleResult<Vec<Module>> {
        self.get("modules").await
    }

    async fn list_datasources(&self) -> ConsoleResult<Vec<Datasource>> {
        self.get("datasources").await
    }
}
