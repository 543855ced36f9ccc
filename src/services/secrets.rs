//! Client credential issuance
//!
//! Secrets come back from the backend exactly once, wrapped in a
//! [`OneTimeSecret`]. This service hands that value straight to the caller
//! and never stores, caches or logs it.

use std::sync::Arc;

use tracing::info;
use validator::Validate;

use super::backend::AdminBackend;
use super::capabilities::Capabilities;
use crate::models::{
    Action, AppClient, CreateClientRequest, CreateClientResponse, OneTimeSecret, Resource,
    TokenRequest, TokenResponse, UpdateClientRequest,
};
use crate::utils::{ConsoleError, ConsoleResult};

#[derive(Clone)]
pub struct CredentialService {
    backend: Arc<dyn AdminBackend>,
    capabilities: Arc<dyn Capabilities>,
}

impl CredentialService {
    pub fn new(backend: Arc<dyn AdminBackend>, capabilities: Arc<dyn Capabilities>) -> Self {
        Self {
            backend,
            capabilities,
        }
    }

    pub async fn list_clients(&self) -> ConsoleResult<Vec<AppClient>> {
        self.capabilities.require(Resource::Clients, Action::Read)?;
        self.backend.list_clients().await
    }

    /// Client metadata; never includes the secret
    pub async fn get_client(&self, id: &str) -> ConsoleResult<AppClient> {
        self.capabilities.require(Resource::Clients, Action::Read)?;
        self.backend.get_client(id).await
    }

    /// Create a client; the response carries its initial secret
    pub async fn create_client(
        &self,
        request: &CreateClientRequest,
    ) -> ConsoleResult<CreateClientResponse> {
        self.capabilities.require(Resource::Clients, Action::Create)?;
        request.validate()?;

        let created = self.backend.create_client(request).await?;
        info!("Created client {}", created.client.client_id);
        Ok(created)
    }

    pub async fn update_client(
        &self,
        id: &str,
        request: &UpdateClientRequest,
    ) -> ConsoleResult<AppClient> {
        self.capabilities.require(Resource::Clients, Action::Update)?;
        self.backend.update_client(id, request).await
    }

    pub async fn delete_client(&self, id: &str) -> ConsoleResult<()> {
        self.capabilities.require(Resource::Clients, Action::Delete)?;
        self.backend.delete_client(id).await?;
        info!("Deleted client {}", id);
        Ok(())
    }

    /// Issue a new secret. The previous secret stops working.
    pub async fn regenerate_secret(&self, id: &str) -> ConsoleResult<OneTimeSecret> {
        self.capabilities.require(Resource::Clients, Action::Update)?;

        let secret = self.backend.regenerate_secret(id).await?;
        if secret.is_empty() {
            return Err(ConsoleError::Schema(
                "regenerate-secret response carried an empty secret".to_string(),
            ));
        }
        info!("Regenerated secret for client {}", id);
        Ok(secret)
    }

    /// Exchange client credentials for a gateway access token
    pub async fn generate_token(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> ConsoleResult<TokenResponse> {
        if client_id.trim().is_empty() || client_secret.is_empty() {
            return Err(ConsoleError::validation(
                "Client id and secret are required to generate a token",
            ));
        }
        self.backend
            .generate_token(&TokenRequest::client_credentials(client_id, client_secret))
            .await
    }
}
