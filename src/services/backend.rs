//! The admin API contract
//!
//! [`AdminBackend`] is the seam between the console and whatever serves the
//! admin API. [`super::http_client::AdminHttpClient`] talks to the real
//! service over REST; [`super::memory::InMemoryBackend`] is a reference
//! implementation that enforces the server-side invariants locally.

use async_trait::async_trait;

use crate::models::{
    ApiAssignment, AppClient, CreateApiAssignmentRequest, CreateClientRequest,
    CreateClientResponse, CreateMacroDefRequest, CreateVersionRequest, Datasource, DebugOutcome,
    DebugRequest, Group, MacroDef, Module, OneTimeSecret, Role, TokenRequest, TokenResponse,
    UpdateApiAssignmentRequest, UpdateClientRequest, UpdateMacroDefRequest, VersionCommit,
    VersionedEntity, VersionedKind,
};
use crate::utils::ConsoleResult;

#[async_trait]
pub trait AdminBackend: Send + Sync {
    // ==================== API Assignments ====================

    async fn list_api_assignments(&self) -> ConsoleResult<Vec<ApiAssignment>>;

    async fn get_api_assignment(&self, id: &str) -> ConsoleResult<ApiAssignment>;

    async fn create_api_assignment(
        &self,
        request: &CreateApiAssignmentRequest,
    ) -> ConsoleResult<ApiAssignment>;

    async fn update_api_assignment(
        &self,
        id: &str,
        request: &UpdateApiAssignmentRequest,
    ) -> ConsoleResult<ApiAssignment>;

    async fn delete_api_assignment(&self, id: &str) -> ConsoleResult<()>;

    async fn debug_api(&self, id: &str, request: &DebugRequest) -> ConsoleResult<DebugOutcome>;

    // ==================== Versions (both kinds) ====================

    /// Fetch the parent entity of a version lifecycle
    async fn get_entity(&self, kind: VersionedKind, id: &str) -> ConsoleResult<VersionedEntity> {
        match kind {
            VersionedKind::ApiAssignment => self.get_api_assignment(id).await.map(VersionedEntity::Api),
            VersionedKind::MacroDef => self.get_macro_def(id).await.map(VersionedEntity::Macro),
        }
    }

    async fn list_versions(
        &self,
        kind: VersionedKind,
        entity_id: &str,
    ) -> ConsoleResult<Vec<VersionCommit>>;

    async fn get_version(&self, kind: VersionedKind, version_id: &str)
        -> ConsoleResult<VersionCommit>;

    async fn create_version(
        &self,
        kind: VersionedKind,
        entity_id: &str,
        request: &CreateVersionRequest,
    ) -> ConsoleResult<VersionCommit>;

    async fn delete_version(&self, kind: VersionedKind, version_id: &str) -> ConsoleResult<()>;

    async fn restore_version(
        &self,
        kind: VersionedKind,
        entity_id: &str,
        version_id: &str,
    ) -> ConsoleResult<VersionedEntity>;

    async fn publish(
        &self,
        kind: VersionedKind,
        entity_id: &str,
        version_id: &str,
    ) -> ConsoleResult<VersionedEntity>;

    async fn unpublish(&self, kind: VersionedKind, entity_id: &str)
        -> ConsoleResult<VersionedEntity>;

    async fn revert_version_to_draft(
        &self,
        kind: VersionedKind,
        version_id: &str,
    ) -> ConsoleResult<()>;

    // ==================== Macro Definitions ====================

    async fn list_macro_defs(&self) -> ConsoleResult<Vec<MacroDef>>;

    async fn get_macro_def(&self, id: &str) -> ConsoleResult<MacroDef>;

    async fn create_macro_def(&self, request: &CreateMacroDefRequest) -> ConsoleResult<MacroDef>;

    async fn update_macro_def(
        &self,
        id: &str,
        request: &UpdateMacroDefRequest,
    ) -> ConsoleResult<MacroDef>;

    async fn delete_macro_def(&self, id: &str) -> ConsoleResult<()>;

    // ==================== Clients ====================

    async fn list_clients(&self) -> ConsoleResult<Vec<AppClient>>;

    async fn get_client(&self, id: &str) -> ConsoleResult<AppClient>;

    async fn create_client(&self, request: &CreateClientRequest)
        -> ConsoleResult<CreateClientResponse>;

    async fn update_client(
        &self,
        id: &str,
        request: &UpdateClientRequest,
    ) -> ConsoleResult<AppClient>;

    async fn delete_client(&self, id: &str) -> ConsoleResult<()>;

    /// Issue a new secret; the previous one stops working
    async fn regenerate_secret(&self, id: &str) -> ConsoleResult<OneTimeSecret>;

    async fn generate_token(&self, request: &TokenRequest) -> ConsoleResult<TokenResponse>;

    // ==================== Reference data ====================

    async fn list_groups(&self) -> ConsoleResult<Vec<Group>>;

    async fn list_roles(&self) -> ConsoleResult<Vec<Role>>;

    async fn list_modules(&self) -> ConsoleResult<Vec<Module>>;

    async fn list_datasources(&self) -> ConsoleResult<Vec<Datasource>>;
}
