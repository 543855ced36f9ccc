//! In-memory admin backend
//!
//! Keeps every entity behind one `RwLock` and applies the rules the admin
//! service applies: version numbers are monotonic per parent and never
//! reused, the version behind a publish pointer cannot be deleted, restore
//! only touches the draft, and client secrets are stored as argon2 hashes.
//! Rejections come back as `ConsoleError::Api` with the status the real
//! service uses, so callers see the same errors in both backends.

use std::collections::HashMap;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use base64::Engine;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use super::backend::AdminBackend;
use crate::models::{
    check_declarations, ApiAssignment, AppClient, CreateApiAssignmentRequest, CreateClientRequest,
    CreateClientResponse, CreateMacroDefRequest, CreateVersionRequest, Datasource, DebugOutcome,
    DebugRequest, DraftContent, Group, MacroDef, Module, OneTimeSecret, Role, SystemRole,
    TokenRequest, TokenResponse, UpdateApiAssignmentRequest, UpdateClientRequest,
    UpdateMacroDefRequest, VersionCommit, Versioned, VersionedEntity, VersionedKind,
};
use crate::utils::validation::validate_api_path;
use crate::utils::{ConsoleError, ConsoleResult};

/// Lifetime of issued access tokens
const TOKEN_TTL_SECS: u64 = 3600;

/// Claims carried by client access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientClaims {
    /// Client record id
    pub sub: String,
    pub client_id: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    /// APIs the client may call, directly or through its groups
    pub apis: Vec<String>,
}

struct StoredVersion {
    kind: VersionedKind,
    commit: VersionCommit,
}

struct StoredClient {
    client: AppClient,
    secret_hash: String,
}

#[derive(Default)]
struct Store {
    apis: Vec<ApiAssignment>,
    macros: Vec<MacroDef>,
    versions: Vec<StoredVersion>,
    /// Highest version number ever issued per parent
    counters: HashMap<(VersionedKind, String), u32>,
    clients: Vec<StoredClient>,
    groups: Vec<Group>,
    roles: Vec<Role>,
    modules: Vec<Module>,
    datasources: Vec<Datasource>,
}

impl Store {
    fn api(&self, id: &str) -> ConsoleResult<&ApiAssignment> {
        self.apis
            .iter()
            .find(|a| a.id == id)
            .ok_or_else(|| ConsoleError::not_found(format!("API assignment {} not found", id)))
    }

    fn api_mut(&mut self, id: &str) -> ConsoleResult<&mut ApiAssignment> {
        self.apis
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| ConsoleError::not_found(format!("API assignment {} not found", id)))
    }

    fn macro_def(&self, id: &str) -> ConsoleResult<&MacroDef> {
        self.macros
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| ConsoleError::not_found(format!("Macro definition {} not found", id)))
    }

    fn macro_mut(&mut self, id: &str) -> ConsoleResult<&mut MacroDef> {
        self.macros
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| ConsoleError::not_found(format!("Macro definition {} not found", id)))
    }

    fn entity(&self, kind: VersionedKind, id: &str) -> ConsoleResult<VersionedEntity> {
        match kind {
            VersionedKind::ApiAssignment => self.api(id).cloned().map(VersionedEntity::Api),
            VersionedKind::MacroDef => self.macro_def(id).cloned().map(VersionedEntity::Macro),
        }
    }

    fn draft(&self, kind: VersionedKind, id: &str) -> ConsoleResult<DraftContent> {
        match kind {
            VersionedKind::ApiAssignment => Ok(self.api(id)?.api_context.clone()),
            VersionedKind::MacroDef => Ok(DraftContent {
                content: self.macro_def(id)?.content.clone(),
                ..Default::default()
            }),
        }
    }

    fn version(&self, kind: VersionedKind, version_id: &str) -> ConsoleResult<&VersionCommit> {
        self.versions
            .iter()
            .find(|v| v.kind == kind && v.commit.id == version_id)
            .map(|v| &v.commit)
            .ok_or_else(|| ConsoleError::not_found(format!("Version {} not found", version_id)))
    }

    fn set_pointer(
        &mut self,
        kind: VersionedKind,
        id: &str,
        is_published: bool,
        pointer: Option<String>,
    ) -> ConsoleResult<VersionedEntity> {
        let now = Some(Utc::now());
        match kind {
            VersionedKind::ApiAssignment => {
                let api = self.api_mut(id)?;
                api.is_published = is_published;
                api.published_version_id = pointer;
                api.updated_at = now;
                Ok(VersionedEntity::Api(api.clone()))
            }
            VersionedKind::MacroDef => {
                let m = self.macro_mut(id)?;
                m.is_published = is_published;
                m.published_version_id = pointer;
                m.updated_at = now;
                Ok(VersionedEntity::Macro(m.clone()))
            }
        }
    }

    fn apply_draft(
        &mut self,
        kind: VersionedKind,
        id: &str,
        draft: DraftContent,
    ) -> ConsoleResult<VersionedEntity> {
        let now = Some(Utc::now());
        match kind {
            VersionedKind::ApiAssignment => {
                let api = self.api_mut(id)?;
                api.api_context = draft;
                api.updated_at = now;
                Ok(VersionedEntity::Api(api.clone()))
            }
            VersionedKind::MacroDef => {
                let m = self.macro_mut(id)?;
                m.content = draft.content;
                m.updated_at = now;
                Ok(VersionedEntity::Macro(m.clone()))
            }
        }
    }

    fn remove_versions_of(&mut self, kind: VersionedKind, id: &str) {
        self.versions
            .retain(|v| !(v.kind == kind && v.commit.entity_id == id));
    }

    fn module_exists(&self, module_id: &str) -> bool {
        self.modules.iter().any(|m| m.id == module_id)
    }

    fn client(&self, id: &str) -> ConsoleResult<&StoredClient> {
        self.clients
            .iter()
            .find(|c| c.client.id == id)
            .ok_or_else(|| ConsoleError::not_found(format!("Client {} not found", id)))
    }

    fn client_mut(&mut self, id: &str) -> ConsoleResult<&mut StoredClient> {
        self.clients
            .iter_mut()
            .find(|c| c.client.id == id)
            .ok_or_else(|| ConsoleError::not_found(format!("Client {} not found", id)))
    }

    /// APIs granted to a client directly and through its groups
    fn granted_apis(&self, client: &AppClient) -> Vec<String> {
        let mut apis = client.api_assignment_ids.clone();
        for group in self.groups.iter().filter(|g| client.group_ids.contains(&g.id)) {
            for api_id in &group.api_assignment_ids {
                if !apis.contains(api_id) {
                    apis.push(api_id.clone());
                }
            }
        }
        apis
    }
}

/// Admin backend held entirely in memory
pub struct InMemoryBackend {
    store: RwLock<Store>,
    signing_key: Vec<u8>,
    /// Received operation counts, one entry per operation name
    requests: Mutex<HashMap<&'static str, usize>>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    /// Create an empty backend holding the built-in roles
    pub fn new() -> Self {
        let mut signing_key = vec![0u8; 32];
        OsRng.fill_bytes(&mut signing_key);

        let store = Store {
            roles: SystemRole::all().iter().map(|r| r.to_role()).collect(),
            ..Default::default()
        };

        Self {
            store: RwLock::new(store),
            signing_key,
            requests: Mutex::new(HashMap::new()),
        }
    }

    pub async fn add_module(&self, module: Module) {
        self.store.write().await.modules.push(module);
    }

    pub async fn add_group(&self, group: Group) {
        self.store.write().await.groups.push(group);
    }

    pub async fn add_role(&self, role: Role) {
        self.store.write().await.roles.push(role);
    }

    pub async fn add_datasource(&self, datasource: Datasource) {
        self.store.write().await.datasources.push(datasource);
    }

    /// How many times `operation` was received
    pub async fn request_count(&self, operation: &str) -> usize {
        self.requests
            .lock()
            .await
            .get(operation)
            .copied()
            .unwrap_or(0)
    }

    /// Decode and check an access token issued by this backend
    pub fn verify_token(&self, token: &str) -> ConsoleResult<ClientClaims> {
        decode::<ClientClaims>(
            token,
            &DecodingKey::from_secret(&self.signing_key),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| ConsoleError::api(401, format!("Invalid token: {}", e)))
    }

    async fn record(&self, operation: &'static str) {
        debug!("In-memory backend: {}", operation);
        *self.requests.lock().await.entry(operation).or_insert(0) += 1;
    }

    fn generate_secret() -> String {
        let mut secret_bytes = [0u8; 32];
        OsRng.fill_bytes(&mut secret_bytes);
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(secret_bytes)
    }

    fn hash_secret(secret: &str) -> ConsoleResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ConsoleError::api(500, format!("Failed to hash secret: {}", e)))
    }

    fn verify_secret(secret: &str, hash: &str) -> bool {
        PasswordHash::new(hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(secret.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }
}

fn unprocessable(e: impl std::fmt::Display) -> ConsoleError {
    ConsoleError::api(422, e.to_string())
}

#[async_trait]
impl AdminBackend for InMemoryBackend {
    // ==================== API Assignments ====================

    async fn list_api_assignments(&self) -> ConsoleResult<Vec<ApiAssignment>> {
        self.record("list_api_assignments").await;
        Ok(self.store.read().await.apis.clone())
    }

    async fn get_api_assignment(&self, id: &str) -> ConsoleResult<ApiAssignment> {
        self.record("get_api_assignment").await;
        self.store.read().await.api(id).cloned()
    }

    async fn create_api_assignment(
        &self,
        request: &CreateApiAssignmentRequest,
    ) -> ConsoleResult<ApiAssignment> {
        self.record("create_api_assignment").await;
        request.validate().map_err(unprocessable)?;

        let mut store = self.store.write().await;
        if !store.module_exists(&request.module_id) {
            return Err(ConsoleError::api(
                400,
                format!("Module {} does not exist", request.module_id),
            ));
        }
        let duplicate = store.apis.iter().any(|a| {
            a.module_id == request.module_id
                && a.path == request.path
                && a.http_method == request.http_method
        });
        if duplicate {
            return Err(ConsoleError::api(
                409,
                format!(
                    "{} {} already exists in module {}",
                    request.http_method.as_str(),
                    request.path,
                    request.module_id
                ),
            ));
        }

        let now = Utc::now();
        let api = ApiAssignment {
            id: Uuid::new_v4().to_string(),
            module_id: request.module_id.clone(),
            path: request.path.clone(),
            http_method: request.http_method,
            execute_engine: request.execute_engine,
            datasource_id: request.datasource_id.clone(),
            access_type: request.access_type,
            rate_limit: request.rate_limit,
            description: request.description.clone(),
            published_version_id: None,
            is_published: false,
            api_context: DraftContent::default(),
            created_at: Some(now),
            updated_at: Some(now),
        };
        store.apis.push(api.clone());
        info!("Created API assignment {} ({})", api.id, api.path);
        Ok(api)
    }

    async fn update_api_assignment(
        &self,
        id: &str,
        request: &UpdateApiAssignmentRequest,
    ) -> ConsoleResult<ApiAssignment> {
        self.record("update_api_assignment").await;
        if let Some(ref path) = request.path {
            if !validate_api_path(path) {
                return Err(ConsoleError::api(422, format!("Invalid API path: {}", path)));
            }
        }
        if let Some(ref context) = request.api_context {
            check_declarations(&context.params).map_err(unprocessable)?;
        }

        let mut store = self.store.write().await;
        if let Some(ref module_id) = request.module_id {
            if !store.module_exists(module_id) {
                return Err(ConsoleError::api(
                    400,
                    format!("Module {} does not exist", module_id),
                ));
            }
        }

        let api = store.api_mut(id)?;
        if let Some(ref module_id) = request.module_id {
            api.module_id = module_id.clone();
        }
        if let Some(ref path) = request.path {
            api.path = path.clone();
        }
        if let Some(method) = request.http_method {
            api.http_method = method;
        }
        if let Some(engine) = request.execute_engine {
            api.execute_engine = engine;
        }
        if let Some(ref datasource_id) = request.datasource_id {
            api.datasource_id = Some(datasource_id.clone());
        }
        if let Some(access_type) = request.access_type {
            api.access_type = access_type;
        }
        if let Some(rate_limit) = request.rate_limit {
            api.rate_limit = Some(rate_limit);
        }
        if let Some(ref description) = request.description {
            api.description = Some(description.clone());
        }
        if let Some(ref context) = request.api_context {
            api.api_context = context.clone();
        }
        api.updated_at = Some(Utc::now());
        Ok(api.clone())
    }

    async fn delete_api_assignment(&self, id: &str) -> ConsoleResult<()> {
        self.record("delete_api_assignment").await;
        let mut store = self.store.write().await;
        store.api(id)?;
        store.apis.retain(|a| a.id != id);
        store.remove_versions_of(VersionedKind::ApiAssignment, id);
        info!("Deleted API assignment {}", id);
        Ok(())
    }

    async fn debug_api(&self, id: &str, request: &DebugRequest) -> ConsoleResult<DebugOutcome> {
        self.record("debug_api").await;
        let store = self.store.read().await;
        let api = store.api(id)?;

        let content = request
            .content
            .clone()
            .unwrap_or_else(|| api.api_context.content.clone());
        if content.trim().is_empty() {
            return Ok(DebugOutcome::Error("No content to execute".to_string()));
        }

        let missing = api
            .api_context
            .params
            .iter()
            .find(|p| p.is_required && p.default_value.is_none() && !request.params.contains_key(&p.name));
        if let Some(param) = missing {
            return Ok(DebugOutcome::Error(format!(
                "Missing required parameter: {}",
                param.name
            )));
        }

        Ok(DebugOutcome::Output(json!({
            "execute_engine": request.execute_engine.unwrap_or(api.execute_engine),
            "datasource_id": request.datasource_id.clone().or_else(|| api.datasource_id.clone()),
            "content": content,
            "params": request.params,
        })))
    }

    // ==================== Versions ====================

    async fn list_versions(
        &self,
        kind: VersionedKind,
        entity_id: &str,
    ) -> ConsoleResult<Vec<VersionCommit>> {
        self.record("list_versions").await;
        let store = self.store.read().await;
        store.entity(kind, entity_id)?;

        let mut versions: Vec<VersionCommit> = store
            .versions
            .iter()
            .filter(|v| v.kind == kind && v.commit.entity_id == entity_id)
            .map(|v| v.commit.summary())
            .collect();
        versions.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(versions)
    }

    async fn get_version(
        &self,
        kind: VersionedKind,
        version_id: &str,
    ) -> ConsoleResult<VersionCommit> {
        self.record("get_version").await;
        self.store.read().await.version(kind, version_id).cloned()
    }

    async fn create_version(
        &self,
        kind: VersionedKind,
        entity_id: &str,
        request: &CreateVersionRequest,
    ) -> ConsoleResult<VersionCommit> {
        self.record("create_version").await;
        let mut store = self.store.write().await;
        let draft = store.draft(kind, entity_id)?;
        if draft.is_empty() {
            return Err(ConsoleError::api(
                400,
                "Cannot create a version from empty content",
            ));
        }

        let counter = store
            .counters
            .entry((kind, entity_id.to_string()))
            .or_insert(0);
        *counter += 1;
        let version = *counter;

        let commit = VersionCommit {
            id: Uuid::new_v4().to_string(),
            entity_id: entity_id.to_string(),
            version,
            commit_message: request.commit_message.clone(),
            content_snapshot: Some(draft.content),
            params_snapshot: Some(draft.params),
            param_validates_snapshot: Some(draft.param_validates),
            result_transform_snapshot: draft.result_transform,
            committed_by: None,
            committed_at: Utc::now(),
        };
        store.versions.push(StoredVersion {
            kind,
            commit: commit.clone(),
        });
        info!("Created {} version {} for {}", kind, version, entity_id);
        Ok(commit)
    }

    async fn delete_version(&self, kind: VersionedKind, version_id: &str) -> ConsoleResult<()> {
        self.record("delete_version").await;
        let mut store = self.store.write().await;
        let entity_id = store.version(kind, version_id)?.entity_id.clone();
        let entity = store.entity(kind, &entity_id)?;

        if entity.published_version_id() == Some(version_id) {
            warn!("Refused to delete published version {}", version_id);
            return Err(ConsoleError::api(400, "Cannot delete the published version"));
        }

        store
            .versions
            .retain(|v| !(v.kind == kind && v.commit.id == version_id));
        info!("Deleted {} version {}", kind, version_id);
        Ok(())
    }

    async fn restore_version(
        &self,
        kind: VersionedKind,
        entity_id: &str,
        version_id: &str,
    ) -> ConsoleResult<VersionedEntity> {
        self.record("restore_version").await;
        let mut store = self.store.write().await;
        store.entity(kind, entity_id)?;

        let commit = store.version(kind, version_id)?;
        if commit.entity_id != entity_id {
            return Err(ConsoleError::api(
                400,
                format!("Version {} does not belong to {}", version_id, entity_id),
            ));
        }
        let draft = commit.snapshot().ok_or_else(|| {
            ConsoleError::api(500, format!("Version {} has no snapshot", version_id))
        })?;

        let entity = store.apply_draft(kind, entity_id, draft)?;
        info!("Restored {} {} from version {}", kind, entity_id, version_id);
        Ok(entity)
    }

    async fn publish(
        &self,
        kind: VersionedKind,
        entity_id: &str,
        version_id: &str,
    ) -> ConsoleResult<VersionedEntity> {
        self.record("publish").await;
        let mut store = self.store.write().await;
        store.entity(kind, entity_id)?;

        let owner = store
            .version(kind, version_id)
            .map(|v| v.entity_id.clone())
            .map_err(|_| ConsoleError::api(400, format!("Version {} does not exist", version_id)))?;
        if owner != entity_id {
            return Err(ConsoleError::api(
                400,
                format!("Version {} does not belong to {}", version_id, entity_id),
            ));
        }

        let entity = store.set_pointer(kind, entity_id, true, Some(version_id.to_string()))?;
        info!("Published {} {} at version {}", kind, entity_id, version_id);
        Ok(entity)
    }

    async fn unpublish(
        &self,
        kind: VersionedKind,
        entity_id: &str,
    ) -> ConsoleResult<VersionedEntity> {
        self.record("unpublish").await;
        let mut store = self.store.write().await;
        let entity = store.entity(kind, entity_id)?;
        if !entity.is_published() {
            return Err(ConsoleError::api(400, format!("{} is not published", entity_id)));
        }

        let pointer = entity.published_version_id().map(String::from);
        let entity = store.set_pointer(kind, entity_id, false, pointer)?;
        info!("Unpublished {} {}", kind, entity_id);
        Ok(entity)
    }

    async fn revert_version_to_draft(
        &self,
        kind: VersionedKind,
        version_id: &str,
    ) -> ConsoleResult<()> {
        self.record("revert_version_to_draft").await;
        let mut store = self.store.write().await;
        let entity_id = store.version(kind, version_id)?.entity_id.clone();
        let entity = store.entity(kind, &entity_id)?;

        if entity.is_published() {
            return Err(ConsoleError::api(400, "Unpublish before reverting to draft"));
        }
        if entity.published_version_id() != Some(version_id) {
            return Err(ConsoleError::api(
                400,
                format!("Version {} is not the published version", version_id),
            ));
        }

        store.set_pointer(kind, &entity_id, false, None)?;
        info!("Reverted {} {} to draft", kind, entity_id);
        Ok(())
    }

    // ==================== Macro Definitions ====================

    async fn list_macro_defs(&self) -> ConsoleResult<Vec<MacroDef>> {
        self.record("list_macro_defs").await;
        Ok(self.store.read().await.macros.clone())
    }

    async fn get_macro_def(&self, id: &str) -> ConsoleResult<MacroDef> {
        self.record("get_macro_def").await;
        self.store.read().await.macro_def(id).cloned()
    }

    async fn create_macro_def(&self, request: &CreateMacroDefRequest) -> ConsoleResult<MacroDef> {
        self.record("create_macro_def").await;
        request.validate().map_err(unprocessable)?;

        let mut store = self.store.write().await;
        if let Some(ref module_id) = request.module_id {
            if !store.module_exists(module_id) {
                return Err(ConsoleError::api(
                    400,
                    format!("Module {} does not exist", module_id),
                ));
            }
        }
        if store
            .macros
            .iter()
            .any(|m| m.name == request.name && m.module_id == request.module_id)
        {
            return Err(ConsoleError::api(
                409,
                format!("Macro {} already exists in this scope", request.name),
            ));
        }

        let now = Utc::now();
        let macro_def = MacroDef {
            id: Uuid::new_v4().to_string(),
            name: request.name.clone(),
            macro_type: request.macro_type,
            module_id: request.module_id.clone(),
            content: request.content.clone(),
            description: request.description.clone(),
            published_version_id: None,
            is_published: false,
            created_at: Some(now),
            updated_at: Some(now),
        };
        store.macros.push(macro_def.clone());
        info!("Created macro definition {} ({})", macro_def.id, macro_def.name);
        Ok(macro_def)
    }

    async fn update_macro_def(
        &self,
        id: &str,
        request: &UpdateMacroDefRequest,
    ) -> ConsoleResult<MacroDef> {
        self.record("update_macro_def").await;
        let mut store = self.store.write().await;
        let macro_def = store.macro_mut(id)?;
        if let Some(ref name) = request.name {
            macro_def.name = name.clone();
        }
        if let Some(ref content) = request.content {
            macro_def.content = content.clone();
        }
        if let Some(ref description) = request.description {
            macro_def.description = Some(description.clone());
        }
        macro_def.updated_at = Some(Utc::now());
        Ok(macro_def.clone())
    }

    async fn delete_macro_def(&self, id: &str) -> ConsoleResult<()> {
        self.record("delete_macro_def").await;
        let mut store = self.store.write().await;
        store.macro_def(id)?;
        store.macros.retain(|m| m.id != id);
        store.remove_versions_of(VersionedKind::MacroDef, id);
        Ok(())
    }

    // ==================== Clients ====================

    async fn list_clients(&self) -> ConsoleResult<Vec<AppClient>> {
        self.record("list_clients").await;
        Ok(self
            .store
            .read()
            .await
            .clients
            .iter()
            .map(|c| c.client.clone())
            .collect())
    }

    async fn get_client(&self, id: &str) -> ConsoleResult<AppClient> {
        self.record("get_client").await;
        self.store.read().await.client(id).map(|c| c.client.clone())
    }

    async fn create_client(
        &self,
        request: &CreateClientRequest,
    ) -> ConsoleResult<CreateClientResponse> {
        self.record("create_client").await;
        request.validate().map_err(unprocessable)?;

        let mut store = self.store.write().await;
        if store
            .clients
            .iter()
            .any(|c| c.client.client_id == request.client_id)
        {
            return Err(ConsoleError::api(
                409,
                format!("Client {} already exists", request.client_id),
            ));
        }

        let secret = Self::generate_secret();
        let secret_hash = Self::hash_secret(&secret)?;
        let client = AppClient {
            id: Uuid::new_v4().to_string(),
            client_id: request.client_id.clone(),
            name: request.name.clone(),
            description: request.description.clone(),
            rate_limit: request.rate_limit,
            max_concurrent: request.max_concurrent,
            group_ids: request.group_ids.clone(),
            api_assignment_ids: request.api_assignment_ids.clone(),
            is_active: true,
            created_at: Some(Utc::now()),
        };
        store.clients.push(StoredClient {
            client: client.clone(),
            secret_hash,
        });
        info!("Created client {}", client.client_id);

        Ok(CreateClientResponse {
            client,
            client_secret: OneTimeSecret::new(secret),
        })
    }

    async fn update_client(
        &self,
        id: &str,
        request: &UpdateClientRequest,
    ) -> ConsoleResult<AppClient> {
        self.record("update_client").await;
        let mut store = self.store.write().await;
        let client = &mut store.client_mut(id)?.client;
        if let Some(ref name) = request.name {
            client.name = Some(name.clone());
        }
        if let Some(ref description) = request.description {
            client.description = Some(description.clone());
        }
        if let Some(rate_limit) = request.rate_limit {
            client.rate_limit = Some(rate_limit);
        }
        if let Some(max_concurrent) = request.max_concurrent {
            client.max_concurrent = Some(max_concurrent);
        }
        if let Some(ref group_ids) = request.group_ids {
            client.group_ids = group_ids.clone();
        }
        if let Some(ref api_ids) = request.api_assignment_ids {
            client.api_assignment_ids = api_ids.clone();
        }
        if let Some(is_active) = request.is_active {
            client.is_active = is_active;
        }
        Ok(client.clone())
    }

    async fn delete_client(&self, id: &str) -> ConsoleResult<()> {
        self.record("delete_client").await;
        let mut store = self.store.write().await;
        store.client(id)?;
        store.clients.retain(|c| c.client.id != id);
        Ok(())
    }

    async fn regenerate_secret(&self, id: &str) -> ConsoleResult<OneTimeSecret> {
        self.record("regenerate_secret").await;
        let secret = Self::generate_secret();
        let secret_hash = Self::hash_secret(&secret)?;

        let mut store = self.store.write().await;
        let stored = store.client_mut(id)?;
        stored.secret_hash = secret_hash;
        info!("Regenerated secret for client {}", stored.client.client_id);
        Ok(OneTimeSecret::new(secret))
    }

    async fn generate_token(&self, request: &TokenRequest) -> ConsoleResult<TokenResponse> {
        self.record("generate_token").await;
        if request.grant_type != "client_credentials" {
            return Err(ConsoleError::api(
                400,
                format!("Unsupported grant_type: {}", request.grant_type),
            ));
        }

        let store = self.store.read().await;
        let stored = store
            .clients
            .iter()
            .find(|c| c.client.client_id == request.client_id && c.client.is_active)
            .filter(|c| Self::verify_secret(&request.client_secret, &c.secret_hash))
            .ok_or_else(|| ConsoleError::api(401, "Invalid client credentials"))?;

        let now = Utc::now();
        let claims = ClientClaims {
            sub: stored.client.id.clone(),
            client_id: stored.client.client_id.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(TOKEN_TTL_SECS as i64)).timestamp(),
            jti: Uuid::new_v4().to_string(),
            apis: store.granted_apis(&stored.client),
        };
        let access_token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(&self.signing_key),
        )
        .map_err(|e| ConsoleError::api(500, format!("Failed to sign token: {}", e)))?;

        Ok(TokenResponse {
            access_token,
            token_type: "bearer".to_string(),
            expires_in: Some(TOKEN_TTL_SECS),
        })
    }

    // ==================== Reference data ====================

    async fn list_groups(&self) -> ConsoleResult<Vec<Group>> {
        self.record("list_groups").await;
        Ok(self.store.read().await.groups.clone())
    }

    async fn list_roles(&self) -> ConsoleResult<Vec<Role>> {
        self.record("list_roles").await;
        Ok(self.store.read().await.roles.clone())
    }

    async fn list_modules(&self) -> ConsoleResult<Vec<Module>> {
        self.record("list_modules").await;
        Ok(self.store.read().await.modules.clone())
    }

    async fn list_datasources(&self) -> ConsoleResult<Vec<Datasource>> {
        self.record("list_datasources").await;
        Ok(self.store.read().await.datasources.clone())
    }
}
