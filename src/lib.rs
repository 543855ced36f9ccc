//! API Gateway Console Library
//!
//! Typed administration client for a low-code API gateway: API assignments,
//! macro definitions, their version/publish lifecycle, and app clients.

use std::sync::Arc;

pub mod config;
pub mod models;
pub mod services;
pub mod utils;

pub use config::AppConfig;
pub use utils::{ConsoleError, ConsoleResult};

use models::{
    Action, ApiAssignment, Datasource, DebugOutcome, ExecuteEngine, Group, MacroDef, Module,
    Resource, Role, UpdateApiAssignmentRequest, UpdateMacroDefRequest, VersionedKind,
};
use services::{
    api_url, macros_in_scope, AdminBackend, AdminHttpClient, AllowAll, CachedBackend,
    Capabilities, CredentialService, DebugForm, DebugRunner, GatewayInvoker, GatewayResponse,
    RoleCapabilities, VersionLifecycle,
};

/// Console state shared by every command
#[derive(Clone)]
pub struct ConsoleContext {
    /// Application configuration
    pub config: AppConfig,
    backend: Arc<dyn AdminBackend>,
    cache: CachedBackend,
    capabilities: Arc<dyn Capabilities>,
}

impl ConsoleContext {
    pub fn new(
        config: AppConfig,
        backend: Arc<dyn AdminBackend>,
        capabilities: Arc<dyn Capabilities>,
    ) -> Self {
        let cache = CachedBackend::new(backend.clone(), config.cache.clone());
        Self {
            config,
            backend,
            cache,
            capabilities,
        }
    }

    /// Connect to the admin API described by `config`
    pub fn connect(config: AppConfig) -> ConsoleResult<Self> {
        let client = AdminHttpClient::new(&config.api)?;
        Ok(Self::new(config, Arc::new(client), Arc::new(AllowAll)))
    }

    /// Restrict the console to what the named roles allow
    pub async fn with_roles(mut self, role_names: &[String]) -> ConsoleResult<Self> {
        if role_names.is_empty() {
            return Ok(self);
        }

        let roles = self.backend.list_roles().await?;
        if let Some(missing) = role_names
            .iter()
            .find(|name| !roles.iter().any(|r| &r.name == *name))
        {
            return Err(ConsoleError::validation(format!("Unknown role: {}", missing)));
        }

        let selected: Vec<_> = roles
            .into_iter()
            .filter(|r| role_names.contains(&r.name))
            .collect();
        self.capabilities = Arc::new(RoleCapabilities::from_roles(&selected));
        Ok(self)
    }

    pub fn lifecycle(&self, kind: VersionedKind) -> VersionLifecycle {
        VersionLifecycle::new(kind, self.cache.clone(), self.capabilities.clone())
    }

    pub fn credentials(&self) -> CredentialService {
        CredentialService::new(self.backend.clone(), self.capabilities.clone())
    }

    pub fn debug_runner(&self) -> DebugRunner {
        DebugRunner::new(self.backend.clone(), self.capabilities.clone())
    }

    pub fn gateway(&self) -> ConsoleResult<GatewayInvoker> {
        GatewayInvoker::new(&self.config.api)
    }

    // ==================== Reads ====================

    pub async fn list_api_assignments(&self) -> ConsoleResult<Vec<ApiAssignment>> {
        self.capabilities
            .require(Resource::ApiAssignments, Action::Read)?;
        self.backend.list_api_assignments().await
    }

    pub async fn get_api_assignment(&self, id: &str) -> ConsoleResult<ApiAssignment> {
        self.lifecycle(VersionedKind::ApiAssignment)
            .entity(id)
            .await?
            .into_api()
            .ok_or_else(|| ConsoleError::Schema(format!("{} is not an API assignment", id)))
    }

    pub async fn list_macro_defs(&self) -> ConsoleResult<Vec<MacroDef>> {
        self.capabilities.require(Resource::MacroDefs, Action::Read)?;
        self.cache.list_macro_defs().await
    }

    pub async fn list_modules(&self) -> ConsoleResult<Vec<Module>> {
        self.capabilities.require(Resource::Modules, Action::Read)?;
        self.cache.list_modules().await
    }

    pub async fn list_groups(&self) -> ConsoleResult<Vec<Group>> {
        self.capabilities.require(Resource::Groups, Action::Read)?;
        self.backend.list_groups().await
    }

    pub async fn list_roles(&self) -> ConsoleResult<Vec<Role>> {
        self.capabilities.require(Resource::Roles, Action::Read)?;
        self.backend.list_roles().await
    }

    pub async fn list_datasources(&self) -> ConsoleResult<Vec<Datasource>> {
        self.capabilities
            .require(Resource::Datasources, Action::Read)?;
        self.backend.list_datasources().await
    }

    // ==================== Draft edits ====================

    /// Save an API draft; later reads see the saved copy
    pub async fn update_api_assignment(
        &self,
        id: &str,
        request: &UpdateApiAssignmentRequest,
    ) -> ConsoleResult<ApiAssignment> {
        self.capabilities
            .require(Resource::ApiAssignments, Action::Update)?;
        self.cache.update_api_assignment(id, request).await
    }

    /// Save a macro draft; later reads see the saved copy
    pub async fn update_macro_def(
        &self,
        id: &str,
        request: &UpdateMacroDefRequest,
    ) -> ConsoleResult<MacroDef> {
        self.capabilities
            .require(Resource::MacroDefs, Action::Update)?;
        self.cache.update_macro_def(id, request).await
    }

    async fn api_and_module(&self, api_id: &str) -> ConsoleResult<(ApiAssignment, Module)> {
        let (api, modules) =
            futures::try_join!(self.get_api_assignment(api_id), self.list_modules())?;
        let module = modules
            .into_iter()
            .find(|m| m.id == api.module_id)
            .ok_or_else(|| ConsoleError::not_found(format!("Module {}", api.module_id)))?;
        Ok((api, module))
    }

    /// Gateway URL at which an API is served
    pub async fn api_url(&self, api_id: &str) -> ConsoleResult<String> {
        let (api, module) = self.api_and_module(api_id).await?;
        Ok(api_url(&self.config.api.base_url, &module, &api))
    }

    /// Macro definitions visible to an API
    pub async fn macros_for_api(&self, api_id: &str) -> ConsoleResult<Vec<MacroDef>> {
        self.capabilities.require(Resource::MacroDefs, Action::Read)?;
        let (api, macros) =
            futures::try_join!(self.get_api_assignment(api_id), self.list_macro_defs())?;

        Ok(macros_in_scope(&macros, &api.module_id)
            .into_iter()
            .cloned()
            .collect())
    }

    // ==================== Execution ====================

    /// Run the stored draft, or `content` when given, through the debug executor.
    ///
    /// The form is parsed before any request. The API itself is fetched only
    /// when form values need its declarations or `content` needs its engine.
    pub async fn debug(
        &self,
        api_id: &str,
        form: &DebugForm,
        content: Option<String>,
        engine: Option<ExecuteEngine>,
    ) -> ConsoleResult<DebugOutcome> {
        let mut input = form.parse()?;
        self.capabilities
            .require(Resource::ApiAssignments, Action::Execute)?;

        let needs_api = !form.values.is_empty() || (content.is_some() && engine.is_none());
        let api = if needs_api {
            Some(self.get_api_assignment(api_id).await?)
        } else {
            None
        };
        if let Some(ref api) = api {
            input.merge_form_values(&api.api_context.params, &form.values)?;
        }

        let request = match content {
            Some(content) => {
                let engine = engine
                    .or_else(|| api.as_ref().map(|a| a.execute_engine))
                    .ok_or_else(|| ConsoleError::validation("Select an engine for the content"))?;
                input.into_draft_request(content, engine, None)
            }
            None => input.into_request(),
        };
        self.debug_runner().run(api_id, &request).await
    }

    /// Call a published API through the gateway
    pub async fn execute(
        &self,
        api_id: &str,
        token: Option<&str>,
        form: &DebugForm,
    ) -> ConsoleResult<GatewayResponse> {
        let mut input = form.parse()?;
        let gateway = self.gateway()?;

        let (api, module) = self.api_and_module(api_id).await?;
        input.merge_form_values(&api.api_context.params, &form.values)?;

        let url = api_url(&self.config.api.base_url, &module, &api);
        gateway
            .execute_gateway(&url, api.http_method, token, &input)
            .await
    }
}
