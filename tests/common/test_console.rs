//! Console wired to the in-memory backend

use std::sync::Arc;

use apigw_console::models::{
    ApiAssignment, CreateApiAssignmentRequest, CreateMacroDefRequest, Datasource, DraftContent,
    ExecuteEngine, HttpMethod, MacroDef, MacroType, Module, Param, SystemRole,
    UpdateApiAssignmentRequest, VersionedKind,
};
use apigw_console::services::{AdminBackend, InMemoryBackend, VersionLifecycle};
use apigw_console::{AppConfig, ConsoleContext};

pub struct TestConsole {
    pub backend: Arc<InMemoryBackend>,
    /// Full-access console sharing `ctx`'s cache, for setting up drafts
    pub admin: ConsoleContext,
    pub ctx: ConsoleContext,
}

impl TestConsole {
    /// Console with full access, two modules and one datasource
    pub async fn new() -> Self {
        let backend = Arc::new(InMemoryBackend::new());
        backend
            .add_module(Module {
                id: "mod1".to_string(),
                name: "Users".to_string(),
                path_prefix: "/v1".to_string(),
                description: None,
            })
            .await;
        backend
            .add_module(Module {
                id: "mod2".to_string(),
                name: "Orders".to_string(),
                path_prefix: "/".to_string(),
                description: None,
            })
            .await;
        backend
            .add_datasource(Datasource {
                id: "ds1".to_string(),
                name: "main".to_string(),
                kind: Some("postgres".to_string()),
            })
            .await;

        let admin = ConsoleContext::new(
            AppConfig::default(),
            backend.clone(),
            Arc::new(apigw_console::services::AllowAll),
        );
        Self {
            backend,
            ctx: admin.clone(),
            admin,
        }
    }

    /// Console limited to one built-in role
    pub async fn with_role(role: SystemRole) -> Self {
        Self::with_role_names(&[role.name()]).await
    }

    /// Console limited to roles already held by the backend
    pub async fn with_role_names(names: &[&str]) -> Self {
        let console = Self::new().await;
        console.restrict(names).await
    }

    /// Same backend and cache, limited to `names`
    pub async fn restrict(self, names: &[&str]) -> Self {
        let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        let ctx = self
            .admin
            .clone()
            .with_roles(&names)
            .await
            .expect("known role");
        Self { ctx, ..self }
    }

    pub fn apis(&self) -> VersionLifecycle {
        self.ctx.lifecycle(VersionedKind::ApiAssignment)
    }

    pub fn macros(&self) -> VersionLifecycle {
        self.ctx.lifecycle(VersionedKind::MacroDef)
    }

    /// Create an API in `module_id` with draft `content`
    pub async fn create_api(&self, module_id: &str, path: &str, content: &str) -> ApiAssignment {
        let api = self
            .backend
            .create_api_assignment(&CreateApiAssignmentRequest::new(
                module_id,
                path,
                HttpMethod::Get,
                ExecuteEngine::Sql,
            ))
            .await
            .expect("create api");
        self.set_draft(&api.id, content).await;
        self.backend
            .get_api_assignment(&api.id)
            .await
            .expect("created api")
    }

    /// Replace an API's draft, as the editor would
    pub async fn set_draft(&self, api_id: &str, content: &str) {
        self.set_draft_with_params(api_id, content, vec![]).await;
    }

    pub async fn set_draft_with_params(&self, api_id: &str, content: &str, params: Vec<Param>) {
        let update = UpdateApiAssignmentRequest {
            api_context: Some(DraftContent {
                content: content.to_string(),
                params,
                ..Default::default()
            }),
            ..Default::default()
        };
        self.admin
            .update_api_assignment(api_id, &update)
            .await
            .expect("update draft");
    }

    pub async fn create_macro(&self, name: &str, module_id: Option<&str>, content: &str) -> MacroDef {
        self.backend
            .create_macro_def(&CreateMacroDefRequest {
                name: name.to_string(),
                macro_type: MacroType::Jinja,
                module_id: module_id.map(String::from),
                content: content.to_string(),
                description: None,
            })
            .await
            .expect("create macro")
    }
}
