//! Console-level tests against the in-memory backend
//!
//! Macro scoping, gateway URLs, debug runs and client credentials.

use serde_json::json;

use apigw_console::models::{
    Action, CreateClientRequest, DataType, DebugOutcome, DebugRequest, ExecuteEngine, Group,
    MacroType, Param, ParamLocation, Permission, Resource, Role, SystemRole,
};
use apigw_console::services::{
    render_macro_preamble, AdminBackend, DebugForm, DebugInput, MacroScope,
};
use apigw_console::ConsoleError;

use crate::common::TestConsole;

#[tokio::test]
async fn test_macros_for_api_include_global_and_own_module() {
    let console = TestConsole::new().await;
    let api = console.create_api("mod1", "users", "SELECT 1").await;
    let global = console.create_macro("paginate", None, "{# global #}").await;
    let own = console.create_macro("tenant", Some("mod1"), "{# mod1 #}").await;
    console.create_macro("orders_only", Some("mod2"), "{# mod2 #}").await;

    let visible = console.ctx.macros_for_api(&api.id).await.unwrap();
    let ids: Vec<&str> = visible.iter().map(|m| m.id.as_str()).collect();

    assert_eq!(ids, vec![global.id.as_str(), own.id.as_str()]);
}

#[tokio::test]
async fn test_preamble_joins_visible_macros() {
    let console = TestConsole::new().await;
    let api = console.create_api("mod1", "users", "SELECT 1").await;
    console.create_macro("a", None, "{% macro a() %}{% endmacro %}\n").await;
    console.create_macro("b", Some("mod1"), "{% macro b() %}{% endmacro %}").await;

    let macros = console.ctx.macros_for_api(&api.id).await.unwrap();
    let refs: Vec<_> = macros.iter().collect();
    assert_eq!(
        render_macro_preamble(&refs, MacroType::Jinja),
        "{% macro a() %}{% endmacro %}\n\n{% macro b() %}{% endmacro %}"
    );
    assert_eq!(render_macro_preamble(&refs, MacroType::Python), "");
}

#[tokio::test]
async fn test_scope_before_module_selection_shows_globals_only() {
    let console = TestConsole::new().await;
    console.create_macro("global", None, "{# g #}").await;
    console.create_macro("local", Some("mod1"), "{# l #}").await;

    let all = console.ctx.list_macro_defs().await.unwrap();
    let mut scope = MacroScope::new(all);
    assert_eq!(scope.visible().len(), 1);

    scope.select_module("mod1");
    assert_eq!(scope.visible().len(), 2);
}

#[tokio::test]
async fn test_api_url_uses_module_prefix() {
    let console = TestConsole::new().await;
    let users = console.create_api("mod1", "/users", "SELECT 1").await;
    let orders = console.create_api("mod2", "orders", "SELECT 1").await;

    assert_eq!(
        console.ctx.api_url(&users.id).await.unwrap(),
        "http://localhost:8000/v1/users"
    );
    assert_eq!(
        console.ctx.api_url(&orders.id).await.unwrap(),
        "http://localhost:8000/orders"
    );
}

#[tokio::test]
async fn test_duplicate_route_conflicts() {
    let console = TestConsole::new().await;
    console.create_api("mod1", "users", "SELECT 1").await;

    let err = console
        .backend
        .create_api_assignment(&apigw_console::models::CreateApiAssignmentRequest::new(
            "mod1",
            "users",
            apigw_console::models::HttpMethod::Get,
            apigw_console::models::ExecuteEngine::Sql,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, ConsoleError::Api { status: 409, .. }));
}

#[tokio::test]
async fn test_debug_reports_missing_parameter() {
    let console = TestConsole::new().await;
    let api = console.create_api("mod1", "users", "SELECT 1").await;
    let mut id = Param::new("id", ParamLocation::Query, DataType::Integer);
    id.is_required = true;
    console
        .set_draft_with_params(&api.id, "SELECT * FROM users WHERE id = {{ id }}", vec![id])
        .await;

    let runner = console.ctx.debug_runner();
    let outcome = runner.run(&api.id, &DebugRequest::default()).await.unwrap();
    assert_eq!(
        outcome,
        DebugOutcome::Error("Missing required parameter: id".to_string())
    );

    let input = DebugInput::parse(r#"{"id": 7}"#, None, None).unwrap();
    let outcome = runner.run(&api.id, &input.into_request()).await.unwrap();
    assert!(!outcome.is_error());
}

#[tokio::test]
async fn test_debug_tries_unsaved_content() {
    let console = TestConsole::new().await;
    let api = console.create_api("mod1", "users", "SELECT 1").await;

    let input = DebugInput::parse("", None, None).unwrap();
    let request = input.into_draft_request(
        "SELECT 2",
        apigw_console::models::ExecuteEngine::Sql,
        Some("ds1".to_string()),
    );
    match console.ctx.debug_runner().run(&api.id, &request).await.unwrap() {
        DebugOutcome::Output(value) => {
            assert_eq!(value["content"], json!("SELECT 2"));
            assert_eq!(value["datasource_id"], json!("ds1"));
        }
        other => panic!("expected output, got {:?}", other),
    }
}

#[tokio::test]
async fn test_debug_rejects_malformed_params_before_any_request() {
    let console = TestConsole::new().await;
    let api = console.create_api("mod1", "users", "SELECT 1").await;
    let fetches = console.backend.request_count("get_api_assignment").await;

    let form = DebugForm::with_params("{\"id\": 7").value("id", "7");
    let err = console.ctx.debug(&api.id, &form, None, None).await.unwrap_err();

    assert!(matches!(err, ConsoleError::Validation(ref m) if m.contains("Invalid JSON in params")));
    assert_eq!(console.backend.request_count("get_api_assignment").await, fetches);
    assert_eq!(console.backend.request_count("debug_api").await, 0);
}

#[tokio::test]
async fn test_debug_fetches_api_only_when_needed() {
    let console = TestConsole::new().await;
    let api = console.create_api("mod1", "users", "SELECT 1").await;
    let mut id = Param::new("id", ParamLocation::Query, DataType::Integer);
    id.is_required = true;
    console
        .set_draft_with_params(&api.id, "SELECT * FROM users WHERE id = {{ id }}", vec![id])
        .await;
    let fetches = console.backend.request_count("get_api_assignment").await;

    // JSON params and an explicit engine need nothing from the API
    let json_only = DebugForm::with_params(r#"{"id": 7}"#);
    console.ctx.debug(&api.id, &json_only, None, None).await.unwrap();
    console
        .ctx
        .debug(&api.id, &json_only, Some("SELECT 2".to_string()), Some(ExecuteEngine::Sql))
        .await
        .unwrap();
    assert_eq!(console.backend.request_count("get_api_assignment").await, fetches);

    // Form values are typed by the declarations
    let typed = DebugForm::default().value("id", "7");
    match console.ctx.debug(&api.id, &typed, None, None).await.unwrap() {
        DebugOutcome::Output(value) => assert_eq!(value["params"]["id"], json!(7)),
        other => panic!("expected output, got {:?}", other),
    }

    // Content without an engine takes the API's
    match console
        .ctx
        .debug(&api.id, &json_only, Some("SELECT 3".to_string()), None)
        .await
        .unwrap()
    {
        DebugOutcome::Output(value) => assert_eq!(value["execute_engine"], json!("SQL")),
        other => panic!("expected output, got {:?}", other),
    }
    assert_eq!(console.backend.request_count("debug_api").await, 4);
}

#[tokio::test]
async fn test_viewer_cannot_debug() {
    let console = TestConsole::with_role(SystemRole::Viewer).await;
    let api = console.create_api("mod1", "users", "SELECT 1").await;

    let err = console
        .ctx
        .debug_runner()
        .run(&api.id, &DebugRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ConsoleError::Forbidden(_)));
    assert_eq!(console.backend.request_count("debug_api").await, 0);
}

#[tokio::test]
async fn test_regenerated_secret_replaces_old_one() {
    let console = TestConsole::new().await;
    let credentials = console.ctx.credentials();
    let created = credentials
        .create_client(&CreateClientRequest::new("billing"))
        .await
        .unwrap();
    let old_secret = created.client_secret.reveal();

    let new_secret = credentials
        .regenerate_secret(&created.client.id)
        .await
        .unwrap()
        .reveal();

    let err = credentials
        .generate_token("billing", &old_secret)
        .await
        .unwrap_err();
    assert!(matches!(err, ConsoleError::Api { status: 401, .. }));

    let token = credentials.generate_token("billing", &new_secret).await.unwrap();
    let claims = console.backend.verify_token(&token.access_token).unwrap();
    assert_eq!(claims.client_id, "billing");

    let fetched = serde_json::to_string(&credentials.get_client(&created.client.id).await.unwrap())
        .unwrap();
    assert!(!fetched.contains(&new_secret));
}

#[tokio::test]
async fn test_duplicate_client_id_conflicts() {
    let console = TestConsole::new().await;
    let credentials = console.ctx.credentials();
    credentials
        .create_client(&CreateClientRequest::new("billing"))
        .await
        .unwrap();

    let err = credentials
        .create_client(&CreateClientRequest::new("billing"))
        .await
        .unwrap_err();
    assert!(matches!(err, ConsoleError::Api { status: 409, .. }));
}

#[tokio::test]
async fn test_reference_data_lists() {
    let console = TestConsole::with_role(SystemRole::Viewer).await;
    let ctx = &console.ctx;

    let roles = ctx.list_roles().await.unwrap();
    assert!(roles.iter().any(|r| r.name == "admin"));
    assert_eq!(ctx.list_modules().await.unwrap().len(), 2);
    assert_eq!(ctx.list_datasources().await.unwrap().len(), 1);
    assert!(ctx.list_groups().await.unwrap().is_empty());

    console
        .backend
        .add_group(Group {
            id: "g1".to_string(),
            name: "partners".to_string(),
            description: None,
            api_assignment_ids: vec![],
        })
        .await;
    assert_eq!(ctx.list_groups().await.unwrap()[0].name, "partners");
}

async fn api_reader() -> TestConsole {
    let console = TestConsole::new().await;
    console
        .backend
        .add_role(Role {
            id: "role-api-reader".to_string(),
            name: "api-reader".to_string(),
            description: None,
            is_system: false,
            permissions: vec![Permission::new(Resource::ApiAssignments, Action::Read)],
        })
        .await;
    console.restrict(&["api-reader"]).await
}

#[tokio::test]
async fn test_macro_reads_need_macro_permission() {
    let console = api_reader().await;
    let api = console.create_api("mod1", "users", "SELECT 1").await;
    console.create_macro("paginate", None, "{# p #}").await;

    assert!(console.ctx.get_api_assignment(&api.id).await.is_ok());
    assert!(matches!(
        console.ctx.macros_for_api(&api.id).await,
        Err(ConsoleError::Forbidden(_))
    ));
    assert!(matches!(
        console.ctx.list_macro_defs().await,
        Err(ConsoleError::Forbidden(_))
    ));
    assert_eq!(console.backend.request_count("list_macro_defs").await, 0);
}

#[tokio::test]
async fn test_reference_reads_need_their_permission() {
    let console = api_reader().await;
    let api = console.create_api("mod1", "users", "SELECT 1").await;

    assert_eq!(console.ctx.list_api_assignments().await.unwrap().len(), 1);
    assert!(matches!(
        console.ctx.api_url(&api.id).await,
        Err(ConsoleError::Forbidden(_))
    ));
    assert!(console.ctx.list_groups().await.is_err());
    assert!(console.ctx.list_roles().await.is_err());
    assert!(console.ctx.list_datasources().await.is_err());
    assert_eq!(console.backend.request_count("list_modules").await, 0);
    assert_eq!(console.backend.request_count("list_groups").await, 0);
    assert_eq!(console.backend.request_count("list_datasources").await, 0);
}
