//! Admin API client tests
//!
//! Uses wiremock to simulate admin API responses and checks routing,
//! authentication, decoding and error mapping.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use apigw_console::models::{
    CreateVersionRequest, DebugOutcome, DebugRequest, TokenRequest, VersionedKind,
};
use apigw_console::services::AdminBackend;
use apigw_console::ConsoleError;

use crate::common::{
    api_json, client_json, ids, macro_json, module_json, version_json, version_summary_json,
    MockAdminApi,
};

#[tokio::test]
async fn test_get_api_assignment_sends_bearer_token() {
    let api = MockAdminApi::start().await;
    api.respond(
        "GET",
        "/api-assignments/api-users",
        200,
        api_json(ids::API_ID, None, false),
    )
    .await;

    let assignment = api.client().get_api_assignment(ids::API_ID).await.unwrap();
    assert_eq!(assignment.module_id, ids::MODULE_ID);
    assert_eq!(assignment.api_context.content, "SELECT * FROM users");
}

#[tokio::test]
async fn test_version_routes_per_kind() {
    let api = MockAdminApi::start().await;
    api.respond(
        "GET",
        "/api-assignments/api-users/versions",
        200,
        json!([
            version_summary_json("v2", ids::API_ID, 2),
            version_summary_json("v1", ids::API_ID, 1)
        ]),
    )
    .await;
    api.respond("GET", "/versions/v1", 200, version_json("v1", ids::API_ID, 1))
        .await;
    api.respond(
        "GET",
        "/macro-defs/versions/mv1",
        200,
        json!({
            "id": "mv1",
            "macro_def_id": ids::MACRO_ID,
            "version": 1,
            "content_snapshot": "{% macro paginate() %}{% endmacro %}",
            "committed_at": "2026-01-15T10:00:00Z"
        }),
    )
    .await;

    let client = api.client();
    let versions = client
        .list_versions(VersionedKind::ApiAssignment, ids::API_ID)
        .await
        .unwrap();
    assert_eq!(versions.len(), 2);
    assert!(!versions[0].has_snapshot());

    let v1 = client
        .get_version(VersionedKind::ApiAssignment, "v1")
        .await
        .unwrap();
    assert!(v1.has_snapshot());
    assert_eq!(v1.entity_id, ids::API_ID);

    let mv1 = client.get_version(VersionedKind::MacroDef, "mv1").await.unwrap();
    assert_eq!(mv1.entity_id, ids::MACRO_ID);
}

#[tokio::test]
async fn test_create_version_posts_commit_message() {
    let api = MockAdminApi::start().await;
    Mock::given(method("POST"))
        .and(path("/api-assignments/api-users/versions"))
        .and(body_json(json!({"commit_message": "add paging"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(version_json("v3", ids::API_ID, 3)))
        .expect(1)
        .mount(&api.server)
        .await;

    let request = CreateVersionRequest {
        commit_message: Some("add paging".to_string()),
    };
    let version = api
        .client()
        .create_version(VersionedKind::ApiAssignment, ids::API_ID, &request)
        .await
        .unwrap();
    assert_eq!(version.version, 3);
}

#[tokio::test]
async fn test_publish_returns_updated_entity() {
    let api = MockAdminApi::start().await;
    Mock::given(method("POST"))
        .and(path("/macro-defs/macro-paginate/publish"))
        .and(body_json(json!({"version_id": "mv1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json({
            let mut m = macro_json(ids::MACRO_ID, None);
            m["published_version_id"] = json!("mv1");
            m["is_published"] = json!(true);
            m
        }))
        .mount(&api.server)
        .await;

    let entity = api
        .client()
        .publish(VersionedKind::MacroDef, ids::MACRO_ID, "mv1")
        .await
        .unwrap();
    let macro_def = entity.into_macro().unwrap();
    assert!(macro_def.is_published);
    assert_eq!(macro_def.published_version_id.as_deref(), Some("mv1"));
}

#[tokio::test]
async fn test_revert_to_draft_route() {
    let api = MockAdminApi::start().await;
    Mock::given(method("POST"))
        .and(path("/versions/v1/revert-to-draft"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&api.server)
        .await;

    api.client()
        .revert_version_to_draft(VersionedKind::ApiAssignment, "v1")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_server_message_is_kept_verbatim() {
    let api = MockAdminApi::start().await;
    api.respond(
        "DELETE",
        "/versions/v1",
        400,
        json!({"detail": "Cannot delete the published version"}),
    )
    .await;

    let err = api
        .client()
        .delete_version(VersionedKind::ApiAssignment, "v1")
        .await
        .unwrap_err();
    match err {
        ConsoleError::Api { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Cannot delete the published version");
        }
        other => panic!("Expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_validation_detail_list_is_joined() {
    let api = MockAdminApi::start().await;
    api.respond(
        "POST",
        "/api-assignments",
        422,
        json!({"detail": [{"msg": "path is required"}, {"msg": "module_id is required"}]}),
    )
    .await;

    let request = apigw_console::models::CreateApiAssignmentRequest::new(
        "mod1",
        "users",
        apigw_console::models::HttpMethod::Get,
        apigw_console::models::ExecuteEngine::Sql,
    );
    let err = api.client().create_api_assignment(&request).await.unwrap_err();
    assert_eq!(
        err.to_notice().message,
        "path is required; module_id is required"
    );
}

#[tokio::test]
async fn test_not_found_maps_to_not_found() {
    let api = MockAdminApi::start().await;
    api.respond("GET", "/clients/nope", 404, json!({"error": "Client not found"}))
        .await;

    let err = api.client().get_client("nope").await.unwrap_err();
    assert!(matches!(err, ConsoleError::NotFound(ref m) if m == "Client not found"));
}

#[tokio::test]
async fn test_schema_mismatch_is_reported() {
    let api = MockAdminApi::start().await;
    api.respond(
        "GET",
        "/api-assignments/api-users",
        200,
        json!({"id": "api-users", "path": "users"}),
    )
    .await;

    let err = api.client().get_api_assignment(ids::API_ID).await.unwrap_err();
    assert!(matches!(err, ConsoleError::Schema(_)));
}

#[tokio::test]
async fn test_missing_publish_flag_is_a_schema_error() {
    let api = MockAdminApi::start().await;
    let mut body = api_json(ids::API_ID, Some("v-1"), true);
    body.as_object_mut().unwrap().remove("is_published");
    api.respond("GET", "/api-assignments/api-users", 200, body).await;

    let err = api.client().get_api_assignment(ids::API_ID).await.unwrap_err();
    assert!(matches!(err, ConsoleError::Schema(ref m) if m.contains("is_published")));
}

#[tokio::test]
async fn test_debug_error_body_is_an_outcome() {
    let api = MockAdminApi::start().await;
    api.respond(
        "POST",
        "/api-assignments/api-users/debug",
        200,
        json!({"error": "Missing required parameter: id"}),
    )
    .await;

    let outcome = api
        .client()
        .debug_api(ids::API_ID, &DebugRequest::default())
        .await
        .unwrap();
    assert_eq!(
        outcome,
        DebugOutcome::Error("Missing required parameter: id".to_string())
    );
}

#[tokio::test]
async fn test_debug_timeout() {
    let api = MockAdminApi::start().await;
    api.respond_slowly(
        "POST",
        "/api-assignments/api-users/debug",
        json!({"rows": []}),
        Duration::from_millis(500),
    )
    .await;

    let client = api.client().with_debug_timeout(Duration::from_millis(50));
    let err = client
        .debug_api(ids::API_ID, &DebugRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ConsoleError::Timeout(ref m) if m.starts_with("Debug request exceeded")));
}

#[tokio::test]
async fn test_regenerate_secret() {
    let api = MockAdminApi::start().await;
    api.respond(
        "POST",
        "/clients/client-1/regenerate-secret",
        200,
        json!({"client_secret": "s3cr3t-value"}),
    )
    .await;

    let secret = api.client().regenerate_secret(ids::CLIENT_ID).await.unwrap();
    assert_eq!(format!("{:?}", secret), "OneTimeSecret(<redacted>)");
    assert_eq!(secret.reveal(), "s3cr3t-value");
}

#[tokio::test]
async fn test_client_body_never_exposes_secret() {
    let api = MockAdminApi::start().await;
    let mut body = client_json(ids::CLIENT_ID);
    body["client_secret"] = json!("leaked");
    api.respond("GET", "/clients/client-1", 200, body).await;

    let client = api.client().get_client(ids::CLIENT_ID).await.unwrap();
    let serialized = serde_json::to_string(&client).unwrap();
    assert!(!serialized.contains("leaked"));
}

#[tokio::test]
async fn test_generate_token() {
    let api = MockAdminApi::start().await;
    Mock::given(method("POST"))
        .and(path("/token/generate"))
        .and(body_json(json!({
            "client_id": "billing",
            "client_secret": "pw",
            "grant_type": "client_credentials"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "jwt",
            "expires_in": 3600
        })))
        .mount(&api.server)
        .await;

    let token = api
        .client()
        .generate_token(&TokenRequest::client_credentials("billing", "pw"))
        .await
        .unwrap();
    assert_eq!(token.access_token, "jwt");
    assert_eq!(token.token_type, "bearer");
}

#[tokio::test]
async fn test_modules_list() {
    let api = MockAdminApi::start().await;
    api.respond(
        "GET",
        "/modules",
        200,
        json!([module_json("mod1", "/v1"), module_json("mod2", "/")]),
    )
    .await;

    let modules = api.client().list_modules().await.unwrap();
    assert_eq!(modules[0].path_prefix, "/v1");
}
