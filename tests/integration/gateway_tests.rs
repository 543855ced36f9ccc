//! Gateway invocation tests
//!
//! Published APIs are called directly through the gateway; any status
//! comes back as a [`GatewayResponse`].

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use apigw_console::config::ApiConfig;
use apigw_console::models::HttpMethod;
use apigw_console::services::{gateway_url, DebugInput, GatewayInvoker};
use apigw_console::ConsoleError;

fn invoker() -> GatewayInvoker {
    GatewayInvoker::new(&ApiConfig::default()).unwrap()
}

#[tokio::test]
async fn test_get_sends_params_in_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/users"))
        .and(query_param("id", "7"))
        .and(query_param("name", "ann"))
        .and(header("authorization", "Bearer client-token"))
        .and(header("x-trace", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rows": [{"id": 7}]})))
        .expect(1)
        .mount(&server)
        .await;

    let input = DebugInput::parse(
        r#"{"id": 7, "name": "ann"}"#,
        Some(r#"{"X-Trace": "abc"}"#),
        None,
    )
    .unwrap();
    let url = gateway_url(&server.uri(), "/v1", "users");
    let response = invoker()
        .execute_gateway(&url, HttpMethod::Get, Some("client-token"), &input)
        .await
        .unwrap();

    assert!(response.is_success());
    assert_eq!(response.body["rows"][0]["id"], json!(7));
}

#[tokio::test]
async fn test_post_sends_params_as_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(body_json(json!({"sku": "A-1", "qty": 2})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "o-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let input = DebugInput::parse(r#"{"sku": "A-1", "qty": 2}"#, None, None).unwrap();
    let response = invoker()
        .execute_gateway(&format!("{}/orders", server.uri()), HttpMethod::Post, None, &input)
        .await
        .unwrap();
    assert_eq!(response.status, 201);
}

#[tokio::test]
async fn test_explicit_body_wins_over_params() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/orders/1"))
        .and(body_json(json!([1, 2, 3])))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let input = DebugInput::parse(r#"{"ignored": true}"#, None, Some("[1, 2, 3]")).unwrap();
    let response = invoker()
        .execute_gateway(&format!("{}/orders/1", server.uri()), HttpMethod::Put, None, &input)
        .await
        .unwrap();
    assert_eq!(response.body, json!("ok"));
}

#[tokio::test]
async fn test_error_status_is_returned_not_raised() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/private"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid token"})))
        .mount(&server)
        .await;

    let response = invoker()
        .execute_gateway(
            &format!("{}/private", server.uri()),
            HttpMethod::Get,
            Some("expired"),
            &DebugInput::default(),
        )
        .await
        .unwrap();
    assert_eq!(response.status, 401);
    assert_eq!(response.error_message().as_deref(), Some("Invalid token"));
}

#[tokio::test]
async fn test_gateway_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let err = invoker()
        .with_timeout(Duration::from_millis(50))
        .execute_gateway(
            &format!("{}/slow", server.uri()),
            HttpMethod::Get,
            None,
            &DebugInput::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ConsoleError::Timeout(_)));
}

#[tokio::test]
async fn test_invalid_url_is_rejected_before_sending() {
    let err = invoker()
        .execute_gateway("not a url", HttpMethod::Get, None, &DebugInput::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ConsoleError::Validation(_)));
}
