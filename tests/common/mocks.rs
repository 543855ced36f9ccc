//! Mock admin API for testing
//!
//! Wraps a wiremock server and builds clients pointed at it.

use std::time::Duration;

use serde_json::Value;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use apigw_console::config::ApiConfig;
use apigw_console::services::AdminHttpClient;

pub const TEST_TOKEN: &str = "test-admin-token";

pub struct MockAdminApi {
    pub server: MockServer,
}

impl MockAdminApi {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.server.uri(),
            access_token: Some(TEST_TOKEN.to_string()),
            ..Default::default()
        }
    }

    pub fn client(&self) -> AdminHttpClient {
        AdminHttpClient::new(&self.config()).expect("mock client")
    }

    /// Respond to an authenticated request with a JSON body
    pub async fn respond(&self, verb: &str, route: &str, status: u16, body: Value) {
        Mock::given(method(verb))
            .and(path(route))
            .and(header("authorization", format!("Bearer {}", TEST_TOKEN).as_str()))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Respond after a delay
    pub async fn respond_slowly(&self, verb: &str, route: &str, body: Value, delay: Duration) {
        Mock::given(method(verb))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(body)
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }
}
