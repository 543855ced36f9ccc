//! Debug and test execution
//!
//! Operators type params, headers and bodies as JSON text. That text is
//! parsed here, before anything is sent, so a typo costs no round-trip.
//! Execution requests carry an explicit timeout and report expiry as
//! [`ConsoleError::Timeout`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Url};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::backend::AdminBackend;
use super::capabilities::Capabilities;
use super::http_client::extract_error_message;
use crate::config::ApiConfig;
use crate::models::{
    check_typed_values, coerce_params, Action, DebugOutcome, DebugRequest, ExecuteEngine,
    HttpMethod, Param, Resource,
};
use crate::utils::{ConsoleError, ConsoleResult};

/// Debug form as the operator typed it
#[derive(Debug, Clone, Default)]
pub struct DebugForm {
    /// Params editor, a JSON object
    pub params: String,
    pub headers: Option<String>,
    pub body: Option<String>,
    /// Single NAME=VALUE entries, typed by the API's declarations
    pub values: HashMap<String, String>,
}

impl DebugForm {
    pub fn with_params(params: impl Into<String>) -> Self {
        Self {
            params: params.into(),
            ..Default::default()
        }
    }

    pub fn value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Parse the JSON editors; form values are typed later against the API
    pub fn parse(&self) -> ConsoleResult<DebugInput> {
        DebugInput::parse(&self.params, self.headers.as_deref(), self.body.as_deref())
    }
}

/// Parsed debug form input
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebugInput {
    pub params: Map<String, Value>,
    pub headers: Map<String, Value>,
    pub body: Option<Value>,
}

impl DebugInput {
    /// Parse the params, headers and body editors.
    ///
    /// Blank text means "nothing entered". Params and headers must be JSON
    /// objects; the body may be any JSON value.
    pub fn parse(
        params_text: &str,
        headers_text: Option<&str>,
        body_text: Option<&str>,
    ) -> ConsoleResult<Self> {
        let params = parse_object("params", params_text)?;
        let headers = parse_object("headers", headers_text.unwrap_or_default())?;
        for (name, value) in &headers {
            HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ConsoleError::validation(format!("Invalid header name: {}", name)))?;
            if value.is_object() || value.is_array() {
                return Err(ConsoleError::validation(format!(
                    "Header {} must be a string or number",
                    name
                )));
            }
        }

        let body = match body_text.map(str::trim).filter(|t| !t.is_empty()) {
            Some(text) => Some(serde_json::from_str(text).map_err(|e| {
                ConsoleError::validation(format!("Invalid JSON in body: {}", e))
            })?),
            None => None,
        };

        Ok(Self {
            params,
            headers,
            body,
        })
    }

    /// Add single form values, typed by the API's declared parameters,
    /// then check every declared value's type.
    ///
    /// Parameters already given in the JSON params are left alone unless a
    /// form value names them.
    pub fn merge_form_values(
        &mut self,
        declared: &[Param],
        raw: &HashMap<String, String>,
    ) -> ConsoleResult<()> {
        if !raw.is_empty() {
            let pending: Vec<Param> = declared
                .iter()
                .filter(|p| raw.contains_key(&p.name) || !self.params.contains_key(&p.name))
                .cloned()
                .collect();
            self.params.extend(coerce_params(&pending, raw)?);
        }
        check_typed_values(declared, &self.params)
    }

    /// Debug request against the stored draft
    pub fn into_request(self) -> DebugRequest {
        DebugRequest::with_params(self.params)
    }

    /// Debug request that tries unsaved content
    pub fn into_draft_request(
        self,
        content: impl Into<String>,
        execute_engine: ExecuteEngine,
        datasource_id: Option<String>,
    ) -> DebugRequest {
        DebugRequest {
            content: Some(content.into()),
            execute_engine: Some(execute_engine),
            datasource_id,
            params: self.params,
        }
    }
}

fn parse_object(label: &str, text: &str) -> ConsoleResult<Map<String, Value>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Map::new());
    }

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ConsoleError::validation(format!(
            "{} must be a JSON object",
            label
        ))),
        Err(e) => Err(ConsoleError::validation(format!(
            "Invalid JSON in {}: {}",
            label, e
        ))),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Runs debug executions through the admin API
#[derive(Clone)]
pub struct DebugRunner {
    backend: Arc<dyn AdminBackend>,
    capabilities: Arc<dyn Capabilities>,
}

impl DebugRunner {
    pub fn new(backend: Arc<dyn AdminBackend>, capabilities: Arc<dyn Capabilities>) -> Self {
        Self {
            backend,
            capabilities,
        }
    }

    pub async fn run(&self, api_id: &str, request: &DebugRequest) -> ConsoleResult<DebugOutcome> {
        self.capabilities
            .require(Resource::ApiAssignments, Action::Execute)?;

        let outcome = self.backend.debug_api(api_id, request).await?;
        match outcome {
            DebugOutcome::Error(ref message) => info!("Debug of {} reported: {}", api_id, message),
            DebugOutcome::Output(_) => debug!("Debug of {} succeeded", api_id),
        }
        Ok(outcome)
    }
}

/// Response of a gateway call, whatever its status
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewayResponse {
    pub status: u16,
    pub body: Value,
}

impl GatewayResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Operator-facing message for a failed call
    pub fn error_message(&self) -> Option<String> {
        if self.is_success() {
            return None;
        }
        let status = reqwest::StatusCode::from_u16(self.status)
            .unwrap_or(reqwest::StatusCode::INTERNAL_SERVER_ERROR);
        Some(extract_error_message(status, &value_text(&self.body)))
    }
}

/// Calls published APIs through the gateway
#[derive(Clone)]
pub struct GatewayInvoker {
    client: Client,
    timeout: Duration,
}

impl GatewayInvoker {
    pub fn new(config: &ApiConfig) -> ConsoleResult<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(!config.ssl_verify)
            .build()
            .map_err(|e| ConsoleError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout: config.debug_timeout(),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Invoke a gateway URL.
    ///
    /// Params go in the query string for GET and DELETE and in the JSON body
    /// otherwise, unless an explicit body was given.
    pub async fn execute_gateway(
        &self,
        url: &str,
        method: HttpMethod,
        token: Option<&str>,
        input: &DebugInput,
    ) -> ConsoleResult<GatewayResponse> {
        let method = Method::from_bytes(method.as_str().as_bytes())
            .map_err(|e| ConsoleError::validation(e.to_string()))?;
        let sends_body = !matches!(method, Method::GET | Method::DELETE);

        let mut headers = HeaderMap::new();
        for (name, value) in &input.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ConsoleError::validation(format!("Invalid header name: {}", name)))?;
            let value = HeaderValue::from_str(&value_text(value))
                .map_err(|_| ConsoleError::validation(format!("Invalid value for header {}", name)))?;
            headers.insert(name, value);
        }

        let mut url = Url::parse(url)
            .map_err(|e| ConsoleError::validation(format!("Invalid gateway URL {}: {}", url, e)))?;
        if !sends_body && input.body.is_none() && !input.params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &input.params {
                pairs.append_pair(key, &value_text(value));
            }
        }

        debug!("Gateway request: {} {}", method, url);
        let mut builder = self
            .client
            .request(method, url)
            .timeout(self.timeout)
            .headers(headers);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        builder = match (&input.body, sends_body) {
            (Some(body), _) => builder.json(body),
            (None, true) => builder.json(&input.params),
            (None, false) => builder,
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ConsoleError::Timeout(format!(
                    "Gateway request exceeded {}s",
                    self.timeout.as_secs_f64()
                ))
            } else {
                ConsoleError::from(e)
            }
        })?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok(GatewayResponse { status, body })
    }
}
