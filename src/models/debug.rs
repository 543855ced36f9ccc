//! Debug request/response models

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::api_assignment::ExecuteEngine;

/// Body of `POST /api-assignments/{id}/debug`.
///
/// `content`, `execute_engine` and `datasource_id` override the stored draft
/// so unsaved edits can be tried out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DebugRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execute_engine: Option<ExecuteEngine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datasource_id: Option<String>,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl DebugRequest {
    pub fn with_params(params: Map<String, Value>) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }
}

/// Result of a debug execution
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum DebugOutcome {
    /// Executor output, rendered as returned
    Output(Value),
    /// The executor reported an error
    Error(String),
}

impl DebugOutcome {
    /// Interpret a debug response body; `{ "error": "..." }` is an executor error
    pub fn from_value(value: Value) -> Self {
        if let Value::Object(ref map) = value {
            if let Some(Value::String(message)) = map.get("error") {
                return DebugOutcome::Error(message.clone());
            }
        }
        DebugOutcome::Output(value)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, DebugOutcome::Error(_))
    }
}
