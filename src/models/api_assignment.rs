//! API assignment data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::param::{Param, ParamValidate};
use super::version::Versioned;

/// HTTP method served by an API assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
        }
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "PATCH" => Ok(HttpMethod::Patch),
            other => Err(format!("unsupported HTTP method: {}", other)),
        }
    }
}

/// Execution mode of an API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecuteEngine {
    /// Jinja-templated SQL against a datasource
    #[default]
    Sql,
    /// Python script
    Script,
}

/// Who may call an API through the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    Public,
    #[default]
    Private,
}

/// The editable, unversioned configuration of an API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DraftContent {
    /// SQL/Jinja template or Python script
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub param_validates: Vec<ParamValidate>,
    /// Python script applied to the executor output
    #[serde(default)]
    pub result_transform: Option<String>,
}

impl DraftContent {
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// One configured gateway endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiAssignment {
    pub id: String,
    pub module_id: String,
    pub path: String,
    pub http_method: HttpMethod,
    pub execute_engine: ExecuteEngine,
    #[serde(default)]
    pub datasource_id: Option<String>,
    #[serde(default)]
    pub access_type: AccessType,
    /// Requests per minute, if limited
    #[serde(default)]
    pub rate_limit: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
    /// Version currently served live (may be stale after unpublish)
    #[serde(default)]
    pub published_version_id: Option<String>,
    pub is_published: bool,
    #[serde(default)]
    pub api_context: DraftContent,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Versioned for ApiAssignment {
    fn id(&self) -> &str {
        &self.id
    }

    fn published_version_id(&self) -> Option<&str> {
        self.published_version_id.as_deref()
    }

    fn is_published(&self) -> bool {
        self.is_published
    }

    fn has_draft_content(&self) -> bool {
        !self.api_context.is_empty()
    }
}

/// Request to create a new API assignment
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateApiAssignmentRequest {
    #[validate(length(min = 1))]
    pub module_id: String,
    #[validate(custom(function = "crate::utils::validation::api_path"))]
    pub path: String,
    pub http_method: HttpMethod,
    pub execute_engine: ExecuteEngine,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datasource_id: Option<String>,
    #[serde(default)]
    pub access_type: AccessType,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1))]
    pub rate_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CreateApiAssignmentRequest {
    pub fn new(
        module_id: impl Into<String>,
        path: impl Into<String>,
        http_method: HttpMethod,
        execute_engine: ExecuteEngine,
    ) -> Self {
        Self {
            module_id: module_id.into(),
            path: path.into(),
            http_method,
            execute_engine,
            datasource_id: None,
            access_type: AccessType::default(),
            rate_limit: None,
            description: None,
        }
    }
}

/// Request to update an API assignment; absent fields are left unchanged
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateApiAssignmentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_method: Option<HttpMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execute_engine: Option<ExecuteEngine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datasource_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_type: Option<AccessType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_context: Option<DraftContent>,
}
