//! Macro definition data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::api_assignment::ExecuteEngine;
use super::version::Versioned;

/// Language of a macro definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MacroType {
    /// Jinja macro, usable from SQL templates
    Jinja,
    /// Python function, usable from scripts
    Python,
}

impl MacroType {
    /// Macro language usable by an execute engine
    pub fn for_engine(engine: ExecuteEngine) -> Self {
        match engine {
            ExecuteEngine::Sql => MacroType::Jinja,
            ExecuteEngine::Script => MacroType::Python,
        }
    }
}

/// A named reusable snippet, global or bound to one module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroDef {
    pub id: String,
    pub name: String,
    pub macro_type: MacroType,
    /// `None` means the macro is global
    #[serde(default)]
    pub module_id: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub published_version_id: Option<String>,
    pub is_published: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl MacroDef {
    pub fn is_global(&self) -> bool {
        self.module_id.is_none()
    }
}

impl Versioned for MacroDef {
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
        !self.content.trim().is_empty()
    }
}

/// Request to create a macro definition
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateMacroDefRequest {
    #[validate(custom(function = "crate::utils::validation::macro_name"))]
    pub name: String,
    pub macro_type: MacroType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_id: Option<String>,
    #[validate(length(min = 1))]
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Request to update a macro definition
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateMacroDefRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
