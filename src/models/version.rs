//! Version commit models
//!
//! A version commit is an immutable, numbered snapshot of a draft. API
//! assignments and macro definitions are versioned independently but share
//! the same lifecycle, captured by the [`Versioned`] trait.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::api_assignment::{ApiAssignment, DraftContent};
use super::macro_def::MacroDef;
use super::param::{Param, ParamValidate};

/// Which kind of entity a version belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionedKind {
    ApiAssignment,
    MacroDef,
}

impl VersionedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionedKind::ApiAssignment => "api_assignment",
            VersionedKind::MacroDef => "macro_def",
        }
    }
}

impl std::fmt::Display for VersionedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common view over entities that carry a publish pointer
pub trait Versioned {
    fn id(&self) -> &str;
    fn published_version_id(&self) -> Option<&str>;
    fn is_published(&self) -> bool;
    /// Whether the draft has content worth snapshotting
    fn has_draft_content(&self) -> bool;
}

/// A versioned entity of either kind
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum VersionedEntity {
    Api(ApiAssignment),
    Macro(MacroDef),
}

impl VersionedEntity {
    pub fn kind(&self) -> VersionedKind {
        match self {
            VersionedEntity::Api(_) => VersionedKind::ApiAssignment,
            VersionedEntity::Macro(_) => VersionedKind::MacroDef,
        }
    }

    pub fn into_api(self) -> Option<ApiAssignment> {
        match self {
            VersionedEntity::Api(api) => Some(api),
            VersionedEntity::Macro(_) => None,
        }
    }

    pub fn into_macro(self) -> Option<MacroDef> {
        match self {
            VersionedEntity::Macro(m) => Some(m),
            VersionedEntity::Api(_) => None,
        }
    }

    fn inner(&self) -> &dyn Versioned {
        match self {
            VersionedEntity::Api(api) => api,
            VersionedEntity::Macro(m) => m,
        }
    }
}

impl Versioned for VersionedEntity {
    fn id(&self) -> &str {
        self.inner().id()
    }

    fn published_version_id(&self) -> Option<&str> {
        self.inner().published_version_id()
    }

    fn is_published(&self) -> bool {
        self.inner().is_published()
    }

    fn has_draft_content(&self) -> bool {
        self.inner().has_draft_content()
    }
}

/// Immutable snapshot of a draft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionCommit {
    pub id: String,
    /// Parent entity id
    #[serde(alias = "api_assignment_id", alias = "macro_def_id")]
    pub entity_id: String,
    /// Monotonic per parent, assigned by the backend
    pub version: u32,
    #[serde(default)]
    pub commit_message: Option<String>,
    /// Snapshot fields are omitted by list endpoints
    #[serde(default)]
    pub content_snapshot: Option<String>,
    #[serde(default)]
    pub params_snapshot: Option<Vec<Param>>,
    #[serde(default)]
    pub param_validates_snapshot: Option<Vec<ParamValidate>>,
    #[serde(default)]
    pub result_transform_snapshot: Option<String>,
    #[serde(default)]
    pub committed_by: Option<String>,
    pub committed_at: DateTime<Utc>,
}

impl VersionCommit {
    /// Whether this record carries the full snapshot
    pub fn has_snapshot(&self) -> bool {
        self.content_snapshot.is_some()
    }

    /// The snapshot as draft content, if loaded
    pub fn snapshot(&self) -> Option<DraftContent> {
        self.content_snapshot.as_ref().map(|content| DraftContent {
            content: content.clone(),
            params: self.params_snapshot.clone().unwrap_or_default(),
            param_validates: self.param_validates_snapshot.clone().unwrap_or_default(),
            result_transform: self.result_transform_snapshot.clone(),
        })
    }

    /// Summary form, as returned by list endpoints
    pub fn summary(&self) -> VersionCommit {
        VersionCommit {
            content_snapshot: None,
            params_snapshot: None,
            param_validates_snapshot: None,
            result_transform_snapshot: None,
            ..self.clone()
        }
    }
}

/// Request to create a version from the current draft
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CreateVersionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
}

/// Request to publish a version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishRequest {
    pub version_id: String,
}

/// Order versions most recent first
pub fn sort_versions_desc(versions: &mut [VersionCommit]) {
    versions.sort_by(|a, b| b.version.cmp(&a.version));
}
