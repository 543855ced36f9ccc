//! Version and publish lifecycle
//!
//! [`PublishState`] is the lifecycle of one versioned entity as a pure state
//! machine. [`VersionLifecycle`] drives the admin backend, checking each
//! action against that state machine first so illegal actions never reach
//! the network. The backend stays the authority and re-checks everything.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use super::cache::CachedBackend;
use super::capabilities::{resource_for, Capabilities};
use crate::models::{
    Action, CreateVersionRequest, VersionCommit, Versioned, VersionedEntity, VersionedKind,
};
use crate::utils::{ConsoleError, ConsoleResult};

/// Publish state of an API assignment or macro definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PublishState {
    UnpublishedNoVersions,
    /// `pointer` is a stale publish pointer left behind by unpublish
    UnpublishedHasVersions { pointer: Option<String> },
    Published { version_id: String },
}

/// Why a lifecycle action is not allowed in the current state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("No versions exist; create a version before publishing")]
    NoVersions,

    #[error("Not published")]
    NotPublished,

    #[error("Unpublish before reverting to draft")]
    StillPublished,

    #[error("Version {0} is not the published version")]
    NotPointer(String),

    #[error("Version {0} is the published version and cannot be deleted")]
    DeletesPointer(String),
}

impl From<TransitionError> for ConsoleError {
    fn from(err: TransitionError) -> Self {
        ConsoleError::Validation(err.to_string())
    }
}

impl PublishState {
    /// Derive the state from what the backend reports
    pub fn derive(is_published: bool, pointer: Option<&str>, version_count: usize) -> Self {
        match (is_published, pointer) {
            (true, Some(version_id)) => PublishState::Published {
                version_id: version_id.to_string(),
            },
            (_, None) if version_count == 0 => PublishState::UnpublishedNoVersions,
            (_, pointer) => PublishState::UnpublishedHasVersions {
                pointer: pointer.map(String::from),
            },
        }
    }

    pub fn of<E: Versioned + ?Sized>(entity: &E, version_count: usize) -> Self {
        Self::derive(
            entity.is_published(),
            entity.published_version_id(),
            version_count,
        )
    }

    pub fn is_published(&self) -> bool {
        matches!(self, PublishState::Published { .. })
    }

    /// The publish pointer, live or stale
    pub fn pointer(&self) -> Option<&str> {
        match self {
            PublishState::Published { version_id } => Some(version_id),
            PublishState::UnpublishedHasVersions { pointer } => pointer.as_deref(),
            PublishState::UnpublishedNoVersions => None,
        }
    }

    pub fn create_version(&self) -> Result<PublishState, TransitionError> {
        match self {
            PublishState::UnpublishedNoVersions => {
                Ok(PublishState::UnpublishedHasVersions { pointer: None })
            }
            other => Ok(other.clone()),
        }
    }

    /// Publishing from `Published` moves the pointer to `version_id`
    pub fn publish(&self, version_id: &str) -> Result<PublishState, TransitionError> {
        match self {
            PublishState::UnpublishedNoVersions => Err(TransitionError::NoVersions),
            _ => Ok(PublishState::Published {
                version_id: version_id.to_string(),
            }),
        }
    }

    pub fn unpublish(&self) -> Result<PublishState, TransitionError> {
        match self {
            PublishState::Published { version_id } => Ok(PublishState::UnpublishedHasVersions {
                pointer: Some(version_id.clone()),
            }),
            _ => Err(TransitionError::NotPublished),
        }
    }

    pub fn revert_to_draft(&self, version_id: &str) -> Result<PublishState, TransitionError> {
        match self {
            PublishState::Published { .. } => Err(TransitionError::StillPublished),
            PublishState::UnpublishedHasVersions {
                pointer: Some(pointer),
            } if pointer == version_id => {
                Ok(PublishState::UnpublishedHasVersions { pointer: None })
            }
            _ => Err(TransitionError::NotPointer(version_id.to_string())),
        }
    }

    /// `remaining` is the number of versions left after the deletion
    pub fn delete_version(
        &self,
        version_id: &str,
        remaining: usize,
    ) -> Result<PublishState, TransitionError> {
        if self.pointer() == Some(version_id) {
            return Err(TransitionError::DeletesPointer(version_id.to_string()));
        }
        match self {
            PublishState::Published { .. } => Ok(self.clone()),
            _ if remaining == 0 && self.pointer().is_none() => {
                Ok(PublishState::UnpublishedNoVersions)
            }
            _ => Ok(PublishState::UnpublishedHasVersions {
                pointer: self.pointer().map(String::from),
            }),
        }
    }

    /// Restore only rewrites the draft
    pub fn restore(&self) -> PublishState {
        self.clone()
    }
}

/// Acknowledgement that restoring a version overwrites the current draft
#[derive(Debug, Clone, Copy)]
pub struct Confirmation(());

impl Confirmation {
    pub fn overwrite_draft() -> Self {
        Confirmation(())
    }
}

/// Drives version and publish actions for one entity kind
#[derive(Clone)]
pub struct VersionLifecycle {
    kind: VersionedKind,
    cache: CachedBackend,
    capabilities: Arc<dyn Capabilities>,
}

impl VersionLifecycle {
    pub fn new(
        kind: VersionedKind,
        cache: CachedBackend,
        capabilities: Arc<dyn Capabilities>,
    ) -> Self {
        Self {
            kind,
            cache,
            capabilities,
        }
    }

    fn require(&self, action: Action) -> ConsoleResult<()> {
        self.capabilities.require(resource_for(self.kind), action)
    }

    fn blocked(&self, err: impl Into<ConsoleError>) -> ConsoleError {
        let err = err.into();
        warn!("Blocked {} action: {}", self.kind, err);
        err
    }

    /// Current entity, from cache when possible
    pub async fn entity(&self, entity_id: &str) -> ConsoleResult<VersionedEntity> {
        self.require(Action::Read)?;
        self.cache.get_entity(self.kind, entity_id).await
    }

    /// Versions of an entity, most recent first
    pub async fn list_versions(&self, entity_id: &str) -> ConsoleResult<Vec<VersionCommit>> {
        self.require(Action::Read)?;
        self.cache.list_versions(self.kind, entity_id).await
    }

    /// Full snapshot of one version
    pub async fn get_version(&self, version_id: &str) -> ConsoleResult<VersionCommit> {
        self.require(Action::Read)?;
        self.cache.get_version(self.kind, version_id).await
    }

    pub async fn state(&self, entity_id: &str) -> ConsoleResult<PublishState> {
        let entity = self.entity(entity_id).await?;
        let versions = self.list_versions(entity_id).await?;
        Ok(PublishState::of(&entity, versions.len()))
    }

    /// Snapshot the current draft
    pub async fn create_version(
        &self,
        entity_id: &str,
        commit_message: Option<String>,
    ) -> ConsoleResult<VersionCommit> {
        self.require(Action::Update)?;
        // The draft may have been edited elsewhere since it was cached
        let entity = self.cache.backend().get_entity(self.kind, entity_id).await?;
        self.cache.replace_entity(&entity).await;
        if !entity.has_draft_content() {
            return Err(self.blocked(ConsoleError::validation(
                "Cannot create a version from empty content",
            )));
        }

        let request = CreateVersionRequest {
            commit_message: commit_message.filter(|m| !m.trim().is_empty()),
        };
        let version = self
            .cache
            .backend()
            .create_version(self.kind, entity_id, &request)
            .await?;

        self.cache.invalidate_entity(self.kind, entity_id).await;
        info!("Created version {} of {} {}", version.version, self.kind, entity_id);
        Ok(version)
    }

    pub async fn delete_version(&self, entity_id: &str, version_id: &str) -> ConsoleResult<()> {
        self.require(Action::Delete)?;
        let entity = self.cache.get_entity(self.kind, entity_id).await?;
        let versions = self.cache.list_versions(self.kind, entity_id).await?;
        PublishState::of(&entity, versions.len())
            .delete_version(version_id, versions.len().saturating_sub(1))
            .map_err(|e| self.blocked(e))?;

        self.cache
            .backend()
            .delete_version(self.kind, version_id)
            .await?;

        self.cache.invalidate_entity(self.kind, entity_id).await;
        self.cache.invalidate_version(self.kind, version_id).await;
        info!("Deleted version {} of {} {}", version_id, self.kind, entity_id);
        Ok(())
    }

    /// Overwrite the draft with a version's snapshot
    pub async fn restore_version(
        &self,
        entity_id: &str,
        version_id: &str,
        _confirmation: Confirmation,
    ) -> ConsoleResult<VersionedEntity> {
        self.require(Action::Update)?;
        let entity = self
            .cache
            .backend()
            .restore_version(self.kind, entity_id, version_id)
            .await?;

        self.cache.replace_entity(&entity).await;
        info!("Restored {} {} from version {}", self.kind, entity_id, version_id);
        Ok(entity)
    }

    pub async fn publish(&self, entity_id: &str, version_id: &str) -> ConsoleResult<VersionedEntity> {
        self.require(Action::Publish)?;
        if version_id.trim().is_empty() {
            return Err(self.blocked(ConsoleError::validation("Select a version to publish")));
        }

        let entity = self.cache.get_entity(self.kind, entity_id).await?;
        let versions = self.cache.list_versions(self.kind, entity_id).await?;
        PublishState::of(&entity, versions.len())
            .publish(version_id)
            .map_err(|e| self.blocked(e))?;
        if !versions.iter().any(|v| v.id == version_id) {
            return Err(self.blocked(ConsoleError::validation(format!(
                "Version {} is not a version of {}",
                version_id, entity_id
            ))));
        }

        let entity = self
            .cache
            .backend()
            .publish(self.kind, entity_id, version_id)
            .await?;

        self.cache.replace_entity(&entity).await;
        info!("Published {} {} at version {}", self.kind, entity_id, version_id);
        Ok(entity)
    }

    /// Take the entity offline; the publish pointer is kept
    pub async fn unpublish(&self, entity_id: &str) -> ConsoleResult<VersionedEntity> {
        self.require(Action::Publish)?;
        self.state(entity_id)
            .await?
            .unpublish()
            .map_err(|e| self.blocked(e))?;

        let entity = self.cache.backend().unpublish(self.kind, entity_id).await?;

        self.cache.replace_entity(&entity).await;
        info!("Unpublished {} {}", self.kind, entity_id);
        Ok(entity)
    }

    /// Clear a stale publish pointer
    pub async fn revert_version_to_draft(
        &self,
        entity_id: &str,
        version_id: &str,
    ) -> ConsoleResult<()> {
        self.require(Action::Publish)?;
        self.state(entity_id)
            .await?
            .revert_to_draft(version_id)
            .map_err(|e| self.blocked(e))?;

        self.cache
            .backend()
            .revert_version_to_draft(self.kind, version_id)
            .await?;

        self.cache.invalidate_entity(self.kind, entity_id).await;
        info!("Reverted {} {} to draft", self.kind, entity_id);
        Ok(())
    }
}
