//! Query caching layer
//!
//! Caches admin API reads so repeated views do not hit the backend. Nothing
//! is updated optimistically: callers invalidate or replace entries only
//! after a mutation has succeeded.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

use super::backend::AdminBackend;
use crate::config::CacheConfig;
use crate::models::{
    sort_versions_desc, ApiAssignment, MacroDef, Module, UpdateApiAssignmentRequest,
    UpdateMacroDefRequest, VersionCommit, Versioned, VersionedEntity, VersionedKind,
};
use crate::utils::ConsoleResult;

/// Cache entry with expiration tracking
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub data: T,
    pub inserted_at: Instant,
    pub ttl: Duration,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T, ttl: Duration) -> Self {
        Self {
            data,
            inserted_at: Instant::now(),
            ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() > self.ttl
    }
}

/// Generic cache storage with TTL support
#[derive(Debug)]
pub struct Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    max_entries: usize,
    default_ttl: Duration,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(max_entries: usize, default_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries,
            default_ttl,
        }
    }

    /// Get a value from cache if it exists and is not expired
    pub async fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.data.clone())
    }

    /// Set a value in cache with the default TTL
    pub async fn set(&self, key: K, value: V) {
        let mut entries = self.entries.write().await;

        if entries.len() >= self.max_entries {
            Self::evict_expired_locked(&mut entries);
        }

        // Still full: drop the oldest entry
        if entries.len() >= self.max_entries {
            if let Some(oldest_key) = Self::find_oldest_key(&entries) {
                entries.remove(&oldest_key);
            }
        }

        entries.insert(key, CacheEntry::new(value, self.default_ttl));
    }

    pub async fn remove(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.write().await;
        entries.remove(key).map(|e| e.data)
    }

    fn evict_expired_locked(entries: &mut HashMap<K, CacheEntry<V>>) {
        entries.retain(|_, entry| !entry.is_expired());
    }

    fn find_oldest_key(entries: &HashMap<K, CacheEntry<V>>) -> Option<K> {
        entries
            .iter()
            .min_by_key(|(_, entry)| entry.inserted_at)
            .map(|(k, _)| k.clone())
    }
}

/// Key of a versioned entity or of one of its versions
type EntityKey = (VersionedKind, String);

const ALL: &str = "all";

/// Admin backend reads behind a TTL cache
#[derive(Clone)]
pub struct CachedBackend {
    backend: Arc<dyn AdminBackend>,
    config: CacheConfig,
    entities: Arc<Cache<EntityKey, VersionedEntity>>,
    version_lists: Arc<Cache<EntityKey, Vec<VersionCommit>>>,
    versions: Arc<Cache<EntityKey, VersionCommit>>,
    macro_list: Arc<Cache<String, Vec<MacroDef>>>,
    modules: Arc<Cache<String, Vec<Module>>>,
}

impl CachedBackend {
    pub fn new(backend: Arc<dyn AdminBackend>, config: CacheConfig) -> Self {
        let ttl = Duration::from_secs(config.ttl_secs);
        let max_entries = config.max_entries.max(1);

        Self {
            backend,
            entities: Arc::new(Cache::new(max_entries, ttl)),
            version_lists: Arc::new(Cache::new(max_entries, ttl)),
            versions: Arc::new(Cache::new(max_entries, ttl)),
            // Single-key caches
            macro_list: Arc::new(Cache::new(1, ttl)),
            modules: Arc::new(Cache::new(1, ttl)),
            config,
        }
    }

    /// The uncached backend, for mutations
    pub fn backend(&self) -> &Arc<dyn AdminBackend> {
        &self.backend
    }

    // ==================== Entities ====================

    /// Get an API assignment or macro definition (cached)
    pub async fn get_entity(&self, kind: VersionedKind, id: &str) -> ConsoleResult<VersionedEntity> {
        if !self.config.enabled {
            return self.backend.get_entity(kind, id).await;
        }

        let key = (kind, id.to_string());
        if let Some(entity) = self.entities.get(&key).await {
            debug!("Cache hit: {} {}", kind, id);
            return Ok(entity);
        }

        debug!("Cache miss: {} {}", kind, id);
        let entity = self.backend.get_entity(kind, id).await?;
        self.entities.set(key, entity.clone()).await;
        Ok(entity)
    }

    /// Replace a cached entity with the copy a mutation returned
    pub async fn replace_entity(&self, entity: &VersionedEntity) {
        if !self.config.enabled {
            return;
        }
        let kind = entity.kind();
        self.entities
            .set((kind, entity.id().to_string()), entity.clone())
            .await;
        if kind == VersionedKind::MacroDef {
            self.macro_list.remove(&ALL.to_string()).await;
        }
    }

    /// Save an API draft and cache the copy the server returned
    pub async fn update_api_assignment(
        &self,
        id: &str,
        request: &UpdateApiAssignmentRequest,
    ) -> ConsoleResult<ApiAssignment> {
        let api = self.backend.update_api_assignment(id, request).await?;
        self.replace_entity(&VersionedEntity::Api(api.clone())).await;
        Ok(api)
    }

    /// Save a macro draft and cache the copy the server returned
    pub async fn update_macro_def(
        &self,
        id: &str,
        request: &UpdateMacroDefRequest,
    ) -> ConsoleResult<MacroDef> {
        let macro_def = self.backend.update_macro_def(id, request).await?;
        self.replace_entity(&VersionedEntity::Macro(macro_def.clone()))
            .await;
        Ok(macro_def)
    }

    // ==================== Versions ====================

    /// List versions of an entity, most recent first (cached)
    pub async fn list_versions(
        &self,
        kind: VersionedKind,
        entity_id: &str,
    ) -> ConsoleResult<Vec<VersionCommit>> {
        let key = (kind, entity_id.to_string());
        if self.config.enabled {
            if let Some(versions) = self.version_lists.get(&key).await {
                debug!("Cache hit: versions of {} {}", kind, entity_id);
                return Ok(versions);
            }
            debug!("Cache miss: versions of {} {}", kind, entity_id);
        }

        let mut versions = self.backend.list_versions(kind, entity_id).await?;
        sort_versions_desc(&mut versions);

        if self.config.enabled {
            self.version_lists.set(key, versions.clone()).await;
        }
        Ok(versions)
    }

    /// Get a full version snapshot (cached)
    pub async fn get_version(
        &self,
        kind: VersionedKind,
        version_id: &str,
    ) -> ConsoleResult<VersionCommit> {
        if !self.config.enabled {
            return self.backend.get_version(kind, version_id).await;
        }

        let key = (kind, version_id.to_string());
        if let Some(version) = self.versions.get(&key).await {
            debug!("Cache hit: version {}", version_id);
            return Ok(version);
        }

        debug!("Cache miss: version {}", version_id);
        let version = self.backend.get_version(kind, version_id).await?;
        self.versions.set(key, version.clone()).await;
        Ok(version)
    }

    // ==================== Reference data ====================

    pub async fn list_macro_defs(&self) -> ConsoleResult<Vec<MacroDef>> {
        if !self.config.enabled {
            return self.backend.list_macro_defs().await;
        }

        if let Some(macros) = self.macro_list.get(&ALL.to_string()).await {
            debug!("Cache hit: macro definitions");
            return Ok(macros);
        }

        let macros = self.backend.list_macro_defs().await?;
        self.macro_list.set(ALL.to_string(), macros.clone()).await;
        Ok(macros)
    }

    pub async fn list_modules(&self) -> ConsoleResult<Vec<Module>> {
        if !self.config.enabled {
            return self.backend.list_modules().await;
        }

        if let Some(modules) = self.modules.get(&ALL.to_string()).await {
            debug!("Cache hit: modules");
            return Ok(modules);
        }

        let modules = self.backend.list_modules().await?;
        self.modules.set(ALL.to_string(), modules.clone()).await;
        Ok(modules)
    }

    // ==================== Invalidation ====================

    /// Drop an entity and its version list
    pub async fn invalidate_entity(&self, kind: VersionedKind, id: &str) {
        debug!("Invalidating cache for {} {}", kind, id);
        let key = (kind, id.to_string());
        self.entities.remove(&key).await;
        self.version_lists.remove(&key).await;
        if kind == VersionedKind::MacroDef {
            self.macro_list.remove(&ALL.to_string()).await;
        }
    }

    /// Drop a single version snapshot
    pub async fn invalidate_version(&self, kind: VersionedKind, version_id: &str) {
        self.versions.remove(&(kind, version_id.to_string())).await;
    }
}
