//! Per-entity version log, current pointer, and named refs
//!
//! The store is the single source of truth and the lock boundary: every
//! mutation happens under the owning entity's write lock, and reads clone a
//! consistent snapshot under the read lock. Entities are sharded through a
//! concurrent map so operations on different entities never contend.
//!
//! Each entity's history is an append-only ordered log with an id → position
//! index, giving O(1) current-pointer lookup without reference cycles.

use crate::error::{EngineError, Result};
use crate::lifecycle;
use crate::model::{Branch, Tag, Version, VersionLock, VersionStatus};
use crate::query::{self, ListQuery, VersionPage};
use ahash::AHashMap;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use ulid::Ulid;

/// All state owned by one entity
pub(crate) struct EntityState {
    /// Append-only version log, oldest first
    pub(crate) log: Vec<Version>,
    /// Version id → position in `log`
    index: AHashMap<Ulid, usize>,
    /// Position of the current version in `log`
    current: Option<usize>,
    pub(crate) branches: BTreeMap<String, Branch>,
    pub(crate) tags: BTreeMap<String, Tag>,
}

impl EntityState {
    fn new() -> Self {
        Self {
            log: Vec::new(),
            index: AHashMap::new(),
            current: None,
            branches: BTreeMap::new(),
            tags: BTreeMap::new(),
        }
    }

    pub(crate) fn version(&self, id: &Ulid) -> Option<&Version> {
        self.index.get(id).map(|&pos| &self.log[pos])
    }

    pub(crate) fn version_mut(&mut self, id: &Ulid) -> Option<&mut Version> {
        let pos = *self.index.get(id)?;
        Some(&mut self.log[pos])
    }

    pub(crate) fn current(&self) -> Option<&Version> {
        self.current.map(|pos| &self.log[pos])
    }

    /// Append a version as the new current, demoting the previous one
    ///
    /// This is the only way a version enters the log, keeping the flip and
    /// the insert atomic with respect to the entity lock held by the caller.
    pub(crate) fn insert_current(&mut self, version: Version) {
        debug_assert!(version.is_current);
        if let Some(pos) = self.current {
            self.log[pos].is_current = false;
        }
        let pos = self.log.len();
        self.index.insert(version.id, pos);
        self.current = Some(pos);
        self.log.push(version);
    }

    /// Drop the given versions from the log and rebuild positions
    pub(crate) fn remove_versions(&mut self, doomed: &HashSet<Ulid>) {
        if doomed.is_empty() {
            return;
        }
        self.log.retain(|v| !doomed.contains(&v.id));

        self.index.clear();
        self.current = None;
        for (pos, version) in self.log.iter().enumerate() {
            self.index.insert(version.id, pos);
            if version.is_current {
                self.current = Some(pos);
            }
        }
    }
}

/// Ordered per-entity version logs plus named refs
pub struct VersionStore {
    entities: DashMap<String, Arc<RwLock<EntityState>>>,
}

impl VersionStore {
    pub fn new() -> Self {
        Self {
            entities: DashMap::new(),
        }
    }

    /// Handle for an entity, creating empty state on first write
    pub(crate) fn entity_or_create(&self, entity_id: &str) -> Arc<RwLock<EntityState>> {
        self.entities
            .entry(entity_id.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(EntityState::new())))
            .value()
            .clone()
    }

    /// Handle for an existing entity
    pub(crate) fn entity(&self, entity_id: &str) -> Option<Arc<RwLock<EntityState>>> {
        self.entities.get(entity_id).map(|e| e.value().clone())
    }

    pub(crate) fn entity_or_not_found(&self, entity_id: &str) -> Result<Arc<RwLock<EntityState>>> {
        self.entity(entity_id)
            .ok_or_else(|| EngineError::not_found(format!("entity {entity_id}")))
    }

    /// Ids of every entity with recorded state
    pub fn entity_ids(&self) -> Vec<String> {
        self.entities.iter().map(|e| e.key().clone()).collect()
    }

    /// Fetch one version
    pub fn get_version(&self, entity_id: &str, version_id: &Ulid) -> Result<Version> {
        let entity = self.entity_or_not_found(entity_id)?;
        let state = entity.read();
        state
            .version(version_id)
            .cloned()
            .ok_or_else(|| {
                EngineError::not_found(format!("version {version_id} of entity {entity_id}"))
            })
    }

    /// Fetch the entity's current version
    pub fn current_version(&self, entity_id: &str) -> Result<Version> {
        let entity = self.entity_or_not_found(entity_id)?;
        let state = entity.read();
        state
            .current()
            .cloned()
            .ok_or_else(|| EngineError::not_found(format!("entity {entity_id} has no versions")))
    }

    /// Snapshot of every version of an entity (empty for unknown entities)
    pub fn versions(&self, entity_id: &str) -> Vec<Version> {
        match self.entity(entity_id) {
            Some(entity) => entity.read().log.clone(),
            None => Vec::new(),
        }
    }

    /// Filtered, sorted, paginated listing over a snapshot
    pub fn list(&self, entity_id: &str, query: &ListQuery) -> VersionPage {
        query::run(self.versions(entity_id), query)
    }

    /// Snapshot of an entity's branches
    pub fn branches(&self, entity_id: &str) -> Vec<Branch> {
        match self.entity(entity_id) {
            Some(entity) => entity.read().branches.values().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Snapshot of an entity's tags
    pub fn tags(&self, entity_id: &str) -> Vec<Tag> {
        match self.entity(entity_id) {
            Some(entity) => entity.read().tags.values().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Apply a forward status transition
    pub fn set_status(
        &self,
        entity_id: &str,
        version_id: &Ulid,
        status: VersionStatus,
    ) -> Result<Version> {
        let entity = self.entity_or_not_found(entity_id)?;
        let mut state = entity.write();
        let version = state.version_mut(version_id).ok_or_else(|| {
            EngineError::not_found(format!("version {version_id} of entity {entity_id}"))
        })?;

        lifecycle::validate_transition(version, status)?;
        version.status = status;
        Ok(version.clone())
    }

    /// Lock a version, stashing its status for restore on unlock
    pub fn lock_version(
        &self,
        entity_id: &str,
        version_id: &Ulid,
        locked_by: &str,
        now: DateTime<Utc>,
    ) -> Result<Version> {
        let entity = self.entity_or_not_found(entity_id)?;
        let mut state = entity.write();
        let version = state.version_mut(version_id).ok_or_else(|| {
            EngineError::not_found(format!("version {version_id} of entity {entity_id}"))
        })?;

        if version.is_locked() {
            return Err(EngineError::validation(format!(
                "version {version_id} is already locked"
            )));
        }

        version.lock = Some(VersionLock {
            prior_status: version.status,
            locked_by: locked_by.to_string(),
            locked_at: now,
        });
        Ok(version.clone())
    }

    /// Unlock a version, restoring the status held before the lock
    pub fn unlock_version(&self, entity_id: &str, version_id: &Ulid) -> Result<Version> {
        let entity = self.entity_or_not_found(entity_id)?;
        let mut state = entity.write();
        let version = state.version_mut(version_id).ok_or_else(|| {
            EngineError::not_found(format!("version {version_id} of entity {entity_id}"))
        })?;

        let lock = version.lock.take().ok_or_else(|| {
            EngineError::validation(format!("version {version_id} is not locked"))
        })?;
        version.status = lock.prior_status;
        Ok(version.clone())
    }
}

impl Default for VersionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Metadata;
    use strata_core::{hash_bytes, ContentRef};

    fn version(entity_id: &str, number: u64, content: &[u8]) -> Version {
        let hash = hash_bytes(content);
        Version {
            id: Ulid::new(),
            entity_id: entity_id.to_string(),
            version_number: number,
            label: format!("v{number}"),
            content_hash: hash,
            content_ref: ContentRef::from_hash(&hash),
            size: content.len() as u64,
            mime_type: "text/plain".to_string(),
            author_id: "u1".to_string(),
            author_name: "User One".to_string(),
            message: String::new(),
            status: VersionStatus::Draft,
            lock: None,
            is_current: true,
            parent_version_id: None,
            metadata: Metadata::new(),
            created_at: Utc::now(),
        }
    }

    fn store_with_two_versions() -> (VersionStore, Ulid, Ulid) {
        let store = VersionStore::new();
        let v1 = version("doc-1", 1, b"one");
        let v2 = version("doc-1", 2, b"two");
        let (id1, id2) = (v1.id, v2.id);

        let entity = store.entity_or_create("doc-1");
        {
            let mut state = entity.write();
            state.insert_current(v1);
            state.insert_current(v2);
        }
        (store, id1, id2)
    }

    #[test]
    fn test_insert_current_flips_previous() {
        let (store, id1, id2) = store_with_two_versions();

        let v1 = store.get_version("doc-1", &id1).unwrap();
        let v2 = store.get_version("doc-1", &id2).unwrap();
        assert!(!v1.is_current);
        assert!(v2.is_current);
        assert_eq!(store.current_version("doc-1").unwrap().id, id2);
    }

    #[test]
    fn test_single_current_invariant_after_removal() {
        let (store, id1, _) = store_with_two_versions();

        let entity = store.entity("doc-1").unwrap();
        let mut doomed = HashSet::new();
        doomed.insert(id1);
        entity.write().remove_versions(&doomed);

        let versions = store.versions("doc-1");
        assert_eq!(versions.len(), 1);
        assert_eq!(versions.iter().filter(|v| v.is_current).count(), 1);
    }

    #[test]
    fn test_unknown_entity_reads() {
        let store = VersionStore::new();
        assert!(store.versions("ghost").is_empty());
        assert!(matches!(
            store.current_version("ghost"),
            Err(EngineError::NotFound(_))
        ));
    }

    #[test]
    fn test_lock_then_unlock_restores_status() {
        let (store, _, id2) = store_with_two_versions();

        store
            .set_status("doc-1", &id2, VersionStatus::Stable)
            .unwrap();
        store
            .lock_version("doc-1", &id2, "u1", Utc::now())
            .unwrap();

        // Status frozen while locked
        assert!(matches!(
            store.set_status("doc-1", &id2, VersionStatus::Deprecated),
            Err(EngineError::Immutable(_))
        ));

        let unlocked = store.unlock_version("doc-1", &id2).unwrap();
        assert_eq!(unlocked.status, VersionStatus::Stable);
        assert!(!unlocked.is_locked());
    }

    #[test]
    fn test_double_lock_rejected() {
        let (store, _, id2) = store_with_two_versions();
        store
            .lock_version("doc-1", &id2, "u1", Utc::now())
            .unwrap();
        assert!(matches!(
            store.lock_version("doc-1", &id2, "u2", Utc::now()),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn test_unlock_without_lock_rejected() {
        let (store, _, id2) = store_with_two_versions();
        assert!(matches!(
            store.unlock_version("doc-1", &id2),
            Err(EngineError::Validation(_))
        ));
    }
}
