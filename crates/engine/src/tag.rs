//! Named, immutable version annotations
//!
//! Tags have no retag and no deletion path; a name, once placed, stays on
//! the version it was placed on.

use crate::error::{EngineError, Result};
use crate::model::Tag;
use crate::ports::Clock;
use crate::store::VersionStore;
use std::sync::Arc;
use ulid::Ulid;

/// Creates and lists tags for an entity
pub struct TagManager {
    store: Arc<VersionStore>,
    clock: Arc<dyn Clock>,
}

impl TagManager {
    pub fn new(store: Arc<VersionStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Place a tag on an existing version
    pub fn tag_version(
        &self,
        entity_id: &str,
        version_id: &Ulid,
        name: &str,
        message: &str,
        created_by: &str,
    ) -> Result<Tag> {
        if name.is_empty() {
            return Err(EngineError::validation("tag name must not be empty"));
        }

        let entity = self.store.entity_or_not_found(entity_id)?;
        let mut state = entity.write();

        if state.version(version_id).is_none() {
            return Err(EngineError::not_found(format!(
                "version {version_id} of entity {entity_id}"
            )));
        }
        if state.tags.contains_key(name) {
            return Err(EngineError::conflict(format!(
                "tag {name} already exists for entity {entity_id}"
            )));
        }

        let tag = Tag {
            name: name.to_string(),
            entity_id: entity_id.to_string(),
            version_id: *version_id,
            message: message.to_string(),
            created_by: created_by.to_string(),
            created_at: self.clock.now(),
        };
        state.tags.insert(name.to_string(), tag.clone());

        tracing::info!(entity_id, tag = name, version = %version_id, "tag created");
        Ok(tag)
    }

    /// All tags of an entity
    pub fn list_tags(&self, entity_id: &str) -> Vec<Tag> {
        self.store.tags(entity_id)
    }

    /// Fetch one tag
    pub fn get_tag(&self, entity_id: &str, name: &str) -> Result<Tag> {
        let entity = self.store.entity_or_not_found(entity_id)?;
        let state = entity.read();
        state
            .tags
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::not_found(format!("tag {name} of entity {entity_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::{CommitBuilder, NewVersion};
    use crate::ports::{SystemClock, UlidGenerator};
    use strata_core::MemoryContentStore;

    fn setup() -> (TagManager, Ulid) {
        let store = Arc::new(VersionStore::new());
        let commit = CommitBuilder::new(
            store.clone(),
            Arc::new(MemoryContentStore::new()),
            Arc::new(SystemClock),
            Arc::new(UlidGenerator),
        );
        let version = commit
            .commit(NewVersion::new("doc-1", "u1", "User One", "base"))
            .unwrap()
            .version;
        let manager = TagManager::new(store, Arc::new(SystemClock));
        (manager, version.id)
    }

    #[test]
    fn test_tag_and_list() {
        let (manager, version_id) = setup();
        let tag = manager
            .tag_version("doc-1", &version_id, "release-1", "first release", "u1")
            .unwrap();

        assert_eq!(tag.version_id, version_id);
        assert_eq!(manager.list_tags("doc-1").len(), 1);
    }

    #[test]
    fn test_duplicate_tag_leaves_existing_untouched() {
        let (manager, version_id) = setup();
        manager
            .tag_version("doc-1", &version_id, "release-1", "first", "u1")
            .unwrap();

        let result = manager.tag_version("doc-1", &version_id, "release-1", "second", "u2");
        assert!(matches!(result, Err(EngineError::Conflict(_))));

        let existing = manager.get_tag("doc-1", "release-1").unwrap();
        assert_eq!(existing.message, "first");
        assert_eq!(existing.created_by, "u1");
    }

    #[test]
    fn test_tag_unknown_version_is_not_found() {
        let (manager, _) = setup();
        let ghost = Ulid::new();
        assert!(matches!(
            manager.tag_version("doc-1", &ghost, "release-1", "", "u1"),
            Err(EngineError::NotFound(_))
        ));
    }
}
