//! Restoring an earlier version as a new commit
//!
//! History stays append-only: rollback never rewrites or removes versions,
//! it commits the target's content again on top.

use crate::commit::{CommitBuilder, NewVersion};
use crate::error::Result;
use crate::model::{Metadata, Version};
use crate::store::VersionStore;
use std::sync::Arc;
use strata_core::ContentStore;
use ulid::Ulid;

/// Thin composition of a store read and a commit
pub struct RollbackOperation {
    store: Arc<VersionStore>,
    content: Arc<dyn ContentStore>,
    commit: Arc<CommitBuilder>,
}

impl RollbackOperation {
    pub fn new(
        store: Arc<VersionStore>,
        content: Arc<dyn ContentStore>,
        commit: Arc<CommitBuilder>,
    ) -> Self {
        Self {
            store,
            content,
            commit,
        }
    }

    /// Commit the target version's content as the new current version
    pub fn rollback_version(
        &self,
        entity_id: &str,
        target_version_id: &Ulid,
        author_id: &str,
        author_name: &str,
        reason: &str,
    ) -> Result<Version> {
        let target = self.store.get_version(entity_id, target_version_id)?;
        let bytes = self.content.get(&target.content_ref)?;

        let mut metadata = Metadata::new();
        metadata.insert(
            "restored_from_version".to_string(),
            serde_json::json!(target.version_number),
        );
        metadata.insert("reason".to_string(), serde_json::json!(reason));

        let request = NewVersion::new(entity_id, author_id, author_name, bytes)
            .mime_type(target.mime_type.clone())
            .message(format!("Rollback to version {}", target.version_number))
            .metadata(metadata);

        let outcome = self.commit.commit(request)?;
        tracing::info!(
            entity_id,
            restored_from = target.version_number,
            version = outcome.version.version_number,
            "version rolled back"
        );
        Ok(outcome.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::ports::{SystemClock, UlidGenerator};
    use strata_core::MemoryContentStore;

    fn setup() -> (Arc<CommitBuilder>, RollbackOperation, Arc<VersionStore>) {
        let store = Arc::new(VersionStore::new());
        let content: Arc<dyn ContentStore> = Arc::new(MemoryContentStore::new());
        let commit = Arc::new(CommitBuilder::new(
            store.clone(),
            content.clone(),
            Arc::new(SystemClock),
            Arc::new(UlidGenerator),
        ));
        let rollback = RollbackOperation::new(store.clone(), content, commit.clone());
        (commit, rollback, store)
    }

    #[test]
    fn test_rollback_creates_new_current() {
        let (commit, rollback, store) = setup();

        let v1 = commit
            .commit(NewVersion::new("doc-1", "u1", "User One", "original"))
            .unwrap()
            .version;
        commit
            .commit(NewVersion::new("doc-1", "u1", "User One", "changed"))
            .unwrap();

        let restored = rollback
            .rollback_version("doc-1", &v1.id, "u2", "User Two", "bad change")
            .unwrap();

        assert_eq!(restored.version_number, 3);
        assert!(restored.is_current);
        assert_eq!(restored.content_hash, v1.content_hash);
        assert_eq!(
            restored.metadata["restored_from_version"],
            serde_json::json!(1)
        );
        assert_eq!(restored.metadata["reason"], serde_json::json!("bad change"));
        assert_eq!(store.versions("doc-1").len(), 3);
    }

    #[test]
    fn test_rollback_unknown_target_is_not_found() {
        let (_, rollback, _) = setup();
        let ghost = Ulid::new();
        assert!(matches!(
            rollback.rollback_version("doc-1", &ghost, "u1", "User One", ""),
            Err(EngineError::NotFound(_))
        ));
    }
}
