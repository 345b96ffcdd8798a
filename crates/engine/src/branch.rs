//! Named, movable branch pointers

use crate::error::{EngineError, Result};
use crate::model::Branch;
use crate::ports::Clock;
use crate::store::VersionStore;
use std::sync::Arc;
use ulid::Ulid;

/// Creates and lists branches for an entity
pub struct BranchManager {
    store: Arc<VersionStore>,
    clock: Arc<dyn Clock>,
}

impl BranchManager {
    pub fn new(store: Arc<VersionStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Create a branch pointing at an existing version
    pub fn create_branch(
        &self,
        entity_id: &str,
        version_id: &Ulid,
        name: &str,
        created_by: &str,
        base_branch: Option<&str>,
    ) -> Result<Branch> {
        if name.is_empty() {
            return Err(EngineError::validation("branch name must not be empty"));
        }

        let entity = self.store.entity_or_not_found(entity_id)?;
        let mut state = entity.write();

        if state.version(version_id).is_none() {
            return Err(EngineError::not_found(format!(
                "version {version_id} of entity {entity_id}"
            )));
        }
        if let Some(base) = base_branch {
            if !state.branches.contains_key(base) {
                return Err(EngineError::not_found(format!(
                    "base branch {base} of entity {entity_id}"
                )));
            }
        }
        if state.branches.contains_key(name) {
            return Err(EngineError::conflict(format!(
                "branch {name} already exists for entity {entity_id}"
            )));
        }

        let branch = Branch {
            name: name.to_string(),
            entity_id: entity_id.to_string(),
            head_version_id: *version_id,
            base_branch: base_branch.map(str::to_string),
            created_by: created_by.to_string(),
            is_active: true,
            created_at: self.clock.now(),
        };
        state.branches.insert(name.to_string(), branch.clone());

        tracing::info!(entity_id, branch = name, head = %version_id, "branch created");
        Ok(branch)
    }

    /// All branches of an entity
    pub fn list_branches(&self, entity_id: &str) -> Vec<Branch> {
        self.store.branches(entity_id)
    }

    /// Fetch one branch
    pub fn get_branch(&self, entity_id: &str, name: &str) -> Result<Branch> {
        let entity = self.store.entity_or_not_found(entity_id)?;
        let state = entity.read();
        state.branches.get(name).cloned().ok_or_else(|| {
            EngineError::not_found(format!("branch {name} of entity {entity_id}"))
        })
    }

    /// Mark a branch inactive; branches are never hard-deleted
    pub fn deactivate_branch(&self, entity_id: &str, name: &str) -> Result<Branch> {
        let entity = self.store.entity_or_not_found(entity_id)?;
        let mut state = entity.write();
        let branch = state.branches.get_mut(name).ok_or_else(|| {
            EngineError::not_found(format!("branch {name} of entity {entity_id}"))
        })?;
        branch.is_active = false;
        Ok(branch.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::{CommitBuilder, NewVersion};
    use crate::ports::{SystemClock, UlidGenerator};
    use strata_core::MemoryContentStore;

    fn setup() -> (BranchManager, Arc<VersionStore>, Ulid) {
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
        let manager = BranchManager::new(store.clone(), Arc::new(SystemClock));
        (manager, store, version.id)
    }

    #[test]
    fn test_create_and_list() {
        let (manager, _, head) = setup();
        let branch = manager
            .create_branch("doc-1", &head, "feature", "u1", None)
            .unwrap();

        assert_eq!(branch.head_version_id, head);
        assert!(branch.is_active);
        assert_eq!(manager.list_branches("doc-1").len(), 1);
    }

    #[test]
    fn test_duplicate_name_is_conflict() {
        let (manager, _, head) = setup();
        manager
            .create_branch("doc-1", &head, "feature", "u1", None)
            .unwrap();
        assert!(matches!(
            manager.create_branch("doc-1", &head, "feature", "u2", None),
            Err(EngineError::Conflict(_))
        ));
    }

    #[test]
    fn test_unknown_version_is_not_found() {
        let (manager, _, _) = setup();
        let ghost = Ulid::new();
        assert!(matches!(
            manager.create_branch("doc-1", &ghost, "feature", "u1", None),
            Err(EngineError::NotFound(_))
        ));
    }

    #[test]
    fn test_unknown_base_branch_is_not_found() {
        let (manager, _, head) = setup();
        assert!(matches!(
            manager.create_branch("doc-1", &head, "feature", "u1", Some("main")),
            Err(EngineError::NotFound(_))
        ));
    }

    #[test]
    fn test_deactivate() {
        let (manager, _, head) = setup();
        manager
            .create_branch("doc-1", &head, "feature", "u1", None)
            .unwrap();
        let branch = manager.deactivate_branch("doc-1", "feature").unwrap();
        assert!(!branch.is_active);
    }
}
