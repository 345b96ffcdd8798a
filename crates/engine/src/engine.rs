//! The engine facade
//!
//! `VersionEngine` wires every component over one shared `VersionStore` and
//! exposes the full operation surface. All mutations flow through the store's
//! per-entity locks; events fan out after a mutation succeeds and a failing
//! publisher never fails the operation.

use crate::branch::BranchManager;
use crate::cancel::CancellationToken;
use crate::commit::{CommitBuilder, NewVersion};
use crate::config::EngineConfig;
use crate::diff::DiffEngine;
use crate::error::Result;
use crate::export::{self, ExportFormat};
use crate::merge::{MergeEngine, MergeOutcome, MergeRequest};
use crate::model::{Branch, ComparisonResult, DiffMode, Tag, Version, VersionStatus};
use crate::ports::{Clock, Event, EventKind, EventPublisher, IdGenerator};
use crate::ports::{NullPublisher, SystemClock, UlidGenerator};
use crate::query::{ListQuery, VersionPage};
use crate::retention::RetentionPolicy;
use crate::rollback::RollbackOperation;
use crate::stats::{EntityStatistics, StatisticsAggregator};
use crate::store::VersionStore;
use crate::tag::TagManager;
use std::sync::Arc;
use strata_core::ContentStore;
use ulid::Ulid;

/// Configures and builds a `VersionEngine`
pub struct VersionEngineBuilder {
    content: Arc<dyn ContentStore>,
    events: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    config: EngineConfig,
}

impl VersionEngineBuilder {
    pub fn events(mut self, events: Arc<dyn EventPublisher>) -> Self {
        self.events = events;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> VersionEngine {
        let store = Arc::new(VersionStore::new());
        let commit = Arc::new(CommitBuilder::new(
            store.clone(),
            self.content.clone(),
            self.clock.clone(),
            self.ids.clone(),
        ));

        VersionEngine {
            branches: BranchManager::new(store.clone(), self.clock.clone()),
            tags: TagManager::new(store.clone(), self.clock.clone()),
            diff: DiffEngine::new(self.config.diff.context_lines),
            merge: MergeEngine::new(store.clone(), self.content.clone(), commit.clone()),
            retention: RetentionPolicy::new(
                store.clone(),
                self.clock.clone(),
                self.config.retention.protect_tagged,
            ),
            stats: StatisticsAggregator::new(store.clone()),
            rollback: RollbackOperation::new(store.clone(), self.content.clone(), commit.clone()),
            commit,
            store,
            content: self.content,
            events: self.events,
            clock: self.clock,
            config: self.config,
        }
    }
}

/// Version control over named, mutable artifacts
pub struct VersionEngine {
    store: Arc<VersionStore>,
    content: Arc<dyn ContentStore>,
    events: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    commit: Arc<CommitBuilder>,
    branches: BranchManager,
    tags: TagManager,
    diff: DiffEngine,
    merge: MergeEngine,
    retention: RetentionPolicy,
    stats: StatisticsAggregator,
    rollback: RollbackOperation,
}

impl VersionEngine {
    /// Engine with default ports and configuration
    pub fn new(content: Arc<dyn ContentStore>) -> Self {
        Self::builder(content).build()
    }

    /// Start configuring an engine
    pub fn builder(content: Arc<dyn ContentStore>) -> VersionEngineBuilder {
        VersionEngineBuilder {
            content,
            events: Arc::new(NullPublisher),
            clock: Arc::new(SystemClock),
            ids: Arc::new(UlidGenerator),
            config: EngineConfig::default(),
        }
    }

    /// Create a new version (or return the current one on identical content)
    pub fn create_version(&self, request: NewVersion) -> Result<Version> {
        let outcome = self.commit.commit(request)?;

        if outcome.created {
            self.emit(
                Event::new(EventKind::VersionCreated, &outcome.version.entity_id)
                    .with_version(outcome.version.id)
                    .with_meta(
                        "version_number",
                        serde_json::json!(outcome.version.version_number),
                    ),
            );
        }
        if let Some(tag) = &outcome.tag {
            self.emit(
                Event::new(EventKind::Tagged, &tag.entity_id)
                    .with_version(tag.version_id)
                    .with_meta("tag", serde_json::json!(tag.name)),
            );
        }

        Ok(outcome.version)
    }

    pub fn get_version(&self, entity_id: &str, version_id: &Ulid) -> Result<Version> {
        self.store.get_version(entity_id, version_id)
    }

    pub fn get_current_version(&self, entity_id: &str) -> Result<Version> {
        self.store.current_version(entity_id)
    }

    pub fn list_versions(&self, entity_id: &str, query: &ListQuery) -> VersionPage {
        self.store.list(entity_id, query)
    }

    pub fn tag_version(
        &self,
        entity_id: &str,
        version_id: &Ulid,
        name: &str,
        message: &str,
        created_by: &str,
    ) -> Result<Tag> {
        let tag = self
            .tags
            .tag_version(entity_id, version_id, name, message, created_by)?;
        self.emit(
            Event::new(EventKind::Tagged, entity_id)
                .with_version(*version_id)
                .with_meta("tag", serde_json::json!(name)),
        );
        Ok(tag)
    }

    pub fn list_tags(&self, entity_id: &str) -> Vec<Tag> {
        self.tags.list_tags(entity_id)
    }

    pub fn create_branch(
        &self,
        entity_id: &str,
        version_id: &Ulid,
        name: &str,
        created_by: &str,
        base_branch: Option<&str>,
    ) -> Result<Branch> {
        let branch =
            self.branches
                .create_branch(entity_id, version_id, name, created_by, base_branch)?;
        self.emit(
            Event::new(EventKind::Branched, entity_id)
                .with_version(*version_id)
                .with_meta("branch", serde_json::json!(name)),
        );
        Ok(branch)
    }

    pub fn list_branches(&self, entity_id: &str) -> Vec<Branch> {
        self.branches.list_branches(entity_id)
    }

    pub fn deactivate_branch(&self, entity_id: &str, name: &str) -> Result<Branch> {
        self.branches.deactivate_branch(entity_id, name)
    }

    /// Compare two versions of an entity
    pub fn compare_versions(
        &self,
        entity_id: &str,
        from_version_id: &Ulid,
        to_version_id: &Ulid,
        mode: DiffMode,
    ) -> Result<ComparisonResult> {
        self.compare_versions_with(
            entity_id,
            from_version_id,
            to_version_id,
            mode,
            &CancellationToken::new(),
        )
    }

    /// Compare with a caller-supplied cancellation token
    pub fn compare_versions_with(
        &self,
        entity_id: &str,
        from_version_id: &Ulid,
        to_version_id: &Ulid,
        mode: DiffMode,
        cancel: &CancellationToken,
    ) -> Result<ComparisonResult> {
        let from = self.store.get_version(entity_id, from_version_id)?;
        let to = self.store.get_version(entity_id, to_version_id)?;
        let from_bytes = self.content.get(&from.content_ref)?;
        let to_bytes = self.content.get(&to.content_ref)?;

        self.diff
            .compare(&from, &to, &from_bytes, &to_bytes, mode, cancel)
    }

    /// Merge one branch into another; conflicts come back as data
    pub fn merge_branches(&self, request: MergeRequest) -> Result<MergeOutcome> {
        let entity_id = request.entity_id.clone();
        let source = request.source_branch.clone();
        let target = request.target_branch.clone();

        let outcome = self.merge.merge_branches(request)?;

        if outcome.success {
            let mut event = Event::new(EventKind::Merged, &entity_id)
                .with_meta("source_branch", serde_json::json!(source))
                .with_meta("target_branch", serde_json::json!(target));
            if let Some(version) = &outcome.merged_version {
                event = event.with_version(version.id);
            }
            self.emit(event);
        }

        Ok(outcome)
    }

    /// Restore an earlier version's content as a new current version
    pub fn rollback_version(
        &self,
        entity_id: &str,
        target_version_id: &Ulid,
        author_id: &str,
        author_name: &str,
        reason: &str,
    ) -> Result<Version> {
        let version = self.rollback.rollback_version(
            entity_id,
            target_version_id,
            author_id,
            author_name,
            reason,
        )?;
        self.emit(
            Event::new(EventKind::RolledBack, entity_id)
                .with_version(version.id)
                .with_meta("restored_from", serde_json::json!(target_version_id.to_string())),
        );
        Ok(version)
    }

    /// Forward status transition
    pub fn set_status(
        &self,
        entity_id: &str,
        version_id: &Ulid,
        status: VersionStatus,
    ) -> Result<Version> {
        self.store.set_status(entity_id, version_id, status)
    }

    /// Move a non-current version to `Archived`
    pub fn archive_version(&self, entity_id: &str, version_id: &Ulid) -> Result<Version> {
        let version = self
            .store
            .set_status(entity_id, version_id, VersionStatus::Archived)?;
        self.emit(Event::new(EventKind::Archived, entity_id).with_version(*version_id));
        Ok(version)
    }

    /// Block status transitions and retention deletion for a version
    pub fn lock_version(
        &self,
        entity_id: &str,
        version_id: &Ulid,
        locked_by: &str,
    ) -> Result<Version> {
        let version =
            self.store
                .lock_version(entity_id, version_id, locked_by, self.clock.now())?;
        self.emit(Event::new(EventKind::Locked, entity_id).with_version(*version_id));
        Ok(version)
    }

    /// Unlock a version, restoring its pre-lock status
    pub fn unlock_version(&self, entity_id: &str, version_id: &Ulid) -> Result<Version> {
        let version = self.store.unlock_version(entity_id, version_id)?;
        self.emit(Event::new(EventKind::Unlocked, entity_id).with_version(*version_id));
        Ok(version)
    }

    /// Delete old versions of an entity
    ///
    /// `keep_count = None` uses the configured default window.
    pub fn cleanup_old_versions(
        &self,
        entity_id: &str,
        keep_count: Option<usize>,
        older_than_days: Option<i64>,
    ) -> Result<usize> {
        let keep = keep_count.unwrap_or(self.config.retention.keep_count);
        self.retention
            .cleanup_old_versions(entity_id, keep, older_than_days)
    }

    /// Best-effort cleanup across all entities
    pub fn cleanup_all(&self, keep_count: Option<usize>, older_than_days: Option<i64>) -> usize {
        let keep = keep_count.unwrap_or(self.config.retention.keep_count);
        self.retention.cleanup_all(keep, older_than_days)
    }

    /// Read-only statistics for an entity
    pub fn get_statistics(&self, entity_id: &str) -> EntityStatistics {
        self.stats.get_statistics(entity_id)
    }

    /// Render a version with its content in the requested format
    pub fn export_version(
        &self,
        entity_id: &str,
        version_id: &Ulid,
        format: ExportFormat,
    ) -> Result<String> {
        let version = self.store.get_version(entity_id, version_id)?;
        let content = self.content.get(&version.content_ref)?;
        export::export_version(&version, &content, format)
    }

    fn emit(&self, event: Event) {
        if let Err(e) = self.events.publish(&event) {
            tracing::warn!(
                kind = event.kind.as_str(),
                entity_id = %event.entity_id,
                error = %e,
                "event publish failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::PublishError;
    use parking_lot::Mutex;
    use strata_core::MemoryContentStore;

    /// Publisher that records every event
    #[derive(Default)]
    struct RecordingPublisher {
        events: Mutex<Vec<Event>>,
    }

    impl EventPublisher for RecordingPublisher {
        fn publish(&self, event: &Event) -> std::result::Result<(), PublishError> {
            self.events.lock().push(event.clone());
            Ok(())
        }
    }

    /// Publisher that always fails
    struct FailingPublisher;

    impl EventPublisher for FailingPublisher {
        fn publish(&self, _event: &Event) -> std::result::Result<(), PublishError> {
            Err(PublishError("sink unavailable".to_string()))
        }
    }

    fn engine_with(events: Arc<dyn EventPublisher>) -> VersionEngine {
        VersionEngine::builder(Arc::new(MemoryContentStore::new()))
            .events(events)
            .build()
    }

    #[test]
    fn test_create_version_publishes_event() {
        let recorder = Arc::new(RecordingPublisher::default());
        let engine = engine_with(recorder.clone());

        engine
            .create_version(NewVersion::new("doc-1", "u1", "User One", "body"))
            .unwrap();

        let events = recorder.events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::VersionCreated);
        assert_eq!(events[0].entity_id, "doc-1");
    }

    #[test]
    fn test_dedup_noop_publishes_nothing() {
        let recorder = Arc::new(RecordingPublisher::default());
        let engine = engine_with(recorder.clone());

        engine
            .create_version(NewVersion::new("doc-1", "u1", "User One", "same"))
            .unwrap();
        engine
            .create_version(NewVersion::new("doc-1", "u1", "User One", "same"))
            .unwrap();

        assert_eq!(recorder.events.lock().len(), 1);
    }

    #[test]
    fn test_publish_failure_never_fails_operation() {
        let engine = engine_with(Arc::new(FailingPublisher));

        let version = engine
            .create_version(NewVersion::new("doc-1", "u1", "User One", "body"))
            .unwrap();
        assert_eq!(version.version_number, 1);
    }

    #[test]
    fn test_lock_unlock_events() {
        let recorder = Arc::new(RecordingPublisher::default());
        let engine = engine_with(recorder.clone());

        let version = engine
            .create_version(NewVersion::new("doc-1", "u1", "User One", "body"))
            .unwrap();
        engine.lock_version("doc-1", &version.id, "u1").unwrap();
        engine.unlock_version("doc-1", &version.id).unwrap();

        let kinds: Vec<EventKind> = recorder.events.lock().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![EventKind::VersionCreated, EventKind::Locked, EventKind::Unlocked]
        );
    }

    #[test]
    fn test_cleanup_uses_configured_default() {
        let mut config = EngineConfig::default();
        config.retention.keep_count = 2;

        let engine = VersionEngine::builder(Arc::new(MemoryContentStore::new()))
            .config(config)
            .build();

        for i in 0..5 {
            engine
                .create_version(NewVersion::new(
                    "doc-1",
                    "u1",
                    "User One",
                    format!("content {i}").as_bytes(),
                ))
                .unwrap();
        }

        let deleted = engine.cleanup_old_versions("doc-1", None, None).unwrap();
        assert_eq!(deleted, 3);
    }
}
