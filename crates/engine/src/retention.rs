//! Retention cleanup over old versions
//!
//! The newest `keep_count` versions are retained; older ones are deleted
//! unless protected. Protected and never deletable: the current version,
//! locked versions, and, when the policy says so, tagged versions.

use crate::error::Result;
use crate::ports::Clock;
use crate::store::VersionStore;
use std::collections::HashSet;
use std::sync::Arc;
use ulid::Ulid;

/// Prunes old versions, respecting protection invariants
pub struct RetentionPolicy {
    store: Arc<VersionStore>,
    clock: Arc<dyn Clock>,
    protect_tagged: bool,
}

impl RetentionPolicy {
    pub fn new(store: Arc<VersionStore>, clock: Arc<dyn Clock>, protect_tagged: bool) -> Self {
        Self {
            store,
            clock,
            protect_tagged,
        }
    }

    /// Delete old versions of one entity, returning how many were deleted
    ///
    /// `keep_count` is the size of the newest-versions window that survives
    /// regardless of age. With `older_than_days`, deletion is further
    /// restricted to versions older than the cutoff. Nothing to delete is a
    /// normal outcome, not an error.
    pub fn cleanup_old_versions(
        &self,
        entity_id: &str,
        keep_count: usize,
        older_than_days: Option<i64>,
    ) -> Result<usize> {
        let entity = match self.store.entity(entity_id) {
            Some(entity) => entity,
            None => return Ok(0),
        };
        let mut state = entity.write();

        let mut ranked: Vec<(chrono::DateTime<chrono::Utc>, u64, Ulid)> = state
            .log
            .iter()
            .map(|v| (v.created_at, v.version_number, v.id))
            .collect();
        ranked.sort_by(|a, b| (b.0, b.1).cmp(&(a.0, a.1)));
        let retained: HashSet<Ulid> = ranked.iter().take(keep_count).map(|r| r.2).collect();

        let cutoff = older_than_days.map(|days| self.clock.now() - chrono::Duration::days(days));
        let tagged: HashSet<Ulid> = if self.protect_tagged {
            state.tags.values().map(|t| t.version_id).collect()
        } else {
            HashSet::new()
        };

        let doomed: HashSet<Ulid> = state
            .log
            .iter()
            .filter(|v| {
                !v.is_current
                    && !v.is_locked()
                    && !retained.contains(&v.id)
                    && !tagged.contains(&v.id)
                    && cutoff.map_or(true, |c| v.created_at < c)
            })
            .map(|v| v.id)
            .collect();

        let deleted = doomed.len();
        state.remove_versions(&doomed);

        if deleted > 0 {
            tracing::info!(entity_id, deleted, keep_count, "old versions cleaned up");
        }
        Ok(deleted)
    }

    /// Best-effort cleanup across every entity
    ///
    /// A failing entity is logged and skipped; the batch never aborts.
    pub fn cleanup_all(&self, keep_count: usize, older_than_days: Option<i64>) -> usize {
        let mut total = 0;
        for entity_id in self.store.entity_ids() {
            match self.cleanup_old_versions(&entity_id, keep_count, older_than_days) {
                Ok(deleted) => total += deleted,
                Err(e) => {
                    tracing::warn!(entity_id = %entity_id, error = %e, "cleanup failed, continuing");
                }
            }
        }
        total
    }
}
