//! Read-only rollups over an entity's version history

use crate::model::VersionStatus;
use crate::store::VersionStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Per-author contribution summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contributor {
    pub author_id: String,
    pub author_name: String,
    pub version_count: usize,
    pub last_contribution: DateTime<Utc>,
}

/// Aggregate statistics for one entity
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityStatistics {
    pub total_versions: usize,
    pub status_distribution: BTreeMap<VersionStatus, usize>,
    pub total_size: u64,
    /// Sorted by version count, most active first
    pub contributors: Vec<Contributor>,
    pub latest_version_label: Option<String>,
}

/// Computes statistics off a consistent snapshot; no side effects
pub struct StatisticsAggregator {
    store: Arc<VersionStore>,
}

impl StatisticsAggregator {
    pub fn new(store: Arc<VersionStore>) -> Self {
        Self { store }
    }

    /// Statistics for one entity; unknown entities yield empty statistics
    pub fn get_statistics(&self, entity_id: &str) -> EntityStatistics {
        let versions = self.store.versions(entity_id);
        if versions.is_empty() {
            return EntityStatistics::default();
        }

        let mut status_distribution: BTreeMap<VersionStatus, usize> = BTreeMap::new();
        let mut total_size = 0u64;
        let mut by_author: BTreeMap<String, Contributor> = BTreeMap::new();
        let mut latest_version_label = None;

        for version in &versions {
            *status_distribution.entry(version.status).or_default() += 1;
            total_size += version.size;

            let entry = by_author
                .entry(version.author_id.clone())
                .or_insert_with(|| Contributor {
                    author_id: version.author_id.clone(),
                    author_name: version.author_name.clone(),
                    version_count: 0,
                    last_contribution: version.created_at,
                });
            entry.version_count += 1;
            if version.created_at > entry.last_contribution {
                entry.last_contribution = version.created_at;
            }

            if version.is_current {
                latest_version_label = Some(version.label.clone());
            }
        }

        let mut contributors: Vec<Contributor> = by_author.into_values().collect();
        contributors.sort_by(|a, b| {
            b.version_count
                .cmp(&a.version_count)
                .then_with(|| a.author_id.cmp(&b.author_id))
        });

        EntityStatistics {
            total_versions: versions.len(),
            status_distribution,
            total_size,
            contributors,
            latest_version_label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::{CommitBuilder, NewVersion};
    use crate::ports::{SystemClock, UlidGenerator};
    use strata_core::MemoryContentStore;

    fn setup() -> (CommitBuilder, StatisticsAggregator) {
        let store = Arc::new(VersionStore::new());
        let commit = CommitBuilder::new(
            store.clone(),
            Arc::new(MemoryContentStore::new()),
            Arc::new(SystemClock),
            Arc::new(UlidGenerator),
        );
        (commit, StatisticsAggregator::new(store))
    }

    #[test]
    fn test_rollup_counts_sizes_and_label() {
        let (commit, stats) = setup();
        commit
            .commit(NewVersion::new("doc-1", "alice", "Alice", "12345"))
            .unwrap();
        commit
            .commit(NewVersion::new("doc-1", "bob", "Bob", "1234567"))
            .unwrap();
        commit
            .commit(
                NewVersion::new("doc-1", "alice", "Alice", "123")
                    .status(VersionStatus::Stable)
                    .label("1.0.0"),
            )
            .unwrap();

        let result = stats.get_statistics("doc-1");
        assert_eq!(result.total_versions, 3);
        assert_eq!(result.total_size, 5 + 7 + 3);
        assert_eq!(result.status_distribution[&VersionStatus::Draft], 2);
        assert_eq!(result.status_distribution[&VersionStatus::Stable], 1);
        assert_eq!(result.latest_version_label.as_deref(), Some("1.0.0"));
    }

    #[test]
    fn test_contributors_sorted_by_activity() {
        let (commit, stats) = setup();
        for i in 0..3 {
            commit
                .commit(NewVersion::new(
                    "doc-1",
                    "alice",
                    "Alice",
                    format!("a{i}").as_bytes(),
                ))
                .unwrap();
        }
        commit
            .commit(NewVersion::new("doc-1", "bob", "Bob", "b"))
            .unwrap();

        let result = stats.get_statistics("doc-1");
        assert_eq!(result.contributors.len(), 2);
        assert_eq!(result.contributors[0].author_id, "alice");
        assert_eq!(result.contributors[0].version_count, 3);
        assert_eq!(result.contributors[1].author_id, "bob");
    }

    #[test]
    fn test_unknown_entity_is_empty() {
        let (_, stats) = setup();
        let result = stats.get_statistics("ghost");
        assert_eq!(result.total_versions, 0);
        assert!(result.contributors.is_empty());
        assert!(result.latest_version_label.is_none());
    }
}
