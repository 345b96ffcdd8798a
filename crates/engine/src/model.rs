//! Version, branch, and tag data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strata_core::{ContentHash, ContentRef};
use ulid::Ulid;

/// Free-form metadata attached to a version
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Lifecycle status of a version
///
/// Transitions only move forward through this ordering; see `lifecycle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VersionStatus {
    Draft,
    Development,
    Stable,
    Deprecated,
    Archived,
}

impl VersionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionStatus::Draft => "draft",
            VersionStatus::Development => "development",
            VersionStatus::Stable => "stable",
            VersionStatus::Deprecated => "deprecated",
            VersionStatus::Archived => "archived",
        }
    }
}

impl std::fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lock record on a version
///
/// While present, status transitions and retention deletion are blocked.
/// `prior_status` is the status held immediately before locking; unlock
/// restores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionLock {
    pub prior_status: VersionStatus,
    pub locked_by: String,
    pub locked_at: DateTime<Utc>,
}

/// An immutable snapshot of an entity's content plus metadata
///
/// Created only by the commit path; never mutated afterwards except for
/// status/lock transitions and retention deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    /// Unique version id
    pub id: Ulid,
    /// Entity this version belongs to
    pub entity_id: String,
    /// Monotonic per-entity number, starting at 1
    pub version_number: u64,
    /// Semantic label, e.g. "1.0.0" (defaults to "v<number>")
    pub label: String,
    /// BLAKE3 hash of the content, always recomputed on commit
    pub content_hash: ContentHash,
    /// Reference into the content store
    pub content_ref: ContentRef,
    /// Content size in bytes
    pub size: u64,
    /// MIME type supplied by the caller
    pub mime_type: String,
    pub author_id: String,
    pub author_name: String,
    /// Commit message
    pub message: String,
    pub status: VersionStatus,
    /// Lock record, if the version is locked
    pub lock: Option<VersionLock>,
    /// Whether this is the entity's current version
    pub is_current: bool,
    /// Id of the version that was current when this one was committed
    pub parent_version_id: Option<Ulid>,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

impl Version {
    /// Whether the version is locked
    pub fn is_locked(&self) -> bool {
        self.lock.is_some()
    }
}

/// A named, movable pointer to a version, used as a merge endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    /// Branch name, unique per entity
    pub name: String,
    pub entity_id: String,
    /// Head version; always references an existing version of the entity
    pub head_version_id: Ulid,
    /// Branch this one was forked from, if any
    pub base_branch: Option<String>,
    pub created_by: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A named, immutable annotation on a specific version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    /// Tag name, unique per entity
    pub name: String,
    pub entity_id: String,
    pub version_id: Ulid,
    pub message: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Merge strategy selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeStrategy {
    /// Combine non-overlapping changes; overlapping regions conflict
    Merge,
    /// Take the source head's content verbatim
    Replace,
    /// Keep both heads' content, boundary-marked
    KeepBoth,
}

impl MergeStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeStrategy::Merge => "merge",
            MergeStrategy::Replace => "replace",
            MergeStrategy::KeepBoth => "keep_both",
        }
    }
}

impl std::str::FromStr for MergeStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "merge" => Ok(MergeStrategy::Merge),
            "replace" => Ok(MergeStrategy::Replace),
            "keep_both" => Ok(MergeStrategy::KeepBoth),
            other => Err(format!("unknown merge strategy: {other}")),
        }
    }
}

/// A content region the merge engine could not reconcile automatically
///
/// Ephemeral: produced as merge output and never persisted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConflict {
    /// Position of the region in the merge walk, starting at 0
    pub region_id: usize,
    /// The source head's lines for the region
    pub source_content: String,
    /// The target head's lines for the region
    pub target_content: String,
    /// Resolved content, when the strategy could produce one
    pub merged_content: Option<String>,
    pub resolution_strategy: MergeStrategy,
}

/// How a comparison is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffMode {
    Unified,
    SideBySide,
    Inline,
}

impl std::str::FromStr for DiffMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "unified" => Ok(DiffMode::Unified),
            "side_by_side" => Ok(DiffMode::SideBySide),
            "inline" => Ok(DiffMode::Inline),
            other => Err(format!("unknown diff mode: {other}")),
        }
    }
}

/// Kind of a single diff record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    Equal,
    Insert,
    Delete,
}

/// One line of a comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffRecord {
    pub kind: ChangeKind,
    /// Line index in the old content, absent for insertions
    pub old_index: Option<usize>,
    /// Line index in the new content, absent for deletions
    pub new_index: Option<usize>,
    /// Line content, without trailing newline
    pub content: String,
}

/// Line counters for a comparison
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub lines_added: usize,
    pub lines_removed: usize,
    pub lines_changed: usize,
    /// `to.size - from.size` in bytes
    pub size_delta: i64,
}

/// Result of comparing two versions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub from_version_id: Ulid,
    pub to_version_id: Ulid,
    pub mode: DiffMode,
    /// False when either side is binary; `diff_records` is then empty
    pub content_diff_available: bool,
    pub diff_records: Vec<DiffRecord>,
    /// Human-readable rendering in the requested mode
    pub rendered: String,
    pub stats: DiffStats,
}
