//! Version control engine for named, mutable artifacts
//!
//! Every update to an entity is captured as an immutable, content-addressed
//! version; versions can be branched, tagged, rolled back, diffed, and
//! merged, and old versions are pruned under a retention policy.
//!
//! This crate provides:
//! - `VersionStore`: per-entity append-only version logs (the lock boundary)
//! - `CommitBuilder`: numbering, dedup, and the current-pointer flip
//! - `BranchManager` / `TagManager`: named pointers into the log
//! - `DiffEngine` / `MergeEngine`: line diff and two-way branch merge
//! - `RetentionPolicy`, `StatisticsAggregator`, `RollbackOperation`
//! - `VersionEngine`: the facade tying it all together over the
//!   `ContentStore`, `Clock`, `IdGenerator`, and `EventPublisher` ports

pub mod branch;
pub mod cancel;
pub mod commit;
pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod export;
mod lifecycle;
pub mod merge;
pub mod model;
pub mod ports;
pub mod query;
pub mod retention;
pub mod rollback;
pub mod stats;
pub mod store;
pub mod tag;

// Re-exports
pub use branch::BranchManager;
pub use cancel::CancellationToken;
pub use commit::{CommitBuilder, CommitOutcome, ContentInput, NewVersion};
pub use config::EngineConfig;
pub use diff::DiffEngine;
pub use engine::{VersionEngine, VersionEngineBuilder};
pub use error::{EngineError, Result};
pub use export::ExportFormat;
pub use merge::{MergeEngine, MergeOutcome, MergeRequest};
pub use model::{
    Branch, ChangeKind, ComparisonResult, DiffMode, DiffRecord, DiffStats, MergeConflict,
    MergeStrategy, Metadata, Tag, Version, VersionLock, VersionStatus,
};
pub use ports::{
    Clock, Event, EventKind, EventPublisher, IdGenerator, LogPublisher, NullPublisher,
    PublishError, SystemClock, UlidGenerator,
};
pub use query::{ListQuery, SortField, SortOrder, VersionFilter, VersionPage};
pub use retention::RetentionPolicy;
pub use rollback::RollbackOperation;
pub use stats::{Contributor, EntityStatistics, StatisticsAggregator};
pub use store::VersionStore;
pub use tag::TagManager;
