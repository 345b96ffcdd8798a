//! Consumed ports: clock, id generation, and event publishing
//!
//! All three are injected so tests can pin time and ids. Event publishing is
//! fire-and-forget: a failing publisher is logged and never fails the
//! operation that triggered it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use ulid::Ulid;

/// Time source
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Version id source
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> Ulid;
}

/// Random, time-ordered ULIDs
#[derive(Debug, Default)]
pub struct UlidGenerator;

impl IdGenerator for UlidGenerator {
    fn next_id(&self) -> Ulid {
        Ulid::new()
    }
}

/// Kind of engine event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    VersionCreated,
    Tagged,
    Branched,
    Merged,
    RolledBack,
    Archived,
    Locked,
    Unlocked,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::VersionCreated => "version_created",
            EventKind::Tagged => "tagged",
            EventKind::Branched => "branched",
            EventKind::Merged => "merged",
            EventKind::RolledBack => "rolled_back",
            EventKind::Archived => "archived",
            EventKind::Locked => "locked",
            EventKind::Unlocked => "unlocked",
        }
    }
}

/// A notification emitted after a successful engine mutation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub entity_id: String,
    pub version_id: Option<Ulid>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Event {
    pub fn new(kind: EventKind, entity_id: impl Into<String>) -> Self {
        Self {
            kind,
            entity_id: entity_id.into(),
            version_id: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_version(mut self, version_id: Ulid) -> Self {
        self.version_id = Some(version_id);
        self
    }

    pub fn with_meta(mut self, key: &str, value: serde_json::Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

/// Error from an event publisher
#[derive(Debug, Error)]
#[error("event publish failed: {0}")]
pub struct PublishError(pub String);

/// Fire-and-forget event sink
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: &Event) -> std::result::Result<(), PublishError>;
}

/// Discards every event
#[derive(Debug, Default)]
pub struct NullPublisher;

impl EventPublisher for NullPublisher {
    fn publish(&self, _event: &Event) -> std::result::Result<(), PublishError> {
        Ok(())
    }
}

/// Logs every event through `tracing`
#[derive(Debug, Default)]
pub struct LogPublisher;

impl EventPublisher for LogPublisher {
    fn publish(&self, event: &Event) -> std::result::Result<(), PublishError> {
        tracing::info!(
            kind = event.kind.as_str(),
            entity_id = %event.entity_id,
            version_id = ?event.version_id,
            "engine event"
        );
        Ok(())
    }
}
