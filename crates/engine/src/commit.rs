//! Building new versions
//!
//! The commit path owns numbering, dedup, and the current-pointer flip. The
//! whole read-compute-flip-insert sequence runs under the entity write lock;
//! content resolution and hashing happen before the lock is taken.

use crate::error::{EngineError, Result};
use crate::model::{Metadata, Tag, Version, VersionStatus};
use crate::ports::{Clock, IdGenerator};
use crate::store::{EntityState, VersionStore};
use std::sync::Arc;
use strata_core::{hash_bytes, ContentHash, ContentRef, ContentStore, StoreError};
use ulid::Ulid;

/// Content for a new version: either inline bytes or a store reference
#[derive(Debug, Clone)]
pub enum ContentInput {
    Inline(Vec<u8>),
    Ref(ContentRef),
}

impl From<Vec<u8>> for ContentInput {
    fn from(bytes: Vec<u8>) -> Self {
        ContentInput::Inline(bytes)
    }
}

impl From<&[u8]> for ContentInput {
    fn from(bytes: &[u8]) -> Self {
        ContentInput::Inline(bytes.to_vec())
    }
}

impl From<&str> for ContentInput {
    fn from(text: &str) -> Self {
        ContentInput::Inline(text.as_bytes().to_vec())
    }
}

impl From<ContentRef> for ContentInput {
    fn from(content_ref: ContentRef) -> Self {
        ContentInput::Ref(content_ref)
    }
}

/// Request to create a version
#[derive(Debug, Clone)]
pub struct NewVersion {
    pub entity_id: String,
    pub author_id: String,
    pub author_name: String,
    pub content: ContentInput,
    pub mime_type: String,
    pub message: String,
    pub status: VersionStatus,
    /// Semantic label; defaults to `v<number>` when absent
    pub label: Option<String>,
    /// Tag to place on the committed version, in the same atomic step
    pub tag: Option<String>,
    pub metadata: Metadata,
    /// Optimistic check: fail with `Conflict` if the current version's id
    /// differs when the commit takes the lock
    pub expected_parent: Option<Ulid>,
}

impl NewVersion {
    pub fn new(
        entity_id: impl Into<String>,
        author_id: impl Into<String>,
        author_name: impl Into<String>,
        content: impl Into<ContentInput>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            author_id: author_id.into(),
            author_name: author_name.into(),
            content: content.into(),
            mime_type: "text/plain".to_string(),
            message: String::new(),
            status: VersionStatus::Draft,
            label: None,
            tag: None,
            metadata: Metadata::new(),
            expected_parent: None,
        }
    }

    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn status(mut self, status: VersionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn expected_parent(mut self, parent: Ulid) -> Self {
        self.expected_parent = Some(parent);
        self
    }
}

/// What a commit produced
#[derive(Debug, Clone)]
pub struct CommitOutcome {
    pub version: Version,
    /// False when dedup returned the existing current version
    pub created: bool,
    /// Tag placed alongside the commit, if requested
    pub tag: Option<Tag>,
}

/// Builds versions on top of the store and the content port
pub struct CommitBuilder {
    store: Arc<VersionStore>,
    content: Arc<dyn ContentStore>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl CommitBuilder {
    pub fn new(
        store: Arc<VersionStore>,
        content: Arc<dyn ContentStore>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            store,
            content,
            clock,
            ids,
        }
    }

    /// Create a new version, or return the current one on identical content
    pub fn commit(&self, request: NewVersion) -> Result<CommitOutcome> {
        if request.entity_id.is_empty() {
            return Err(EngineError::validation("entity_id must not be empty"));
        }

        let bytes = self.resolve(&request.content)?;
        let hash = hash_bytes(&bytes);

        let entity = self.store.entity_or_create(&request.entity_id);
        let mut state = entity.write();
        self.commit_locked(&mut state, request, &bytes, hash)
    }

    /// Commit against an entity whose write lock the caller already holds
    ///
    /// Used by the merge engine, which must keep the lock across its whole
    /// read-diff-commit sequence.
    pub(crate) fn commit_locked(
        &self,
        state: &mut EntityState,
        request: NewVersion,
        bytes: &[u8],
        hash: ContentHash,
    ) -> Result<CommitOutcome> {
        // Dedup: identical content to the current version is a no-op and
        // consumes no version number.
        if let Some(current) = state.current() {
            if current.content_hash == hash {
                tracing::debug!(
                    entity_id = %request.entity_id,
                    version = current.version_number,
                    "identical content, returning current version"
                );
                let version = current.clone();
                let tag = match &request.tag {
                    Some(name) => Some(place_tag(state, &version, name, &request, self.clock.now())?),
                    None => None,
                };
                return Ok(CommitOutcome {
                    version,
                    created: false,
                    tag,
                });
            }

            if let Some(expected) = request.expected_parent {
                if current.id != expected {
                    return Err(EngineError::conflict(format!(
                        "current version changed: expected {expected}, found {}",
                        current.id
                    )));
                }
            }
        } else if let Some(expected) = request.expected_parent {
            return Err(EngineError::conflict(format!(
                "current version changed: expected {expected}, entity has no versions"
            )));
        }

        // Validate the requested tag name before touching the log so a
        // duplicate aborts the whole commit.
        if let Some(name) = &request.tag {
            if state.tags.contains_key(name) {
                return Err(EngineError::conflict(format!(
                    "tag {name} already exists for entity {}",
                    request.entity_id
                )));
            }
        }

        let content_ref = self.content.put(bytes)?;

        let (version_number, parent_version_id) = match state.current() {
            Some(current) => (current.version_number + 1, Some(current.id)),
            None => (1, None),
        };

        let version = Version {
            id: self.ids.next_id(),
            entity_id: request.entity_id.clone(),
            version_number,
            label: request
                .label
                .clone()
                .unwrap_or_else(|| format!("v{version_number}")),
            content_hash: hash,
            content_ref,
            size: bytes.len() as u64,
            mime_type: request.mime_type.clone(),
            author_id: request.author_id.clone(),
            author_name: request.author_name.clone(),
            message: request.message.clone(),
            status: request.status,
            lock: None,
            is_current: true,
            parent_version_id,
            metadata: request.metadata.clone(),
            created_at: self.clock.now(),
        };

        state.insert_current(version.clone());
        tracing::info!(
            entity_id = %request.entity_id,
            version = version_number,
            hash = %hash,
            "version committed"
        );

        let tag = match &request.tag {
            Some(name) => Some(place_tag(state, &version, name, &request, self.clock.now())?),
            None => None,
        };

        Ok(CommitOutcome {
            version,
            created: true,
            tag,
        })
    }

    /// Resolve request content to bytes
    fn resolve(&self, content: &ContentInput) -> Result<Vec<u8>> {
        match content {
            ContentInput::Inline(bytes) => Ok(bytes.clone()),
            ContentInput::Ref(content_ref) => match self.content.get(content_ref) {
                Ok(bytes) => Ok(bytes),
                Err(StoreError::NotFound(_)) => Err(EngineError::not_found(format!(
                    "content reference {content_ref}"
                ))),
                Err(StoreError::InvalidRef(r)) => Err(EngineError::validation(format!(
                    "malformed content reference {r}"
                ))),
                Err(e) => Err(e.into()),
            },
        }
    }
}

fn place_tag(
    state: &mut EntityState,
    version: &Version,
    name: &str,
    request: &NewVersion,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<Tag> {
    if state.tags.contains_key(name) {
        return Err(EngineError::conflict(format!(
            "tag {name} already exists for entity {}",
            request.entity_id
        )));
    }
    let tag = Tag {
        name: name.to_string(),
        entity_id: request.entity_id.clone(),
        version_id: version.id,
        message: request.message.clone(),
        created_by: request.author_id.clone(),
        created_at: now,
    };
    state.tags.insert(name.to_string(), tag.clone());
    Ok(tag)
}
