//! Branch merging
//!
//! The merge baseline is always "source head vs target head": the engine
//! tracks no common ancestor, so this is a two-way merge by contract. Under
//! the `Merge` strategy, equal regions pass through, one-sided regions merge
//! automatically, and regions where both heads carry different content at
//! the same position become conflicts. Conflicts are returned as data; a
//! conflicted merge commits nothing.
//!
//! The entity write lock is held for the whole read-diff-commit sequence so
//! a concurrent commit cannot invalidate the heads being compared.

use crate::cancel::CancellationToken;
use crate::commit::{CommitBuilder, NewVersion};
use crate::diff::is_binary;
use crate::error::{EngineError, Result};
use crate::model::{MergeConflict, MergeStrategy, Metadata, Version};
use crate::store::VersionStore;
use similar::{ChangeTag, DiffTag, TextDiff};
use std::sync::Arc;
use strata_core::hash_bytes;

/// Boundary marker strings (git-compatible)
const MARKER_START: &str = "<<<<<<<";
const MARKER_SEPARATOR: &str = "=======";
const MARKER_END: &str = ">>>>>>>";

/// A merge request between two branches of one entity
#[derive(Debug, Clone)]
pub struct MergeRequest {
    pub entity_id: String,
    pub source_branch: String,
    pub target_branch: String,
    pub author_id: String,
    pub author_name: String,
    pub strategy: MergeStrategy,
    pub cancel: Option<CancellationToken>,
}

impl MergeRequest {
    pub fn new(
        entity_id: impl Into<String>,
        source_branch: impl Into<String>,
        target_branch: impl Into<String>,
        author_id: impl Into<String>,
        author_name: impl Into<String>,
        strategy: MergeStrategy,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            source_branch: source_branch.into(),
            target_branch: target_branch.into(),
            author_id: author_id.into(),
            author_name: author_name.into(),
            strategy,
            cancel: None,
        }
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Result of a merge attempt
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub success: bool,
    pub conflicts: Vec<MergeConflict>,
    /// The committed merge version; absent when the merge did not succeed
    pub merged_version: Option<Version>,
}

/// Resolves or reports conflicts between branch heads
pub struct MergeEngine {
    store: Arc<VersionStore>,
    content: Arc<dyn strata_core::ContentStore>,
    commit: Arc<CommitBuilder>,
}

impl MergeEngine {
    pub fn new(
        store: Arc<VersionStore>,
        content: Arc<dyn strata_core::ContentStore>,
        commit: Arc<CommitBuilder>,
    ) -> Self {
        Self {
            store,
            content,
            commit,
        }
    }

    /// Merge the source branch head into the target branch
    pub fn merge_branches(&self, request: MergeRequest) -> Result<MergeOutcome> {
        let entity = self.store.entity_or_not_found(&request.entity_id)?;
        let mut state = entity.write();

        let source = state
            .branches
            .get(&request.source_branch)
            .cloned()
            .ok_or_else(|| {
                EngineError::not_found(format!(
                    "branch {} of entity {}",
                    request.source_branch, request.entity_id
                ))
            })?;
        let target = state
            .branches
            .get(&request.target_branch)
            .cloned()
            .ok_or_else(|| {
                EngineError::not_found(format!(
                    "branch {} of entity {}",
                    request.target_branch, request.entity_id
                ))
            })?;

        if !source.is_active || !target.is_active {
            return Err(EngineError::validation(format!(
                "cannot merge through an inactive branch ({} -> {})",
                request.source_branch, request.target_branch
            )));
        }

        let source_head = state
            .version(&source.head_version_id)
            .cloned()
            .ok_or_else(|| {
                EngineError::not_found(format!("head version of branch {}", source.name))
            })?;
        let target_head = state
            .version(&target.head_version_id)
            .cloned()
            .ok_or_else(|| {
                EngineError::not_found(format!("head version of branch {}", target.name))
            })?;

        let source_bytes = self.content.get(&source_head.content_ref)?;
        let target_bytes = self.content.get(&target_head.content_ref)?;
        let cancel = request.cancel.clone().unwrap_or_default();

        let merged_bytes = match request.strategy {
            MergeStrategy::Replace => source_bytes.clone(),
            MergeStrategy::KeepBoth => keep_both(
                &target_bytes,
                &source_bytes,
                &request.target_branch,
                &request.source_branch,
            ),
            MergeStrategy::Merge => {
                let (merged, conflicts) =
                    two_way_merge(&target_bytes, &source_bytes, &cancel)?;
                if !conflicts.is_empty() {
                    tracing::info!(
                        entity_id = %request.entity_id,
                        source = %request.source_branch,
                        target = %request.target_branch,
                        conflicts = conflicts.len(),
                        "merge stopped on conflicts"
                    );
                    return Ok(MergeOutcome {
                        success: false,
                        conflicts,
                        merged_version: None,
                    });
                }
                merged.into_bytes()
            }
        };

        let mut metadata = Metadata::new();
        metadata.insert(
            "merge_parents".to_string(),
            serde_json::json!([source_head.id.to_string(), target_head.id.to_string()]),
        );
        metadata.insert(
            "merge_strategy".to_string(),
            serde_json::json!(request.strategy.as_str()),
        );

        let message = format!(
            "Merge {} into {}",
            request.source_branch, request.target_branch
        );
        let commit_request = NewVersion::new(
            request.entity_id.clone(),
            request.author_id.clone(),
            request.author_name.clone(),
            merged_bytes.clone(),
        )
        .mime_type(target_head.mime_type.clone())
        .message(message)
        .metadata(metadata);

        let hash = hash_bytes(&merged_bytes);
        let outcome = self
            .commit
            .commit_locked(&mut state, commit_request, &merged_bytes, hash)?;

        // The merge lands on the target branch; advance its head.
        if let Some(branch) = state.branches.get_mut(&request.target_branch) {
            branch.head_version_id = outcome.version.id;
        }

        tracing::info!(
            entity_id = %request.entity_id,
            source = %request.source_branch,
            target = %request.target_branch,
            version = outcome.version.version_number,
            "branches merged"
        );

        Ok(MergeOutcome {
            success: true,
            conflicts: Vec::new(),
            merged_version: Some(outcome.version),
        })
    }
}

/// Two-way line merge of source into target
///
/// Returns the merged text and the conflict regions. Any conflict means the
/// merged text must be discarded by the caller.
fn two_way_merge(
    target_bytes: &[u8],
    source_bytes: &[u8],
    cancel: &CancellationToken,
) -> Result<(String, Vec<MergeConflict>)> {
    if is_binary(target_bytes) || is_binary(source_bytes) {
        // No line structure to reconcile; the whole content is one region.
        let conflict = MergeConflict {
            region_id: 0,
            source_content: String::from_utf8_lossy(source_bytes).into_owned(),
            target_content: String::from_utf8_lossy(target_bytes).into_owned(),
            merged_content: None,
            resolution_strategy: MergeStrategy::Merge,
        };
        return Ok((String::new(), vec![conflict]));
    }

    let target_text = String::from_utf8_lossy(target_bytes);
    let source_text = String::from_utf8_lossy(source_bytes);
    let diff = TextDiff::from_lines(target_text.as_ref(), source_text.as_ref());

    let mut merged = String::new();
    let mut conflicts = Vec::new();

    for op in diff.ops() {
        cancel.ensure_active()?;

        match op.tag() {
            DiffTag::Equal => {
                for change in diff.iter_changes(op) {
                    merged.push_str(change.value());
                }
            }
            // Lines only the target has: keep them.
            DiffTag::Delete => {
                for change in diff.iter_changes(op) {
                    merged.push_str(change.value());
                }
            }
            // Lines only the source has: adopt them.
            DiffTag::Insert => {
                for change in diff.iter_changes(op) {
                    merged.push_str(change.value());
                }
            }
            // Both heads carry different content at the same position.
            DiffTag::Replace => {
                let mut target_region = String::new();
                let mut source_region = String::new();
                for change in diff.iter_changes(op) {
                    match change.tag() {
                        ChangeTag::Delete => target_region.push_str(change.value()),
                        ChangeTag::Insert => source_region.push_str(change.value()),
                        ChangeTag::Equal => {}
                    }
                }
                conflicts.push(MergeConflict {
                    region_id: conflicts.len(),
                    source_content: strip_final_newline(source_region),
                    target_content: strip_final_newline(target_region),
                    merged_content: None,
                    resolution_strategy: MergeStrategy::Merge,
                });
            }
        }
    }

    Ok((merged, conflicts))
}

/// Target content then source content, separated by boundary markers
fn keep_both(
    target_bytes: &[u8],
    source_bytes: &[u8],
    target_label: &str,
    source_label: &str,
) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(format!("{MARKER_START} {target_label}\n").as_bytes());
    out.extend_from_slice(target_bytes);
    if !target_bytes.ends_with(b"\n") && !target_bytes.is_empty() {
        out.push(b'\n');
    }
    out.extend_from_slice(format!("{MARKER_SEPARATOR}\n").as_bytes());
    out.extend_from_slice(source_bytes);
    if !source_bytes.ends_with(b"\n") && !source_bytes.is_empty() {
        out.push(b'\n');
    }
    out.extend_from_slice(format!("{MARKER_END} {source_label}\n").as_bytes());
    out
}

fn strip_final_newline(mut s: String) -> String {
    if s.ends_with('\n') {
        s.pop();
    }
    s
}
