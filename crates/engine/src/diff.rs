//! Line-based comparison between two versions

use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::model::{ChangeKind, ComparisonResult, DiffMode, DiffRecord, DiffStats, Version};
use similar::{ChangeTag, DiffTag, TextDiff};

/// Check if content is binary (contains null bytes in first 8KB)
pub fn is_binary(content: &[u8]) -> bool {
    content.iter().take(8192).any(|&b| b == 0)
}

/// Myers line diff over version content
pub struct DiffEngine {
    context_lines: usize,
}

impl DiffEngine {
    pub fn new(context_lines: usize) -> Self {
        Self { context_lines }
    }

    /// Compare two versions' content
    ///
    /// Binary content on either side yields no diff records, but the size
    /// delta is still reported.
    pub fn compare(
        &self,
        from: &Version,
        to: &Version,
        from_bytes: &[u8],
        to_bytes: &[u8],
        mode: DiffMode,
        cancel: &CancellationToken,
    ) -> Result<ComparisonResult> {
        let size_delta = to.size as i64 - from.size as i64;

        if is_binary(from_bytes) || is_binary(to_bytes) {
            return Ok(ComparisonResult {
                from_version_id: from.id,
                to_version_id: to.id,
                mode,
                content_diff_available: false,
                diff_records: Vec::new(),
                rendered: String::new(),
                stats: DiffStats {
                    size_delta,
                    ..Default::default()
                },
            });
        }

        let from_text = String::from_utf8_lossy(from_bytes);
        let to_text = String::from_utf8_lossy(to_bytes);
        let diff = TextDiff::from_lines(from_text.as_ref(), to_text.as_ref());

        let mut records = Vec::new();
        let mut stats = DiffStats {
            size_delta,
            ..Default::default()
        };

        for op in diff.ops() {
            cancel.ensure_active()?;

            match op.tag() {
                DiffTag::Equal => {}
                DiffTag::Delete => stats.lines_removed += op.old_range().len(),
                DiffTag::Insert => stats.lines_added += op.new_range().len(),
                DiffTag::Replace => {
                    let old_len = op.old_range().len();
                    let new_len = op.new_range().len();
                    let paired = old_len.min(new_len);
                    stats.lines_changed += paired;
                    stats.lines_removed += old_len - paired;
                    stats.lines_added += new_len - paired;
                }
            }

            for change in diff.iter_changes(op) {
                let kind = match change.tag() {
                    ChangeTag::Equal => ChangeKind::Equal,
                    ChangeTag::Delete => ChangeKind::Delete,
                    ChangeTag::Insert => ChangeKind::Insert,
                };
                records.push(DiffRecord {
                    kind,
                    old_index: change.old_index(),
                    new_index: change.new_index(),
                    content: change.value().trim_end_matches('\n').to_string(),
                });
            }
        }

        let rendered = match mode {
            DiffMode::Unified => self.render_unified(&diff),
            DiffMode::SideBySide => render_side_by_side(&records),
            DiffMode::Inline => render_inline(&records),
        };

        Ok(ComparisonResult {
            from_version_id: from.id,
            to_version_id: to.id,
            mode,
            content_diff_available: true,
            diff_records: records,
            rendered,
            stats,
        })
    }

    fn render_unified<'a>(&self, diff: &TextDiff<'a, 'a, 'a, str>) -> String {
        let mut output = String::new();

        for (hunk_idx, hunk) in diff
            .unified_diff()
            .context_radius(self.context_lines)
            .iter_hunks()
            .enumerate()
        {
            if hunk_idx > 0 {
                output.push('\n');
            }
            output.push_str(&format!("{}\n", hunk.header()));

            for change in hunk.iter_changes() {
                let sign = match change.tag() {
                    ChangeTag::Delete => '-',
                    ChangeTag::Insert => '+',
                    ChangeTag::Equal => ' ',
                };
                output.push(sign);
                output.push_str(change.value());
                if !change.value().ends_with('\n') {
                    output.push('\n');
                }
            }
        }

        output
    }
}

fn render_inline(records: &[DiffRecord]) -> String {
    let mut output = String::new();
    for record in records {
        let sign = match record.kind {
            ChangeKind::Delete => '-',
            ChangeKind::Insert => '+',
            ChangeKind::Equal => ' ',
        };
        output.push(sign);
        output.push_str(&record.content);
        output.push('\n');
    }
    output
}

fn render_side_by_side(records: &[DiffRecord]) -> String {
    const COLUMN: usize = 40;
    let mut output = String::new();
    for record in records {
        let line = match record.kind {
            ChangeKind::Equal => {
                format!("{:<COLUMN$} | {}", record.content, record.content)
            }
            ChangeKind::Delete => format!("{:<COLUMN$} <", record.content),
            ChangeKind::Insert => format!("{:<COLUMN$} > {}", "", record.content),
        };
        output.push_str(line.trim_end());
        output.push('\n');
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::model::{Metadata, VersionStatus};
    use chrono::Utc;
    use strata_core::{hash_bytes, ContentRef};
    use ulid::Ulid;

    fn version(content: &[u8]) -> Version {
        let hash = hash_bytes(content);
        Version {
            id: Ulid::new(),
            entity_id: "doc-1".to_string(),
            version_number: 1,
            label: "v1".to_string(),
            content_hash: hash,
            content_ref: ContentRef::from_hash(&hash),
            size: content.len() as u64,
            mime_type: "text/plain".to_string(),
            author_id: "u1".to_string(),
            author_name: "User One".to_string(),
            message: String::new(),
            status: VersionStatus::Draft,
            lock: None,
            is_current: true,
            parent_version_id: None,
            metadata: Metadata::new(),
            created_at: Utc::now(),
        }
    }

    fn compare(from: &[u8], to: &[u8], mode: DiffMode) -> ComparisonResult {
        let engine = DiffEngine::new(3);
        let a = version(from);
        let b = version(to);
        engine
            .compare(&a, &b, from, to, mode, &CancellationToken::new())
            .unwrap()
    }

    #[test]
    fn test_is_binary() {
        assert!(!is_binary(b"Hello, world!"));
        assert!(!is_binary(b"Line 1\nLine 2\nLine 3"));
        assert!(is_binary(b"Hello\x00world"));
        assert!(is_binary(&[0u8; 100]));
    }

    #[test]
    fn test_single_changed_line() {
        let result = compare(b"a\nb\nc", b"a\nx\nc", DiffMode::Unified);

        assert!(result.content_diff_available);
        assert_eq!(result.stats.lines_changed, 1);
        assert_eq!(result.stats.lines_added, 0);
        assert_eq!(result.stats.lines_removed, 0);
        assert_eq!(result.stats.size_delta, 0);
    }

    #[test]
    fn test_pure_insertion() {
        let result = compare(b"a\nb\n", b"a\nnew\nb\n", DiffMode::Unified);

        assert_eq!(result.stats.lines_added, 1);
        assert_eq!(result.stats.lines_removed, 0);
        assert_eq!(result.stats.lines_changed, 0);
        assert_eq!(result.stats.size_delta, 4);
    }

    #[test]
    fn test_pure_deletion() {
        let result = compare(b"a\nb\nc\n", b"a\nc\n", DiffMode::Inline);

        assert_eq!(result.stats.lines_removed, 1);
        assert_eq!(result.stats.size_delta, -2);
        assert!(result.rendered.contains("-b"));
    }

    #[test]
    fn test_identical_content_has_no_changes() {
        let result = compare(b"same\n", b"same\n", DiffMode::Unified);

        assert_eq!(result.stats.lines_added, 0);
        assert_eq!(result.stats.lines_removed, 0);
        assert_eq!(result.stats.lines_changed, 0);
        assert!(result.rendered.is_empty());
    }

    #[test]
    fn test_binary_content_skips_diff() {
        let result = compare(b"text", b"bin\x00ary", DiffMode::Unified);

        assert!(!result.content_diff_available);
        assert!(result.diff_records.is_empty());
        assert_eq!(result.stats.size_delta, 3);
    }

    #[test]
    fn test_unified_rendering_has_hunk_header() {
        let result = compare(b"a\nb\nc\n", b"a\nx\nc\n", DiffMode::Unified);
        assert!(result.rendered.contains("@@"));
        assert!(result.rendered.contains("-b"));
        assert!(result.rendered.contains("+x"));
    }

    #[test]
    fn test_cancelled_compare_errors() {
        let engine = DiffEngine::new(3);
        let a = version(b"a\nb\n");
        let b = version(b"a\nc\n");
        let token = CancellationToken::new();
        token.cancel();

        let result = engine.compare(&a, &b, b"a\nb\n", b"a\nc\n", DiffMode::Unified, &token);
        assert!(matches!(result, Err(EngineError::Cancelled)));
    }
}
