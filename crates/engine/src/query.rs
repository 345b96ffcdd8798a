//! Filtering, sorting, and pagination over version snapshots

use crate::model::{Version, VersionStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Filter applied to a version listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionFilter {
    pub status: Option<VersionStatus>,
    /// Matches `author_id` or `author_name` exactly
    pub author: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
    /// Case-insensitive substring match on label or message
    pub contains: Option<String>,
    pub is_current: Option<bool>,
}

impl VersionFilter {
    pub(crate) fn matches(&self, version: &Version) -> bool {
        if let Some(status) = self.status {
            if version.status != status {
                return false;
            }
        }
        if let Some(author) = &self.author {
            if version.author_id != *author && version.author_name != *author {
                return false;
            }
        }
        if let Some(after) = self.created_after {
            if version.created_at < after {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if version.created_at > before {
                return false;
            }
        }
        if let Some(min) = self.min_size {
            if version.size < min {
                return false;
            }
        }
        if let Some(max) = self.max_size {
            if version.size > max {
                return false;
            }
        }
        if let Some(needle) = &self.contains {
            let needle = needle.to_lowercase();
            let in_label = version.label.to_lowercase().contains(&needle);
            let in_message = version.message.to_lowercase().contains(&needle);
            if !in_label && !in_message {
                return false;
            }
        }
        if let Some(is_current) = self.is_current {
            if version.is_current != is_current {
                return false;
            }
        }
        true
    }
}

/// Sortable fields of a version listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortField {
    #[default]
    CreatedAt,
    VersionNumber,
    Author,
    Size,
    Status,
}

/// Sort direction; listings default to newest-first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

/// A full listing request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListQuery {
    pub filter: VersionFilter,
    pub sort: SortField,
    pub order: SortOrder,
    /// 1-based page number
    pub page: usize,
    pub page_size: usize,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            filter: VersionFilter::default(),
            sort: SortField::default(),
            order: SortOrder::default(),
            page: 1,
            page_size: 50,
        }
    }
}

/// One page of a version listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionPage {
    pub versions: Vec<Version>,
    /// Total matches before pagination
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

/// Apply filter, sort, and pagination to a snapshot
pub(crate) fn run(mut versions: Vec<Version>, query: &ListQuery) -> VersionPage {
    versions.retain(|v| query.filter.matches(v));
    let total = versions.len();

    versions.sort_by(|a, b| {
        let ordering = match query.sort {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::VersionNumber => a.version_number.cmp(&b.version_number),
            SortField::Author => a.author_name.cmp(&b.author_name),
            SortField::Size => a.size.cmp(&b.size),
            SortField::Status => a.status.cmp(&b.status),
        }
        // Stable tie-break so equal keys list deterministically
        .then(a.version_number.cmp(&b.version_number));

        match query.order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    });

    let page = query.page.max(1);
    let start = (page - 1).saturating_mul(query.page_size);
    let versions = versions
        .into_iter()
        .skip(start)
        .take(query.page_size)
        .collect();

    VersionPage {
        versions,
        total,
        page,
        page_size: query.page_size,
    }
}
