//! Rendering a version for export

use crate::error::{EngineError, Result};
use crate::model::{Metadata, Version};
use serde::Serialize;

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Yaml,
    Text,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "json" => Ok(ExportFormat::Json),
            "yaml" => Ok(ExportFormat::Yaml),
            "text" => Ok(ExportFormat::Text),
            other => Err(format!("unknown export format: {other}")),
        }
    }
}

/// Serializable view of a version plus its content
#[derive(Debug, Serialize)]
struct VersionDocument {
    entity_id: String,
    version_id: String,
    version_number: u64,
    label: String,
    status: String,
    mime_type: String,
    size: u64,
    content_hash: String,
    author_id: String,
    author_name: String,
    message: String,
    is_current: bool,
    parent_version_id: Option<String>,
    created_at: String,
    metadata: Metadata,
    content: String,
}

impl VersionDocument {
    fn build(version: &Version, content: &[u8]) -> Self {
        Self {
            entity_id: version.entity_id.clone(),
            version_id: version.id.to_string(),
            version_number: version.version_number,
            label: version.label.clone(),
            status: version.status.to_string(),
            mime_type: version.mime_type.clone(),
            size: version.size,
            content_hash: version.content_hash.to_hex(),
            author_id: version.author_id.clone(),
            author_name: version.author_name.clone(),
            message: version.message.clone(),
            is_current: version.is_current,
            parent_version_id: version.parent_version_id.map(|id| id.to_string()),
            created_at: version.created_at.to_rfc3339(),
            metadata: version.metadata.clone(),
            content: String::from_utf8_lossy(content).into_owned(),
        }
    }
}

/// Render a version with its content in the requested format
pub fn export_version(version: &Version, content: &[u8], format: ExportFormat) -> Result<String> {
    let document = VersionDocument::build(version, content);
    match format {
        ExportFormat::Json => serde_json::to_string_pretty(&document)
            .map_err(|e| EngineError::validation(format!("json export failed: {e}"))),
        ExportFormat::Yaml => serde_yaml::to_string(&document)
            .map_err(|e| EngineError::validation(format!("yaml export failed: {e}"))),
        ExportFormat::Text => Ok(render_text(&document)),
    }
}

fn render_text(doc: &VersionDocument) -> String {
    let mut out = String::new();
    out.push_str(&format!("version {}\n", doc.version_id));
    out.push_str(&format!("Entity:    {}\n", doc.entity_id));
    out.push_str(&format!(
        "Number:    {} ({})\n",
        doc.version_number, doc.label
    ));
    out.push_str(&format!("Status:    {}\n", doc.status));
    out.push_str(&format!(
        "Author:    {} <{}>\n",
        doc.author_name, doc.author_id
    ));
    out.push_str(&format!("Date:      {}\n", doc.created_at));
    out.push_str(&format!("Size:      {} bytes\n", doc.size));
    out.push_str(&format!("Hash:      {}\n", doc.content_hash));
    if !doc.message.is_empty() {
        out.push_str(&format!("Message:   {}\n", doc.message));
    }
    out.push('\n');
    out.push_str(&doc.content);
    out
}
