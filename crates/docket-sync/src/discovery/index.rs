//! Index document parser.
//!
//! The index is a markdown file linking to epic folders (`[Title](E04-auth/)`)
//! and feature folders (`[Title](E04-auth/E04-F07-login/)`). External URLs
//! and links to documents are ignored.

use std::path::Path;
use std::sync::LazyLock;

use docket_core::enums::DiscoverySource;
use regex::Regex;

use super::grammar::FolderGrammar;
use super::{DiscoveredEntity, EntityLevel};
use crate::error::SyncError;

static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("valid regex"));

/// Entities listed in an index document, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexContent {
    pub epics: Vec<DiscoveredEntity>,
    pub features: Vec<DiscoveredEntity>,
    pub warnings: Vec<String>,
}

/// Load and parse the index at `path`. A missing file yields `Ok(None)`.
///
/// # Errors
///
/// Returns `SyncError::IndexMalformed` if the file exists but cannot be read as UTF-8 text.
pub fn load_index(path: &Path, grammar: FolderGrammar) -> Result<Option<IndexContent>, SyncError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path).map_err(|e| SyncError::IndexMalformed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(Some(parse_index(&content, grammar)))
}

/// Parse index markdown.
#[must_use]
pub fn parse_index(content: &str, grammar: FolderGrammar) -> IndexContent {
    let mut index = IndexContent::default();

    for caps in LINK.captures_iter(content) {
        let title = caps[1].trim();
        let target = caps[2].trim();
        if target.contains("://") || target.starts_with('#') {
            continue;
        }
        let target = target.split('#').next().unwrap_or_default();
        let lower = target.to_ascii_lowercase();
        if lower.ends_with(".md") || lower.ends_with(".txt") {
            continue;
        }

        let segments: Vec<&str> = target
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .collect();
        match segments.as_slice() {
            [epic_dir] => {
                let Some(epic) = grammar.epic(epic_dir) else {
                    continue;
                };
                if index.epics.iter().any(|e| e.key == epic.key) {
                    continue;
                }
                index.epics.push(DiscoveredEntity::new(
                    EntityLevel::Epic,
                    epic.key,
                    None,
                    title.to_string(),
                    DiscoverySource::Index,
                ));
            }
            [epic_dir, feature_dir] => {
                let Some(epic) = grammar.epic(epic_dir) else {
                    continue;
                };
                let Some(feature) = grammar.feature(feature_dir, Some(&epic.key)) else {
                    continue;
                };
                if feature.epic_key != epic.key {
                    index.warnings.push(format!(
                        "Index link {target} places feature {} under epic {}; skipped",
                        feature.key, epic.key
                    ));
                    continue;
                }
                if index.features.iter().any(|f| f.key == feature.key) {
                    continue;
                }
                index.features.push(DiscoveredEntity::new(
                    EntityLevel::Feature,
                    feature.key,
                    Some(epic.key),
                    title.to_string(),
                    DiscoverySource::Index,
                ));
            }
            _ => {}
        }
    }

    index
}
