//! Epic and feature discovery.
//!
//! Two producers describe the plan hierarchy: an index document linking to
//! folders, and the folder structure itself. Discovery runs both, reports
//! where they disagree, and reconciles them under a [`DiscoveryStrategy`]:
//!
//! - `index-only`: the index is authoritative and every entry needs a folder
//! - `folder-only`: folders are authoritative
//! - `merge`: the union, index metadata winning where both name an entity
//!
//! Output is sorted by key so repeated runs over the same tree are identical.

mod folders;
mod grammar;
pub(crate) mod import;
mod index;
mod reconcile;

use std::fmt;
use std::path::{Path, PathBuf};

use docket_config::DiscoveryConfig;
use docket_core::enums::{DiscoverySource, DiscoveryStrategy, ValidationLevel};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use folders::{FolderScan, related_doc_set, scan_folders};
pub use grammar::{EpicName, FeatureName, FolderGrammar};
pub use index::{IndexContent, load_index, parse_index};
pub use reconcile::reconcile;

use crate::error::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntityLevel {
    Epic,
    Feature,
}

impl EntityLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Epic => "epic",
            Self::Feature => "feature",
        }
    }
}

impl fmt::Display for EntityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An epic or feature found by one of the producers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredEntity {
    pub level: EntityLevel,
    pub key: String,
    /// Epic key for features.
    pub parent_key: Option<String>,
    pub title: String,
    pub description: Option<String>,
    /// Primary document (`epic.md`, PRD) backing the entity.
    pub file_path: Option<String>,
    pub source: DiscoverySource,
    pub folder: Option<PathBuf>,
    pub related_docs: Vec<String>,
    /// Title was derived from the folder name rather than a document.
    pub placeholder_title: bool,
}

impl DiscoveredEntity {
    #[must_use]
    pub const fn new(
        level: EntityLevel,
        key: String,
        parent_key: Option<String>,
        title: String,
        source: DiscoverySource,
    ) -> Self {
        Self {
            level,
            key,
            parent_key,
            title,
            description: None,
            file_path: None,
            source,
            folder: None,
            related_docs: Vec::new(),
            placeholder_title: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryConflictKind {
    EpicIndexOnly,
    EpicFolderOnly,
    FeatureIndexOnly,
    FeatureFolderOnly,
    RelationshipMismatch,
    TitleMismatch,
}

/// A disagreement between the index and the folder structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DiscoveryConflict {
    pub kind: DiscoveryConflictKind,
    pub key: String,
    pub message: String,
    pub suggestion: String,
}

/// Reconciled discovery result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryOutcome {
    pub epics: Vec<DiscoveredEntity>,
    pub features: Vec<DiscoveredEntity>,
    pub conflicts: Vec<DiscoveryConflict>,
    pub warnings: Vec<String>,
    pub index_found: bool,
    pub folders_scanned: usize,
    pub files_analyzed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOptions {
    pub strategy: DiscoveryStrategy,
    pub validation_level: ValidationLevel,
    /// Index document, relative to the sync root.
    pub index_file: PathBuf,
    pub related_doc_globs: Vec<String>,
}

impl DiscoveryOptions {
    #[must_use]
    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self {
            strategy: config.strategy,
            validation_level: config.validation_level,
            index_file: PathBuf::from(&config.index_file),
            related_doc_globs: config.related_doc_globs.clone(),
        }
    }
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self::from_config(&DiscoveryConfig::default())
    }
}

/// Run both producers under `root` and reconcile them.
///
/// # Errors
///
/// Returns `SyncError` for an unreadable index, a bad related-doc glob, or
/// when `index-only` finds no index or an index entry without a folder.
pub fn discover(root: &Path, options: &DiscoveryOptions) -> Result<DiscoveryOutcome, SyncError> {
    let grammar = FolderGrammar::new(options.validation_level);
    let related = related_doc_set(&options.related_doc_globs)?;
    let index_path = root.join(&options.index_file);

    let index = load_index(&index_path, grammar)?;
    let folders = scan_folders(root, grammar, &related);
    let outcome = reconcile(index, folders, options.strategy, &index_path)?;

    tracing::info!(
        epics = outcome.epics.len(),
        features = outcome.features.len(),
        conflicts = outcome.conflicts.len(),
        index_found = outcome.index_found,
        "discovery complete"
    );
    Ok(outcome)
}
