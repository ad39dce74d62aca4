//! Folder-structure scanner for epics and features.
//!
//! Epic folders may sit anywhere below the root; feature folders must be
//! direct children of an epic folder. Each epic's `epic.md` and each
//! feature's PRD (`prd.md`, else `PRD_F07-*.md`) supply titles and
//! descriptions; other matching documents in a feature folder are cataloged
//! as related docs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use docket_core::enums::DiscoverySource;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;

use super::grammar::FolderGrammar;
use super::{DiscoveredEntity, EntityLevel};
use crate::error::SyncError;
use crate::metadata::{MAX_DESCRIPTION_CHARS, parse_document};
use crate::text::{first_heading, first_paragraph, non_blank, title_case};

const EPIC_DOC: &str = "epic.md";
const PRD_DOC: &str = "prd.md";

#[derive(Debug, Clone, Default)]
pub struct FolderScan {
    pub epics: Vec<DiscoveredEntity>,
    pub features: Vec<DiscoveredEntity>,
    pub warnings: Vec<String>,
    pub folders_scanned: usize,
    pub files_analyzed: usize,
}

/// Compile related-document globs.
///
/// # Errors
///
/// Returns `SyncError::Pattern` for an invalid glob.
pub fn related_doc_set(globs: &[String]) -> Result<GlobSet, SyncError> {
    let mut builder = GlobSetBuilder::new();
    for glob in globs {
        builder.add(Glob::new(glob).map_err(|e| SyncError::Pattern {
            name: glob.clone(),
            reason: e.to_string(),
        })?);
    }
    builder.build().map_err(|e| SyncError::Pattern {
        name: "related_doc_globs".to_string(),
        reason: e.to_string(),
    })
}

/// Walk `root` and collect epic and feature folders.
#[must_use]
pub fn scan_folders(root: &Path, grammar: FolderGrammar, related: &GlobSet) -> FolderScan {
    let mut scan = FolderScan::default();
    let mut epic_dirs: HashMap<PathBuf, String> = HashMap::new();

    let mut builder = WalkBuilder::new(root);
    builder
        .standard_filters(false)
        .hidden(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| name.starts_with('.'))
        });

    for result in builder.build() {
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        if !entry.file_type().is_some_and(|t| t.is_dir()) {
            if name.ends_with(".md") {
                scan.files_analyzed += 1;
            }
            continue;
        }
        scan.folders_scanned += 1;

        let parent_epic = path.parent().and_then(|p| epic_dirs.get(p)).cloned();
        if let Some(parent_epic) = parent_epic
            && let Some(feature) = grammar.feature(name, Some(&parent_epic))
        {
            if feature.epic_key != parent_epic {
                scan.warnings.push(format!(
                    "Feature folder {} belongs to {} but sits under epic {parent_epic}; skipped",
                    path.display(),
                    feature.epic_key
                ));
                continue;
            }
            if scan.features.iter().any(|f| f.key == feature.key) {
                scan.warnings.push(format!(
                    "Duplicate feature folder {} for {}; keeping the first",
                    path.display(),
                    feature.key
                ));
                continue;
            }
            scan.features.push(describe_feature(
                path,
                feature.key,
                parent_epic,
                feature.slug.as_deref(),
                related,
                &mut scan.warnings,
            ));
            continue;
        }

        if let Some(epic) = grammar.epic(name) {
            if scan.epics.iter().any(|e| e.key == epic.key) {
                scan.warnings.push(format!(
                    "Duplicate epic folder {} for {}; keeping the first",
                    path.display(),
                    epic.key
                ));
                continue;
            }
            epic_dirs.insert(path.to_path_buf(), epic.key.clone());
            scan.epics
                .push(describe_epic(path, epic.key, epic.slug.as_deref(), &mut scan.warnings));
        }
    }

    tracing::debug!(
        epics = scan.epics.len(),
        features = scan.features.len(),
        folders = scan.folders_scanned,
        "folder scan complete"
    );
    scan
}

/// Title and description from a folder's primary document.
struct DocSummary {
    title: Option<String>,
    description: Option<String>,
}

fn summarize(doc: &Path, warnings: &mut Vec<String>) -> DocSummary {
    let empty = DocSummary {
        title: None,
        description: None,
    };
    let content = match std::fs::read_to_string(doc) {
        Ok(content) => content,
        Err(e) => {
            warnings.push(format!("Cannot read {}: {e}", doc.display()));
            return empty;
        }
    };
    match parse_document(&content) {
        Ok(document) => {
            let frontmatter = document.frontmatter.unwrap_or_default();
            DocSummary {
                title: non_blank(frontmatter.title.as_deref())
                    .or_else(|| first_heading(document.body)),
                description: non_blank(frontmatter.description.as_deref())
                    .or_else(|| first_paragraph(document.body, MAX_DESCRIPTION_CHARS)),
            }
        }
        Err(e) => {
            warnings.push(format!("Cannot parse {}: {e}", doc.display()));
            empty
        }
    }
}

fn entity_from_folder(
    level: EntityLevel,
    key: String,
    parent_key: Option<String>,
    slug: Option<&str>,
    folder: &Path,
    doc: Option<PathBuf>,
    warnings: &mut Vec<String>,
) -> DiscoveredEntity {
    let summary = doc.as_deref().map(|d| summarize(d, warnings));
    let doc_title = summary.as_ref().and_then(|s| s.title.clone());
    let placeholder_title = doc_title.is_none();
    let title = doc_title.unwrap_or_else(|| slug.map_or_else(|| key.clone(), title_case));

    let mut entity = DiscoveredEntity::new(level, key, parent_key, title, DiscoverySource::Folder);
    entity.description = summary.and_then(|s| s.description);
    entity.file_path = doc.map(|d| d.to_string_lossy().into_owned());
    entity.folder = Some(folder.to_path_buf());
    entity.placeholder_title = placeholder_title;
    entity
}

fn describe_epic(
    folder: &Path,
    key: String,
    slug: Option<&str>,
    warnings: &mut Vec<String>,
) -> DiscoveredEntity {
    let doc = Some(folder.join(EPIC_DOC)).filter(|d| d.is_file());
    entity_from_folder(EntityLevel::Epic, key, None, slug, folder, doc, warnings)
}

fn describe_feature(
    folder: &Path,
    key: String,
    epic_key: String,
    slug: Option<&str>,
    related: &GlobSet,
    warnings: &mut Vec<String>,
) -> DiscoveredEntity {
    let mut docs: Vec<(String, PathBuf)> = match std::fs::read_dir(folder) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
            .filter_map(|e| {
                let name = e.file_name().to_str()?.to_string();
                name.ends_with(".md").then(|| (name, e.path()))
            })
            .collect(),
        Err(e) => {
            warnings.push(format!("Cannot list {}: {e}", folder.display()));
            Vec::new()
        }
    };
    docs.sort();

    let prd = docs
        .iter()
        .find(|(name, _)| name == PRD_DOC)
        .or_else(|| docs.iter().find(|(name, _)| name.starts_with("PRD_F")))
        .map(|(_, path)| path.clone());

    let related_docs = docs
        .iter()
        .filter(|(name, path)| Some(path) != prd.as_ref() && related.is_match(name))
        .map(|(_, path)| path.to_string_lossy().into_owned())
        .collect();

    let mut entity = entity_from_folder(
        EntityLevel::Feature,
        key,
        Some(epic_key),
        slug,
        folder,
        prd,
        warnings,
    );
    entity.related_docs = related_docs;
    entity
}
