//! Conflict detection and strategy-driven reconciliation.

use std::collections::BTreeMap;
use std::path::Path;

use docket_core::enums::{DiscoverySource, DiscoveryStrategy};

use super::folders::FolderScan;
use super::index::IndexContent;
use super::{DiscoveredEntity, DiscoveryConflict, DiscoveryConflictKind, DiscoveryOutcome, EntityLevel};
use crate::error::SyncError;

type ByKey = BTreeMap<String, DiscoveredEntity>;

fn by_key(entities: Vec<DiscoveredEntity>) -> ByKey {
    entities.into_iter().map(|e| (e.key.clone(), e)).collect()
}

/// Reconcile index and folder results under `strategy`.
///
/// # Errors
///
/// With `index-only`: `SyncError::IndexMissing` when there is no index and
/// `SyncError::IndexFolderMissing` when an index entry has no folder.
pub fn reconcile(
    index: Option<IndexContent>,
    folders: FolderScan,
    strategy: DiscoveryStrategy,
    index_path: &Path,
) -> Result<DiscoveryOutcome, SyncError> {
    let mut outcome = DiscoveryOutcome {
        warnings: folders.warnings,
        index_found: index.is_some(),
        folders_scanned: folders.folders_scanned,
        files_analyzed: folders.files_analyzed,
        ..DiscoveryOutcome::default()
    };
    let folder_epics = by_key(folders.epics);
    let folder_features = by_key(folders.features);

    let Some(index) = index else {
        match strategy {
            DiscoveryStrategy::IndexOnly => {
                return Err(SyncError::IndexMissing {
                    path: index_path.to_path_buf(),
                });
            }
            DiscoveryStrategy::Merge => outcome.warnings.push(format!(
                "Index {} not found; using folder structure only",
                index_path.display()
            )),
            DiscoveryStrategy::FolderOnly => {}
        }
        outcome.epics = folder_epics.into_values().collect();
        outcome.features = folder_features.into_values().collect();
        return Ok(outcome);
    };

    outcome.warnings.extend(index.warnings);
    let index_epics = by_key(index.epics);
    let index_features = by_key(index.features);

    outcome.conflicts = detect_conflicts(EntityLevel::Epic, &index_epics, &folder_epics);
    outcome
        .conflicts
        .extend(detect_conflicts(EntityLevel::Feature, &index_features, &folder_features));

    let (epics, features) = match strategy {
        DiscoveryStrategy::IndexOnly => (
            index_only(index_epics, &folder_epics, &mut outcome.warnings)?,
            index_only(index_features, &folder_features, &mut outcome.warnings)?,
        ),
        DiscoveryStrategy::FolderOnly => (
            folder_only(folder_epics, &index_epics, &mut outcome.warnings),
            folder_only(folder_features, &index_features, &mut outcome.warnings),
        ),
        DiscoveryStrategy::Merge => {
            for conflict in &outcome.conflicts {
                outcome
                    .warnings
                    .push(format!("{}; resolved by merge", conflict.message));
            }
            (
                merge(index_epics, folder_epics),
                merge(index_features, folder_features),
            )
        }
    };
    outcome.epics = epics;
    outcome.features = features;
    Ok(outcome)
}

fn detect_conflicts(level: EntityLevel, index: &ByKey, folders: &ByKey) -> Vec<DiscoveryConflict> {
    let (index_only, folder_only) = match level {
        EntityLevel::Epic => (
            DiscoveryConflictKind::EpicIndexOnly,
            DiscoveryConflictKind::EpicFolderOnly,
        ),
        EntityLevel::Feature => (
            DiscoveryConflictKind::FeatureIndexOnly,
            DiscoveryConflictKind::FeatureFolderOnly,
        ),
    };
    let name = match level {
        EntityLevel::Epic => "Epic",
        EntityLevel::Feature => "Feature",
    };

    let mut conflicts = Vec::new();
    for (key, listed) in index {
        let Some(found) = folders.get(key) else {
            conflicts.push(DiscoveryConflict {
                kind: index_only,
                key: key.clone(),
                message: format!("{name} {key} is listed in the index but has no folder"),
                suggestion: format!("Create a folder for {key} or remove its index entry"),
            });
            continue;
        };
        if listed.parent_key != found.parent_key {
            conflicts.push(DiscoveryConflict {
                kind: DiscoveryConflictKind::RelationshipMismatch,
                key: key.clone(),
                message: format!(
                    "{name} {key} belongs to {} in the index but to {} on disk",
                    listed.parent_key.as_deref().unwrap_or("-"),
                    found.parent_key.as_deref().unwrap_or("-"),
                ),
                suggestion: format!("Move the {key} folder or fix its index link"),
            });
        }
        if !found.placeholder_title && listed.title != found.title {
            conflicts.push(DiscoveryConflict {
                kind: DiscoveryConflictKind::TitleMismatch,
                key: key.clone(),
                message: format!(
                    "{name} {key} is titled '{}' in the index but '{}' in its folder",
                    listed.title, found.title
                ),
                suggestion: format!("Use one title for {key} in both places"),
            });
        }
    }
    for key in folders.keys().filter(|key| !index.contains_key(*key)) {
        conflicts.push(DiscoveryConflict {
            kind: folder_only,
            key: key.clone(),
            message: format!("{name} folder {key} is not listed in the index"),
            suggestion: format!("Add a link to {key} in the index"),
        });
    }
    conflicts
}

fn index_only(
    index: ByKey,
    folders: &ByKey,
    warnings: &mut Vec<String>,
) -> Result<Vec<DiscoveredEntity>, SyncError> {
    for (key, entity) in folders {
        if !index.contains_key(key) {
            warnings.push(format!(
                "{} {key} has a folder but is not in the index; skipped",
                entity.level
            ));
        }
    }
    index
        .into_values()
        .map(|mut listed| {
            let found = folders
                .get(&listed.key)
                .ok_or_else(|| SyncError::IndexFolderMissing {
                    level: listed.level.as_str(),
                    key: listed.key.clone(),
                })?;
            take_folder_details(&mut listed, found);
            Ok(listed)
        })
        .collect()
}

fn folder_only(
    folders: ByKey,
    index: &ByKey,
    warnings: &mut Vec<String>,
) -> Vec<DiscoveredEntity> {
    for (key, entity) in index {
        if !folders.contains_key(key) {
            warnings.push(format!(
                "{} {key} is in the index but has no folder; skipped",
                entity.level
            ));
        }
    }
    folders.into_values().collect()
}

fn merge(index: ByKey, mut folders: ByKey) -> Vec<DiscoveredEntity> {
    let mut merged: ByKey = BTreeMap::new();
    for (key, mut listed) in index {
        if let Some(found) = folders.remove(&key) {
            take_folder_details(&mut listed, &found);
            listed.source = DiscoverySource::Merged;
        }
        merged.insert(key, listed);
    }
    merged.extend(folders);
    merged.into_values().collect()
}

/// Copy folder-only knowledge (paths, documents, description) onto an index entity.
fn take_folder_details(listed: &mut DiscoveredEntity, found: &DiscoveredEntity) {
    if listed.description.is_none() {
        listed.description.clone_from(&found.description);
    }
    listed.file_path.clone_from(&found.file_path);
    listed.folder.clone_from(&found.folder);
    listed.related_docs.clone_from(&found.related_docs);
}
