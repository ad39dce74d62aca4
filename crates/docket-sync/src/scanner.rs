//! Recursive work-item file scanner.
//!
//! Walks a root folder, keeps regular files whose names match a registered
//! pattern, and infers each file's epic/feature from the enclosing folder
//! names (falling back to the key embedded in the file name).
//!
//! Symlinks are never followed and files above the size ceiling are skipped.
//! Results are sorted by path so every pass sees the same order.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use ignore::WalkBuilder;
use regex::Regex;

use crate::error::SyncError;
use crate::patterns::{PatternMatch, PatternRegistry};

static FEATURE_DIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<epic>E\d{2})(?:-(?P<project>P\d{2}))?-(?P<feature>F\d{2})").expect("valid regex")
});

/// `F07-slug` feature folder; its epic comes from the enclosing `E04-slug` folder.
static SHORT_FEATURE_DIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<feature>F\d{2})-").expect("valid regex"));
static EPIC_DIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<epic>E\d{2})-").expect("valid regex"));

/// A candidate work-item file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub file_name: String,
    pub epic_key: Option<String>,
    pub feature_key: Option<String>,
    pub modified_at: DateTime<Utc>,
    pub matched: PatternMatch,
}

impl DiscoveredFile {
    /// Path as stored in the `file_path` column.
    #[must_use]
    pub fn path_string(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

pub struct FileScanner<'a> {
    registry: &'a PatternRegistry,
    max_file_size: u64,
}

impl<'a> FileScanner<'a> {
    #[must_use]
    pub const fn new(registry: &'a PatternRegistry, max_file_size: u64) -> Self {
        Self {
            registry,
            max_file_size,
        }
    }

    /// Scan `root` recursively.
    ///
    /// Unreadable entries below the root are skipped; only an unusable root fails.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::RootNotFound` if `root` is missing or not a directory,
    /// and `SyncError::Io` if it cannot be resolved or listed.
    pub fn scan(&self, root: &Path) -> Result<Vec<DiscoveredFile>, SyncError> {
        let root = resolve_root(root)?;
        std::fs::read_dir(&root).map_err(|source| SyncError::Io {
            path: root.clone(),
            source,
        })?;

        let mut builder = WalkBuilder::new(&root);
        builder
            .standard_filters(false)
            .hidden(false)
            .follow_links(false);

        let mut files = Vec::new();
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
            if let Some(file) = self.inspect(entry.path()) {
                files.push(file);
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        tracing::debug!(root = %root.display(), count = files.len(), "scan complete");
        Ok(files)
    }

    fn inspect(&self, path: &Path) -> Option<DiscoveredFile> {
        let file_name = path.file_name()?.to_str()?.to_string();
        let matched = self.registry.match_file(&file_name)?;

        let metadata = match std::fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "cannot stat file");
                return None;
            }
        };
        if metadata.file_type().is_symlink() || !metadata.is_file() {
            return None;
        }
        if metadata.len() > self.max_file_size {
            tracing::debug!(
                path = %path.display(),
                size = metadata.len(),
                limit = self.max_file_size,
                "file exceeds size ceiling"
            );
            return None;
        }
        let modified_at = metadata.modified().ok().map(DateTime::<Utc>::from)?;

        let (epic_key, feature_key) = infer_hierarchy(path, matched.task_key());
        Some(DiscoveredFile {
            path: path.to_path_buf(),
            file_name,
            epic_key,
            feature_key,
            modified_at,
            matched,
        })
    }
}

/// Canonical form of `root`, or `RootNotFound`.
pub(crate) fn resolve_root(root: &Path) -> Result<PathBuf, SyncError> {
    if !root.is_dir() {
        return Err(SyncError::RootNotFound {
            path: root.to_path_buf(),
        });
    }
    root.canonicalize().map_err(|source| SyncError::Io {
        path: root.to_path_buf(),
        source,
    })
}

/// Epic and feature keys from the parent or grandparent folder name, else
/// from the task key embedded in the file name.
fn infer_hierarchy(path: &Path, task_key: Option<&str>) -> (Option<String>, Option<String>) {
    let from_dirs = path.ancestors().skip(1).take(2).find_map(feature_from_dir);

    let inferred = from_dirs.or_else(|| {
        let key = docket_core::keys::TaskKey::parse(task_key?).ok()?;
        let feature = key.feature_key();
        Some((key.epic, feature))
    });
    inferred.map_or((None, None), |(epic, feature)| (Some(epic), Some(feature)))
}

fn feature_from_dir(dir: &Path) -> Option<(String, String)> {
    let name = dir.file_name()?.to_str()?;
    if let Some(caps) = FEATURE_DIR.captures(name) {
        let epic = caps["epic"].to_string();
        let feature = match caps.name("project") {
            Some(project) => format!("{epic}-{}-{}", project.as_str(), &caps["feature"]),
            None => format!("{epic}-{}", &caps["feature"]),
        };
        return Some((epic, feature));
    }

    let short = SHORT_FEATURE_DIR.captures(name)?;
    let parent = dir.parent()?.file_name()?.to_str()?;
    let epic = EPIC_DIR.captures(parent)?["epic"].to_string();
    let feature = format!("{epic}-{}", &short["feature"]);
    Some((epic, feature))
}
