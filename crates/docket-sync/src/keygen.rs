//! Task key generation for files that carry no key.
//!
//! The next sequence for a feature is one past the highest sequence seen in
//! the store or in the current batch. Generated keys are written back into
//! the file's frontmatter through a temp file + rename so a crash never
//! leaves a half-written document.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use docket_core::errors::CoreError;
use docket_core::keys::TaskKey;
use docket_db::service::DocketService;

use crate::error::SyncError;
use crate::metadata::split_frontmatter;

/// Highest sequence a three-digit task key can hold.
const MAX_SEQUENCE: u32 = 999;

/// Allocates task keys per feature for one sync pass.
#[derive(Debug, Default)]
pub struct KeyAllocator {
    observed: HashMap<String, u32>,
    allocated: HashMap<String, u32>,
}

impl KeyAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key present in the batch so generated keys skip past it.
    pub fn observe(&mut self, key: &TaskKey) {
        let feature = key.feature_key();
        for seen in [&mut self.observed, &mut self.allocated] {
            if let Some(current) = seen.get_mut(&feature) {
                *current = (*current).max(key.sequence);
            }
        }
        self.observed.entry(feature).or_insert(key.sequence);
    }

    /// Next unused key for `feature_key`.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Database` if the stored maximum cannot be read and
    /// `SyncError::Core` when the feature has used every sequence number.
    pub async fn next_key(
        &mut self,
        service: &DocketService,
        feature_key: &str,
    ) -> Result<String, SyncError> {
        let last = match self.allocated.get(feature_key) {
            Some(last) => *last,
            None => {
                let stored = service.max_task_sequence(feature_key).await?;
                stored.max(self.observed.get(feature_key).copied().unwrap_or(0))
            }
        };
        let sequence = last + 1;
        if sequence > MAX_SEQUENCE {
            return Err(CoreError::Validation(format!(
                "feature {feature_key} has no task sequence numbers left"
            ))
            .into());
        }
        self.allocated.insert(feature_key.to_string(), sequence);
        Ok(TaskKey::format(feature_key, sequence))
    }
}

fn is_key_line(line: &str) -> bool {
    line.starts_with("task_key:") || line.starts_with("key:")
}

/// `content` with `task_key: <key>` as the first frontmatter entry.
///
/// An existing frontmatter block is kept (minus any stale key line); otherwise
/// a new block is prepended.
#[must_use]
pub fn insert_task_key(content: &str, key: &str) -> String {
    match split_frontmatter(content) {
        Ok((Some(yaml), body)) => {
            let kept: String = yaml
                .split_inclusive('\n')
                .filter(|line| !is_key_line(line))
                .collect();
            format!("---\ntask_key: {key}\n{kept}---\n{body}")
        }
        _ => format!("---\ntask_key: {key}\n---\n\n{content}"),
    }
}

/// Atomically rewrite the file at `path` with `key` in its frontmatter.
///
/// # Errors
///
/// Returns `SyncError::Io` if the file cannot be read, written, or replaced.
pub fn write_task_key(path: &Path, key: &str) -> Result<(), SyncError> {
    let io_err = |source| SyncError::Io {
        path: path.to_path_buf(),
        source,
    };

    let content = std::fs::read_to_string(path).map_err(io_err)?;
    let permissions = std::fs::metadata(path).map_err(io_err)?.permissions();
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(insert_task_key(&content, key).as_bytes())
        .map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    std::fs::set_permissions(tmp.path(), permissions).map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    tracing::debug!(path = %path.display(), key, "wrote generated task key");
    Ok(())
}
