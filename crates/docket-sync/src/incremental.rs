//! Incremental filtering against the last successful sync.
//!
//! Unknown files are always kept. Known files are kept only when their
//! modification time is later than the last sync. Modification times are
//! re-read from disk so edits made after the scan are not missed.

use std::collections::HashSet;

use chrono::{DateTime, TimeDelta, Utc};
use docket_db::service::DocketService;

use crate::error::SyncError;
use crate::scanner::DiscoveredFile;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub total: usize,
    pub kept: usize,
    pub skipped: usize,
    pub new_files: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    pub kept: Vec<DiscoveredFile>,
    pub stats: FilterStats,
    pub warnings: Vec<String>,
}

pub struct IncrementalFilter {
    tolerance: TimeDelta,
}

impl IncrementalFilter {
    #[must_use]
    pub const fn new(tolerance: TimeDelta) -> Self {
        Self { tolerance }
    }

    /// Filter `files` using the store's known file paths.
    ///
    /// Without a last sync time, or with `force_full_scan`, every file is kept
    /// and the store is not consulted.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Database` if the known paths cannot be read.
    pub async fn filter(
        &self,
        service: &DocketService,
        files: Vec<DiscoveredFile>,
        last_sync: Option<DateTime<Utc>>,
        force_full_scan: bool,
    ) -> Result<FilterOutcome, SyncError> {
        let Some(last_sync) = last_sync.filter(|_| !force_full_scan) else {
            return Ok(keep_all(files));
        };
        let known = service.list_task_file_paths().await?;
        Ok(self.filter_known(files, &known, last_sync, Utc::now()))
    }

    /// Pure filtering step: `known` holds the paths the store already tracks.
    #[must_use]
    pub fn filter_known(
        &self,
        files: Vec<DiscoveredFile>,
        known: &HashSet<String>,
        last_sync: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> FilterOutcome {
        let mut outcome = FilterOutcome {
            stats: FilterStats {
                total: files.len(),
                ..FilterStats::default()
            },
            ..FilterOutcome::default()
        };

        for mut file in files {
            if !known.contains(&file.path_string()) {
                outcome.stats.new_files += 1;
                outcome.kept.push(file);
                continue;
            }

            match current_mtime(&file) {
                Ok(modified_at) => file.modified_at = modified_at,
                Err(e) => {
                    outcome.warnings.push(format!(
                        "Cannot read modification time of {}: {e}",
                        file.path.display()
                    ));
                    outcome.stats.skipped += 1;
                    continue;
                }
            }

            if file.modified_at > now + self.tolerance {
                outcome.warnings.push(format!(
                    "{} has a modification time in the future ({}); check the clock of the machine that wrote it",
                    file.path.display(),
                    file.modified_at.to_rfc3339()
                ));
            }

            if file.modified_at > last_sync {
                outcome.kept.push(file);
            } else {
                outcome.stats.skipped += 1;
            }
        }

        outcome.stats.kept = outcome.kept.len();
        tracing::debug!(
            total = outcome.stats.total,
            kept = outcome.stats.kept,
            skipped = outcome.stats.skipped,
            new = outcome.stats.new_files,
            "incremental filter"
        );
        outcome
    }
}

fn keep_all(files: Vec<DiscoveredFile>) -> FilterOutcome {
    let total = files.len();
    FilterOutcome {
        kept: files,
        stats: FilterStats {
            total,
            kept: total,
            ..FilterStats::default()
        },
        warnings: Vec::new(),
    }
}

fn current_mtime(file: &DiscoveredFile) -> std::io::Result<DateTime<Utc>> {
    Ok(DateTime::<Utc>::from(std::fs::metadata(&file.path)?.modified()?))
}
