//! Sync orchestrator.
//!
//! A pass is planned first and applied second. Planning reads the file tree
//! and the store and decides every write; applying runs the planned writes
//! in a single transaction. A dry run stops after planning, so its report
//! shows exactly what a real run would do.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeDelta, Utc};
use docket_config::{DEFAULT_CLOCK_SKEW_SECS, DEFAULT_MAX_FILE_SIZE, DocketConfig};
use docket_core::entities::Task;
use docket_core::keys::TaskKey;
use docket_db::service::DocketService;
use docket_db::updates::task::{TaskUpdate, TaskUpdateBuilder};

use crate::conflict::{ChangeSide, ConflictDetector};
use crate::discovery::{self, DiscoveryOptions, import::plan_import};
use crate::error::{SyncError, SyncFailure};
use crate::incremental::IncrementalFilter;
use crate::keygen::{KeyAllocator, write_task_key};
use crate::metadata::{self, ExtractedMetadata, ParsedMetadata};
use crate::patterns::PatternRegistry;
use crate::plan::{Plan, UNTITLED_TASK, Write};
use crate::report::{DiscoveryReport, RunReport};
use crate::resolver::{ResolutionStrategy, resolve};
use crate::scanner::{DiscoveredFile, FileScanner, resolve_root};

/// Agent recorded in task history when none is configured.
pub const DEFAULT_AGENT: &str = "docket-sync";

/// Parameters of one sync pass.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub root: PathBuf,
    pub dry_run: bool,
    pub strategy: ResolutionStrategy,
    /// Create missing epics/features for new tasks (ignored while discovery runs).
    pub create_missing: bool,
    /// Reference time for incremental filtering and change detection.
    pub last_sync: Option<DateTime<Utc>>,
    pub force_full_scan: bool,
    /// Delete tasks whose files vanished (full scans only).
    pub cleanup: bool,
    /// `Some` runs discovery before the file pass.
    pub discovery: Option<DiscoveryOptions>,
    pub clock_skew_tolerance: TimeDelta,
    pub max_file_size: u64,
    /// Agent named in task history rows.
    pub agent: String,
}

impl RunOptions {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dry_run: false,
            strategy: ResolutionStrategy::FileWins,
            create_missing: false,
            last_sync: None,
            force_full_scan: false,
            cleanup: false,
            discovery: None,
            clock_skew_tolerance: skew_tolerance(DEFAULT_CLOCK_SKEW_SECS),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            agent: DEFAULT_AGENT.to_string(),
        }
    }

    /// Options for `root` seeded from configuration. The strategy is left as
    /// file-wins; callers map `config.sync.strategy` since manual resolution
    /// needs a chooser.
    #[must_use]
    pub fn from_config(root: impl Into<PathBuf>, config: &DocketConfig) -> Self {
        Self {
            create_missing: config.sync.create_missing,
            cleanup: config.sync.cleanup,
            discovery: config
                .discovery
                .enabled
                .then(|| DiscoveryOptions::from_config(&config.discovery)),
            clock_skew_tolerance: skew_tolerance(config.sync.clock_skew_tolerance_secs),
            max_file_size: config.sync.max_file_size,
            agent: config.general.agent.clone(),
            ..Self::new(root)
        }
    }

    /// Last sync time used for change detection; `None` on full scans.
    fn reference_time(&self) -> Option<DateTime<Utc>> {
        self.last_sync.filter(|_| !self.force_full_scan)
    }
}

fn skew_tolerance(secs: u64) -> TimeDelta {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}

pub struct SyncEngine<'a> {
    service: &'a DocketService,
    registry: PatternRegistry,
}

impl<'a> SyncEngine<'a> {
    #[must_use]
    pub const fn new(service: &'a DocketService, registry: PatternRegistry) -> Self {
        Self { service, registry }
    }

    /// Run one sync pass.
    ///
    /// # Errors
    ///
    /// Returns `SyncFailure` for any fatal error. Its report holds everything
    /// recorded before the failure, and no store change from the pass persists.
    pub async fn run(&self, options: &RunOptions) -> Result<RunReport, SyncFailure> {
        let mut report = RunReport::new(options.dry_run);
        tracing::info!(
            root = %options.root.display(),
            dry_run = options.dry_run,
            strategy = %options.strategy.kind(),
            "sync pass starting"
        );

        match self.run_pass(options, &mut report).await {
            Ok(()) => {
                tracing::info!(
                    imported = report.tasks_imported,
                    updated = report.tasks_updated,
                    deleted = report.tasks_deleted,
                    conflicts = report.conflicts_resolved,
                    "sync pass finished"
                );
                Ok(report)
            }
            Err(error) => {
                tracing::error!(%error, "sync pass failed");
                report.errors.push(error.to_string());
                Err(SyncFailure {
                    report: Box::new(report),
                    error,
                })
            }
        }
    }

    async fn run_pass(&self, options: &RunOptions, report: &mut RunReport) -> Result<(), SyncError> {
        let root = resolve_root(&options.root)?;
        let mut plan = Plan::default();

        if let Some(discovery) = &options.discovery {
            let outcome = discovery::discover(&root, discovery)?;
            let mut section = DiscoveryReport::from_outcome(discovery.strategy, &outcome);
            plan_import(self.service, &outcome, &mut plan, &mut section).await?;
            report.discovery = Some(section);
        }

        let files = FileScanner::new(&self.registry, options.max_file_size).scan(&root)?;
        report.files_scanned = files.len();
        let scanned: HashSet<String> = files.iter().map(DiscoveredFile::path_string).collect();

        let filtered = IncrementalFilter::new(options.clock_skew_tolerance)
            .filter(self.service, files, options.last_sync, options.force_full_scan)
            .await?;
        report.files_filtered = filtered.stats.kept;
        report.files_skipped = filtered.stats.skipped;
        report.files_new = filtered.stats.new_files;
        for warning in filtered.warnings {
            report.warn(warning);
        }

        let candidates = parse_files(filtered.kept, report);
        let (parsed, write_backs) = self.assign_keys(candidates, &plan, report).await?;

        let keys: Vec<String> = parsed.iter().map(|m| m.key.clone()).collect();
        let stored = self.service.get_tasks_by_keys(&keys).await?;
        let detector = ConflictDetector::new(options.clock_skew_tolerance);

        for meta in parsed {
            match stored.get(&meta.key) {
                Some(record) => plan_update(&detector, meta, record, options, &mut plan, report)?,
                None => self.plan_new_task(meta, options, &mut plan, report).await?,
            }
        }

        if options.cleanup {
            if options.reference_time().is_none() {
                let synced: HashSet<&str> = keys.iter().map(String::as_str).collect();
                self.plan_cleanup(&root, &scanned, &synced, &mut plan, report).await?;
            } else {
                report.warn("Cleanup skipped: it only runs on full scans (use --force-full-scan)");
            }
        }

        if options.dry_run {
            tracing::info!("dry run: no changes applied");
            return Ok(());
        }

        plan.apply(self.service, &options.agent).await?;

        for (path, key) in write_backs {
            if let Err(e) = write_task_key(&path, &key) {
                report.warn(format!("Could not write key {key} to {}: {e}", path.display()));
            }
        }
        Ok(())
    }

    /// Resolve a final key for every parsed file.
    ///
    /// Returns the metadata list and the `(path, key)` pairs to write back.
    async fn assign_keys(
        &self,
        candidates: Vec<(DiscoveredFile, ExtractedMetadata)>,
        plan: &Plan,
        report: &mut RunReport,
    ) -> Result<(Vec<ParsedMetadata>, Vec<(PathBuf, String)>), SyncError> {
        let mut allocator = KeyAllocator::new();
        let mut seen = HashSet::new();
        let mut parsed = Vec::new();
        let mut keyless = Vec::new();

        for (file, extracted) in candidates {
            let Some(key) = extracted.key.clone() else {
                keyless.push((file, extracted));
                continue;
            };
            match TaskKey::parse(&key) {
                Ok(task_key) => {
                    if !seen.insert(key.clone()) {
                        report.warn(format!(
                            "Duplicate task key {key} in {}; skipped",
                            file.path.display()
                        ));
                        continue;
                    }
                    allocator.observe(&task_key);
                    parsed.push(ParsedMetadata::new(key, extracted, &file));
                }
                Err(e) => report.warn(format!("Skipping {}: {e}", file.path.display())),
            }
        }

        let mut write_backs = Vec::new();
        if keyless.is_empty() {
            return Ok((parsed, write_backs));
        }

        // A keyless file already tracked by path keeps its key (an earlier write-back failed).
        let known_paths: HashMap<String, String> = self
            .service
            .list_tasks_with_files()
            .await?
            .into_iter()
            .filter_map(|task| Some((task.file_path?, task.key)))
            .collect();

        for (file, extracted) in keyless {
            let path = file.path_string();
            if let Some(key) = known_paths.get(&path).filter(|key| !seen.contains(*key)) {
                seen.insert(key.clone());
                write_backs.push((file.path.clone(), key.clone()));
                parsed.push(ParsedMetadata::new(key.clone(), extracted, &file));
                continue;
            }

            let Some(feature_key) = file.feature_key.clone() else {
                report.warn(format!(
                    "Cannot generate a key for {}: no feature folder; skipped",
                    file.path.display()
                ));
                continue;
            };
            if !plan.has_feature(&feature_key)
                && self.service.find_feature_by_key(&feature_key).await?.is_none()
            {
                report.warn(format!(
                    "Cannot generate a key for {}: feature {feature_key} does not exist; skipped",
                    file.path.display()
                ));
                continue;
            }

            let key = match allocator.next_key(self.service, &feature_key).await {
                Ok(key) => key,
                Err(SyncError::Core(e)) => {
                    report.warn(format!(
                        "Cannot generate a key for {}: {e}; skipped",
                        file.path.display()
                    ));
                    continue;
                }
                Err(e) => return Err(e),
            };
            tracing::debug!(path = %path, key = %key, "generated task key");
            report.keys_generated += 1;
            seen.insert(key.clone());
            write_backs.push((file.path.clone(), key.clone()));
            parsed.push(ParsedMetadata::new(key, extracted, &file));
        }

        Ok((parsed, write_backs))
    }

    async fn plan_new_task(
        &self,
        meta: ParsedMetadata,
        options: &RunOptions,
        plan: &mut Plan,
        report: &mut RunReport,
    ) -> Result<(), SyncError> {
        let task_key = TaskKey::parse(&meta.key)?;
        let feature_key = task_key.feature_key();

        if !self.feature_exists(&feature_key, plan).await? {
            if options.create_missing && options.discovery.is_none() {
                self.plan_parents(&task_key.epic, &feature_key, plan).await?;
            } else {
                let hint = if options.discovery.is_some() {
                    "add the feature folder or index entry so discovery imports it".to_string()
                } else {
                    "re-run with --create-missing or enable discovery with --index".to_string()
                };
                return Err(SyncError::MissingParent {
                    task_key: meta.key,
                    feature_key,
                    hint,
                });
            }
        }

        let title = meta.title.unwrap_or_else(|| {
            report.warn(format!(
                "{} has no title; importing as \"{UNTITLED_TASK}\"",
                meta.file_path
            ));
            UNTITLED_TASK.to_string()
        });
        plan.push(Write::ImportTask {
            feature_key,
            key: meta.key,
            title,
            description: meta.description,
            file_path: meta.file_path,
        });
        report.tasks_imported += 1;
        Ok(())
    }

    async fn feature_exists(&self, feature_key: &str, plan: &mut Plan) -> Result<bool, SyncError> {
        if plan.has_feature(feature_key) {
            return Ok(true);
        }
        let exists = self.service.find_feature_by_key(feature_key).await?.is_some();
        if exists {
            plan.confirm_feature(feature_key);
        }
        Ok(exists)
    }

    async fn plan_parents(&self, epic_key: &str, feature_key: &str, plan: &mut Plan) -> Result<(), SyncError> {
        if !plan.has_epic(epic_key) {
            if self.service.find_epic_by_key(epic_key).await?.is_some() {
                plan.confirm_epic(epic_key);
            } else {
                tracing::info!(epic = epic_key, "auto-creating epic");
                plan.push(Write::CreateEpic {
                    key: epic_key.to_string(),
                    title: format!("Auto-created epic {epic_key}"),
                    description: None,
                    file_path: None,
                });
            }
        }
        tracing::info!(feature = feature_key, "auto-creating feature");
        plan.push(Write::CreateFeature {
            epic_key: epic_key.to_string(),
            key: feature_key.to_string(),
            title: format!("Auto-created feature {feature_key}"),
            description: None,
            file_path: None,
        });
        Ok(())
    }

    async fn plan_cleanup(
        &self,
        root: &Path,
        scanned: &HashSet<String>,
        synced_keys: &HashSet<&str>,
        plan: &mut Plan,
        report: &mut RunReport,
    ) -> Result<(), SyncError> {
        for task in self.service.list_tasks_with_files().await? {
            // A key seen this pass has a file; only its path moved.
            if synced_keys.contains(task.key.as_str()) {
                continue;
            }
            let Some(file_path) = task.file_path.as_deref() else {
                continue;
            };
            let path = Path::new(file_path);
            if path.starts_with(root) && !scanned.contains(file_path) && !path.exists() {
                tracing::info!(key = %task.key, path = file_path, "task file removed; deleting task");
                plan.push(Write::DeleteTask { key: task.key });
                report.tasks_deleted += 1;
            }
        }
        Ok(())
    }
}

/// Read and extract every kept file, counting pattern matches.
fn parse_files(
    files: Vec<DiscoveredFile>,
    report: &mut RunReport,
) -> Vec<(DiscoveredFile, ExtractedMetadata)> {
    let mut candidates = Vec::with_capacity(files.len());
    for file in files {
        *report
            .pattern_matches
            .entry(file.matched.pattern.clone())
            .or_default() += 1;

        let content = match std::fs::read_to_string(&file.path) {
            Ok(content) => content,
            Err(e) => {
                report.warn(format!("Cannot read {}: {e}", file.path.display()));
                continue;
            }
        };
        match metadata::extract(&file, &content) {
            Ok(extracted) => candidates.push((file, extracted)),
            Err(e) => report.warn(format!("Skipping {}: {e}", file.path.display())),
        }
    }
    candidates
}

/// Detect, resolve and plan the update for a task already in the store.
fn plan_update(
    detector: &ConflictDetector,
    meta: ParsedMetadata,
    record: &Task,
    options: &RunOptions,
    plan: &mut Plan,
    report: &mut RunReport,
) -> Result<(), SyncError> {
    let detection = detector.detect_with_sync_awareness(&meta, record, options.reference_time());
    let mut merged = resolve(&detection.conflicts, &meta, record, &options.strategy)?;

    if detection.changes == Some(ChangeSide::FileOnly) {
        if let Some(title) = meta.title.as_deref().filter(|t| !t.trim().is_empty()) {
            merged.title = title.to_string();
        }
        if let Some(description) = meta.description.as_deref() {
            merged.description = Some(description.to_string());
        }
    }

    let resolved = detection.conflicts.len();
    report.conflicts_resolved += resolved;
    report.conflicts.extend(detection.conflicts);

    let update = changed_fields(record, &merged);
    if !update.is_empty() {
        plan.push(Write::UpdateTask {
            key: meta.key,
            update,
            note: format!("Updated from file ({resolved} conflicts resolved)"),
        });
        report.tasks_updated += 1;
    }
    Ok(())
}

/// The syncable fields where `merged` differs from `record`.
fn changed_fields(record: &Task, merged: &Task) -> TaskUpdate {
    let mut builder = TaskUpdateBuilder::new();
    if merged.title != record.title {
        builder = builder.title(merged.title.clone());
    }
    if merged.description != record.description {
        builder = builder.description(merged.description.clone());
    }
    if merged.file_path != record.file_path {
        builder = builder.file_path(merged.file_path.clone());
    }
    builder.build()
}
