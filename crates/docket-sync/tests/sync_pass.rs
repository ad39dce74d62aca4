//! End-to-end sync passes against an in-memory store and a temp file tree.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, TimeDelta, Utc};
use docket_config::SyncConfig;
use docket_core::enums::{DiscoveryStrategy, TaskStatus, ValidationLevel};
use docket_db::service::DocketService;
use docket_sync::discovery::DiscoveryOptions;
use docket_sync::patterns::PatternRegistry;
use docket_sync::resolver::{ScriptedChooser, Side};
use docket_sync::{ResolutionStrategy, RunOptions, SyncEngine, SyncError};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn store() -> DocketService {
    DocketService::new_local(":memory:").await.unwrap()
}

fn registry(names: &[&str]) -> PatternRegistry {
    let names: Vec<String> = names.iter().map(ToString::to_string).collect();
    PatternRegistry::with_enabled(&SyncConfig::default(), &names).unwrap()
}

/// A temp docs root, canonicalized so paths match what the scanner stores.
fn docs_root() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    (dir, root)
}

fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
}

fn set_mtime(path: &Path, at: SystemTime) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(at)
        .unwrap();
}

fn task_file(title: &str) -> String {
    format!("# {title}\n\nWork for {title}.\n")
}

async fn seed_feature(service: &DocketService, epic: &str, feature: &str) {
    if service.find_epic_by_key(epic).await.unwrap().is_none() {
        service
            .create_epic(epic, &format!("Epic {epic}"), None, None)
            .await
            .unwrap();
    }
    let epic_id = service.get_epic_by_key(epic).await.unwrap().id;
    service
        .create_feature(&epic_id, feature, &format!("Feature {feature}"), None, None)
        .await
        .unwrap();
}

// ---------------------------------------------------------------------------
// Import and idempotence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_pass_over_unchanged_tree_is_a_no_op() {
    let (_dir, root) = docs_root();
    write(&root, "E01-F01-auth/T-E01-F01-001-login.md", &task_file("Login"));
    write(&root, "E01-F01-auth/T-E01-F01-002.md", &task_file("Logout"));
    let service = store().await;
    let engine = SyncEngine::new(&service, registry(&["task"]));

    let mut options = RunOptions::new(&root);
    options.create_missing = true;

    let first = engine.run(&options).await.unwrap();
    assert_eq!(first.files_scanned, 2);
    assert_eq!(first.tasks_imported, 2);
    assert_eq!(first.pattern_matches.get("task"), Some(&2));

    let feature = service.get_feature_by_key("E01-F01").await.unwrap();
    assert_eq!(feature.title, "Auto-created feature E01-F01");
    let task = service.get_task_by_key("T-E01-F01-002").await.unwrap();
    assert_eq!(task.title, "Logout");
    assert_eq!(task.status, TaskStatus::Todo);

    let history = service.list_task_history(&task.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].notes.as_deref(), Some("Imported from file"));

    let second = engine.run(&options).await.unwrap();
    assert_eq!(second.tasks_imported, 0);
    assert_eq!(second.tasks_updated, 0);
    assert_eq!(second.conflicts_resolved, 0);
    assert!(second.warnings.is_empty(), "{:?}", second.warnings);

    let counts = service.store_counts().await.unwrap();
    assert_eq!(counts.tasks, 2);
    assert_eq!(counts.features, 1);
    assert_eq!(counts.epics, 1);
}

#[tokio::test]
async fn file_edit_updates_title_and_path_but_keeps_operational_fields() {
    let (_dir, root) = docs_root();
    let service = store().await;
    seed_feature(&service, "E04", "E04-F07").await;
    let feature = service.get_feature_by_key("E04-F07").await.unwrap();
    service
        .create_task(
            &feature.id,
            "T-E04-F07-001",
            "Original",
            None,
            None,
            2,
        )
        .await
        .unwrap();

    let path = write(
        &root,
        "E04-F07-sync/T-E04-F07-001.md",
        "---\ntitle: Updated Task\n---\n\nBody text.\n",
    );

    let report = SyncEngine::new(&service, registry(&["task"]))
        .run(&RunOptions::new(&root))
        .await
        .unwrap();

    assert_eq!(report.tasks_updated, 1);
    assert_eq!(report.conflicts_resolved, 2);
    let fields: Vec<String> = report.conflicts.iter().map(|c| c.field.to_string()).collect();
    assert_eq!(fields, vec!["title", "file_path"]);
    assert_eq!(report.conflicts[1].store_value, "");

    let task = service.get_task_by_key("T-E04-F07-001").await.unwrap();
    assert_eq!(task.title, "Updated Task");
    assert_eq!(task.file_path.as_deref(), Some(path.to_str().unwrap()));
    // The store had no description, so the file's body does not conflict.
    assert_eq!(task.description, None);
    assert_eq!(task.status, TaskStatus::Todo);
    assert_eq!(task.priority, 2);
}

#[tokio::test]
async fn store_wins_leaves_record_untouched() {
    let (_dir, root) = docs_root();
    let service = store().await;
    seed_feature(&service, "E04", "E04-F07").await;
    let feature = service.get_feature_by_key("E04-F07").await.unwrap();
    let path = write(&root, "E04-F07/T-E04-F07-001.md", &task_file("From file"));
    service
        .create_task(
            &feature.id,
            "T-E04-F07-001",
            "From store",
            None,
            path.to_str(),
            5,
        )
        .await
        .unwrap();

    let mut options = RunOptions::new(&root);
    options.strategy = ResolutionStrategy::StoreWins;
    let report = SyncEngine::new(&service, registry(&["task"]))
        .run(&options)
        .await
        .unwrap();

    assert_eq!(report.conflicts_resolved, 1);
    assert_eq!(report.tasks_updated, 0);
    let task = service.get_task_by_key("T-E04-F07-001").await.unwrap();
    assert_eq!(task.title, "From store");
}

// ---------------------------------------------------------------------------
// Incremental filtering
// ---------------------------------------------------------------------------

/// Imports ten files, then backdates them and touches three after `last_sync`.
async fn ten_files_three_touched() -> (TempDir, PathBuf, DocketService, DateTime<Utc>) {
    let (dir, root) = docs_root();
    let service = store().await;
    let mut paths = Vec::new();
    for seq in 1..=10 {
        let rel = format!("E01-F01/T-E01-F01-{seq:03}.md");
        paths.push(write(&root, &rel, &task_file(&format!("Task {seq}"))));
    }

    let mut options = RunOptions::new(&root);
    options.create_missing = true;
    let report = SyncEngine::new(&service, registry(&["task"]))
        .run(&options)
        .await
        .unwrap();
    assert_eq!(report.tasks_imported, 10);

    let now = SystemTime::now();
    let old = now - Duration::from_secs(2 * 3600);
    for path in &paths {
        set_mtime(path, old);
    }
    for path in &paths[..3] {
        let content = fs::read_to_string(path).unwrap().replace("# Task", "# Edited task");
        fs::write(path, content).unwrap();
        set_mtime(path, now);
    }

    let last_sync = Utc::now() - TimeDelta::hours(1);
    (dir, root, service, last_sync)
}

#[tokio::test]
async fn incremental_pass_only_processes_files_changed_since_last_sync() {
    let (_dir, root, service, last_sync) = ten_files_three_touched().await;

    let mut options = RunOptions::new(&root);
    options.last_sync = Some(last_sync);
    let report = SyncEngine::new(&service, registry(&["task"]))
        .run(&options)
        .await
        .unwrap();

    assert_eq!(report.files_scanned, 10);
    assert_eq!(report.files_filtered, 3);
    assert_eq!(report.files_skipped, 7);
    assert_eq!(report.files_new, 0);
    assert_eq!(report.tasks_updated, 3);

    let task = service.get_task_by_key("T-E01-F01-002").await.unwrap();
    assert_eq!(task.title, "Edited task 2");
    let untouched = service.get_task_by_key("T-E01-F01-009").await.unwrap();
    assert_eq!(untouched.title, "Task 9");
}

#[tokio::test]
async fn force_full_scan_ignores_last_sync() {
    let (_dir, root, service, last_sync) = ten_files_three_touched().await;

    let mut options = RunOptions::new(&root);
    options.last_sync = Some(last_sync);
    options.force_full_scan = true;
    let report = SyncEngine::new(&service, registry(&["task"]))
        .run(&options)
        .await
        .unwrap();

    assert_eq!(report.files_filtered, 10);
    assert_eq!(report.files_skipped, 0);
    assert_eq!(report.tasks_updated, 3);
}

// ---------------------------------------------------------------------------
// Dry run and atomicity
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dry_run_reports_the_same_counts_without_writing() {
    let (_dir, root) = docs_root();
    write(&root, "E02-F03/T-E02-F03-001.md", &task_file("One"));
    write(&root, "E02-F03/T-E02-F03-002.md", &task_file("Two"));
    let service = store().await;
    let engine = SyncEngine::new(&service, registry(&["task"]));

    let mut options = RunOptions::new(&root);
    options.create_missing = true;
    options.dry_run = true;
    let preview = engine.run(&options).await.unwrap();
    assert!(preview.dry_run);
    assert_eq!(preview.tasks_imported, 2);
    assert!(preview.to_string().contains("DRY-RUN MODE"));

    let counts = service.store_counts().await.unwrap();
    assert_eq!((counts.epics, counts.features, counts.tasks), (0, 0, 0));

    options.dry_run = false;
    let applied = engine.run(&options).await.unwrap();
    assert_eq!(applied.tasks_imported, preview.tasks_imported);
    assert_eq!(service.store_counts().await.unwrap().tasks, 2);
}

#[tokio::test]
async fn missing_parent_fails_the_whole_pass() {
    let (_dir, root) = docs_root();
    let service = store().await;
    seed_feature(&service, "E01", "E01-F01").await;
    write(&root, "E01-F01/T-E01-F01-001.md", &task_file("Valid"));
    write(&root, "E02-F01/T-E02-F01-001.md", &task_file("Orphan"));

    let failure = SyncEngine::new(&service, registry(&["task"]))
        .run(&RunOptions::new(&root))
        .await
        .unwrap_err();

    assert!(matches!(
        failure.error,
        SyncError::MissingParent { ref feature_key, .. } if feature_key == "E02-F01"
    ));
    assert_eq!(failure.report.errors.len(), 1);
    assert!(failure.report.errors[0].contains("--create-missing"));
    // The valid task planned before the failure was not written.
    assert!(
        service
            .find_task_by_key("T-E01-F01-001")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn missing_root_is_fatal() {
    let service = store().await;
    let failure = SyncEngine::new(&service, registry(&["task"]))
        .run(&RunOptions::new("/definitely/not/here"))
        .await
        .unwrap_err();
    assert!(matches!(failure.error, SyncError::RootNotFound { .. }));
}

// ---------------------------------------------------------------------------
// Key generation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn keyless_file_gets_next_key_written_into_frontmatter() {
    let (_dir, root) = docs_root();
    let service = store().await;
    seed_feature(&service, "E01", "E01-F01").await;
    let feature = service.get_feature_by_key("E01-F01").await.unwrap();
    service
        .create_task(&feature.id, "T-E01-F01-003", "Existing", None, None, 5)
        .await
        .unwrap();

    let path = write(&root, "E01-F01-auth/01-setup.md", "Configure the provider.\n");
    let engine = SyncEngine::new(&service, registry(&["task", "numbered"]));

    let report = engine.run(&RunOptions::new(&root)).await.unwrap();
    assert_eq!(report.keys_generated, 1);
    assert_eq!(report.tasks_imported, 1);
    assert_eq!(report.pattern_matches.get("numbered"), Some(&1));

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("---\ntask_key: T-E01-F01-004\n---\n"));
    assert!(content.ends_with("Configure the provider.\n"));

    let task = service.get_task_by_key("T-E01-F01-004").await.unwrap();
    assert_eq!(task.title, "Setup");
    assert_eq!(task.description.as_deref(), Some("Configure the provider."));

    let again = engine.run(&RunOptions::new(&root)).await.unwrap();
    assert_eq!(again.keys_generated, 0);
    assert_eq!(again.tasks_imported, 0);
}

#[tokio::test]
async fn keyless_file_in_an_exhausted_feature_is_skipped() {
    let (_dir, root) = docs_root();
    let service = store().await;
    seed_feature(&service, "E01", "E01-F01").await;
    let feature = service.get_feature_by_key("E01-F01").await.unwrap();
    service
        .create_task(&feature.id, "T-E01-F01-999", "Last", None, None, 5)
        .await
        .unwrap();
    write(&root, "E01-F01-auth/T-E01-F01-001.md", &task_file("Keyed"));
    let keyless = write(&root, "E01-F01-auth/01-overflow.md", "One too many.\n");

    let report = SyncEngine::new(&service, registry(&["task", "numbered"]))
        .run(&RunOptions::new(&root))
        .await
        .unwrap();

    assert_eq!(report.keys_generated, 0);
    assert_eq!(report.tasks_imported, 1);
    assert!(
        report
            .warnings
            .iter()
            .any(|w| w.contains("01-overflow.md") && w.contains("no task sequence numbers left"))
    );
    assert_eq!(fs::read_to_string(keyless).unwrap(), "One too many.\n");
}

#[tokio::test]
async fn keyless_file_outside_a_feature_folder_is_skipped() {
    let (_dir, root) = docs_root();
    let service = store().await;
    write(&root, "loose/01-idea.md", "An idea.\n");

    let report = SyncEngine::new(&service, registry(&["numbered"]))
        .run(&RunOptions::new(&root))
        .await
        .unwrap();

    assert_eq!(report.keys_generated, 0);
    assert_eq!(report.tasks_imported, 0);
    assert_eq!(report.warnings.len(), 1);
}

// ---------------------------------------------------------------------------
// Manual resolution
// ---------------------------------------------------------------------------

#[tokio::test]
async fn manual_strategy_asks_the_chooser_per_conflict() {
    let (_dir, root) = docs_root();
    let service = store().await;
    seed_feature(&service, "E01", "E01-F01").await;
    let feature = service.get_feature_by_key("E01-F01").await.unwrap();
    let path = write(&root, "E01-F01/T-E01-F01-001.md", &task_file("File title"));
    service
        .create_task(
            &feature.id,
            "T-E01-F01-001",
            "Store title",
            None,
            path.to_str(),
            5,
        )
        .await
        .unwrap();
    let engine = SyncEngine::new(&service, registry(&["task"]));

    let mut options = RunOptions::new(&root);
    options.strategy = ResolutionStrategy::Manual(Arc::new(ScriptedChooser::new([Side::Store])));
    let kept = engine.run(&options).await.unwrap();
    assert_eq!(kept.conflicts_resolved, 1);
    assert_eq!(kept.tasks_updated, 0);

    options.strategy = ResolutionStrategy::Manual(Arc::new(ScriptedChooser::new([Side::File])));
    let taken = engine.run(&options).await.unwrap();
    assert_eq!(taken.tasks_updated, 1);
    let task = service.get_task_by_key("T-E01-F01-001").await.unwrap();
    assert_eq!(task.title, "File title");
}

#[tokio::test]
async fn manual_strategy_without_an_answer_fails() {
    let (_dir, root) = docs_root();
    let service = store().await;
    seed_feature(&service, "E01", "E01-F01").await;
    let feature = service.get_feature_by_key("E01-F01").await.unwrap();
    let path = write(&root, "E01-F01/T-E01-F01-001.md", &task_file("File title"));
    service
        .create_task(&feature.id, "T-E01-F01-001", "Store", None, path.to_str(), 5)
        .await
        .unwrap();

    let mut options = RunOptions::new(&root);
    options.strategy = ResolutionStrategy::Manual(Arc::new(ScriptedChooser::new([])));
    let failure = SyncEngine::new(&service, registry(&["task"]))
        .run(&options)
        .await
        .unwrap_err();
    assert!(matches!(failure.error, SyncError::Prompt(_)));
}

// ---------------------------------------------------------------------------
// Cleanup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cleanup_deletes_tasks_whose_files_are_gone() {
    let (_dir, root) = docs_root();
    write(&root, "E01-F01/T-E01-F01-001.md", &task_file("Keep"));
    let gone = write(&root, "E01-F01/T-E01-F01-002.md", &task_file("Remove"));
    let service = store().await;
    let engine = SyncEngine::new(&service, registry(&["task"]));

    let mut options = RunOptions::new(&root);
    options.create_missing = true;
    engine.run(&options).await.unwrap();

    fs::remove_file(gone).unwrap();
    options.cleanup = true;
    let report = engine.run(&options).await.unwrap();
    assert_eq!(report.tasks_deleted, 1);
    assert!(
        service
            .find_task_by_key("T-E01-F01-002")
            .await
            .unwrap()
            .is_none()
    );

    // Incremental runs never delete.
    options.last_sync = Some(Utc::now());
    let incremental = engine.run(&options).await.unwrap();
    assert_eq!(incremental.tasks_deleted, 0);
    assert!(incremental.warnings.iter().any(|w| w.contains("Cleanup skipped")));
}

#[tokio::test]
async fn cleanup_keeps_a_task_whose_file_moved() {
    let (_dir, root) = docs_root();
    let original = write(&root, "E01-F01/T-E01-F01-001.md", &task_file("Moving"));
    let service = store().await;
    let engine = SyncEngine::new(&service, registry(&["task"]));

    let mut options = RunOptions::new(&root);
    options.create_missing = true;
    engine.run(&options).await.unwrap();
    let before = service.get_task_by_key("T-E01-F01-001").await.unwrap();

    let moved = root.join("E01-F01/done/T-E01-F01-001.md");
    fs::create_dir_all(moved.parent().unwrap()).unwrap();
    fs::rename(&original, &moved).unwrap();

    options.cleanup = true;
    let report = engine.run(&options).await.unwrap();
    assert_eq!(report.tasks_updated, 1);
    assert_eq!(report.tasks_deleted, 0);

    let after = service.get_task_by_key("T-E01-F01-001").await.unwrap();
    assert_eq!(after.id, before.id);
    assert_eq!(after.priority, before.priority);
    assert_eq!(after.status, before.status);
    assert_eq!(after.file_path.as_deref(), moved.to_str());
    assert_eq!(service.list_task_history(&after.id).await.unwrap().len(), 2);
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

fn discovery_tree(root: &Path) {
    write(
        root,
        "epic-index.md",
        "# Plan\n\n- [Authentication](E01-auth/)\n  - [Login flow](E01-auth/E01-F01-login/)\n",
    );
    write(root, "E01-auth/epic.md", "# Authentication\n\nEverything about signing in.\n");
    write(root, "E01-auth/E01-F01-login/prd.md", "# Login flow\n\nPassword and SSO login.\n");
    write(root, "E01-auth/E01-F01-login/T-E01-F01-001.md", &task_file("Login form"));
}

#[tokio::test]
async fn discovery_imports_parents_before_tasks() {
    let (_dir, root) = docs_root();
    discovery_tree(&root);
    let service = store().await;
    let engine = SyncEngine::new(&service, registry(&["task"]));

    let mut options = RunOptions::new(&root);
    options.discovery = Some(DiscoveryOptions::default());
    let report = engine.run(&options).await.unwrap();

    let discovery = report.discovery.as_ref().unwrap();
    assert!(discovery.index_found);
    assert_eq!(discovery.epics_imported, 1);
    assert_eq!(discovery.features_imported, 1);
    assert_eq!(discovery.conflicts_detected, 0);
    assert_eq!(report.tasks_imported, 1);

    let epic = service.get_epic_by_key("E01").await.unwrap();
    assert_eq!(epic.title, "Authentication");
    assert_eq!(epic.description.as_deref(), Some("Everything about signing in."));
    let feature = service.get_feature_by_key("E01-F01").await.unwrap();
    assert_eq!(feature.title, "Login flow");

    let again = engine.run(&options).await.unwrap();
    let rediscovery = again.discovery.as_ref().unwrap();
    assert_eq!(rediscovery.epics_imported, 0);
    assert_eq!(rediscovery.epics_updated, 0);
    assert_eq!(rediscovery.features_updated, 0);
    assert_eq!(again.tasks_imported, 0);
}

#[tokio::test]
async fn discovery_runs_are_deterministic() {
    let (_dir, root) = docs_root();
    discovery_tree(&root);
    write(&root, "E02-billing/epic.md", "# Billing\n");
    write(&root, "E02-billing/E02-F01-invoices/prd.md", "# Invoices\n");

    let run = || async {
        let service = store().await;
        let mut options = RunOptions::new(&root);
        options.discovery = Some(DiscoveryOptions::default());
        options.dry_run = true;
        let report = SyncEngine::new(&service, registry(&["task"]))
            .run(&options)
            .await
            .unwrap();
        serde_json::to_string(&report).unwrap()
    };

    let first = run().await;
    let second = run().await;
    assert_eq!(first, second);
    assert!(first.contains("\"epics_discovered\":2"));
}

#[tokio::test]
async fn short_feature_folders_get_keys_for_their_tasks() {
    let (_dir, root) = docs_root();
    write(&root, "E04-auth/epic.md", "# Auth\n");
    let path = write(&root, "E04-auth/F07-login/01-setup.md", "Wire the login form.\n");
    let service = store().await;
    let engine = SyncEngine::new(&service, registry(&["numbered"]));

    let mut options = RunOptions::new(&root);
    options.discovery = Some(DiscoveryOptions {
        strategy: DiscoveryStrategy::FolderOnly,
        validation_level: ValidationLevel::Balanced,
        ..DiscoveryOptions::default()
    });
    let report = engine.run(&options).await.unwrap();

    assert_eq!(report.discovery.as_ref().unwrap().features_imported, 1);
    assert_eq!(report.keys_generated, 1);
    assert_eq!(report.tasks_imported, 1);
    assert!(report.warnings.iter().all(|w| !w.contains("no feature folder")));

    let task = service.get_task_by_key("T-E04-F07-001").await.unwrap();
    assert_eq!(task.file_path.as_deref(), path.to_str());
}
