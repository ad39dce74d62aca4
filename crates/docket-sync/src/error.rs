//! Error types for docket-sync.

use std::path::PathBuf;

use docket_core::errors::CoreError;
use docket_db::error::DatabaseError;
use thiserror::Error;

use crate::report::RunReport;

/// Errors that abort a sync pass (or fail a component outright).
///
/// Per-file problems never surface here; they become report warnings.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The sync root does not exist or is not a directory.
    #[error("Root directory not found: {}", path.display())]
    RootNotFound { path: PathBuf },

    /// A filesystem operation on a required path failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Store access failed (open, query, transaction).
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// A new task's feature does not exist and cannot be created.
    #[error("Task {task_key} references missing feature {feature_key}; {hint}")]
    MissingParent {
        task_key: String,
        feature_key: String,
        hint: String,
    },

    /// The index document is required but absent.
    #[error("Index document not found: {}", path.display())]
    IndexMissing { path: PathBuf },

    /// The index document exists but cannot be read as text.
    #[error("Index document {} is malformed: {reason}", path.display())]
    IndexMalformed { path: PathBuf, reason: String },

    /// Index-only discovery found an index entry with no folder behind it.
    #[error("Index lists {level} {key} but no matching folder exists")]
    IndexFolderMissing { level: &'static str, key: String },

    /// A configured filename pattern or glob does not compile.
    #[error("Invalid pattern '{name}': {reason}")]
    Pattern { name: String, reason: String },

    /// Interactive conflict resolution failed (end of input, I/O).
    #[error("Manual resolution failed: {0}")]
    Prompt(String),

    /// Validation error from docket-core.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// A fatal sync error together with everything the pass recorded before failing.
///
/// The store transaction has been rolled back by the time this is returned.
#[derive(Debug, Error)]
#[error("sync pass failed")]
pub struct SyncFailure {
    pub report: Box<RunReport>,
    #[source]
    pub error: SyncError,
}
