use clap::{Args, Subcommand};
use docket_core::enums::{ConflictStrategyKind, DiscoveryStrategy, ValidationLevel};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Initialize docket for a project.
    Init(InitArgs),
    /// Sync work-item files into the store.
    Sync(SyncArgs),
    /// Show the last sync time and store counts.
    Status,
}

/// Arguments for `docket init`.
#[derive(Clone, Debug, Args)]
pub struct InitArgs {
    /// Directory to initialize (defaults to the current directory).
    #[arg(default_value = ".")]
    pub path: String,
    /// Docs folder written to the generated config.
    #[arg(long)]
    pub docs_root: Option<String>,
    /// Overwrite an existing config file.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for `docket sync`.
#[derive(Clone, Debug, Args)]
#[allow(clippy::struct_excessive_bools)]
pub struct SyncArgs {
    /// Folder to scan, relative to the project root (default: `sync.docs_root`).
    #[arg(long)]
    pub folder: Option<String>,
    /// Plan and report without writing anything.
    #[arg(long)]
    pub dry_run: bool,
    /// Conflict strategy: file-wins, store-wins (database-wins), newer-wins, manual.
    #[arg(long)]
    pub strategy: Option<ConflictStrategyKind>,
    /// Create missing epics and features for new tasks.
    #[arg(long)]
    pub create_missing: bool,
    /// Delete tasks whose files were removed (full scans only).
    #[arg(long)]
    pub cleanup: bool,
    /// Enable a filename pattern by name (repeatable; replaces the configured set).
    #[arg(long = "pattern")]
    pub patterns: Vec<String>,
    /// Process every file regardless of the last sync time.
    #[arg(long)]
    pub force_full_scan: bool,
    /// Run epic/feature discovery before syncing tasks.
    #[arg(long)]
    pub index: bool,
    /// Discovery strategy: index-only, folder-only, merge.
    #[arg(long)]
    pub discovery_strategy: Option<DiscoveryStrategy>,
    /// Folder-name grammar: strict, balanced, permissive.
    #[arg(long)]
    pub validation_level: Option<ValidationLevel>,
}
