//! Status enums and sync option enums for Docket.
//!
//! Stored statuses use `snake_case` serialization. Option enums that users type
//! on the command line or in config (`file-wins`, `index-only`) use `kebab-case`
//! and implement `FromStr` with the same spelling.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::CoreError;

fn parse_named<T: DeserializeOwned>(value: &str, what: &str, allowed: &str) -> Result<T, CoreError> {
    serde_json::from_value(serde_json::Value::String(value.trim().to_ascii_lowercase())).map_err(
        |_| CoreError::Validation(format!("unknown {what} '{value}' (expected one of: {allowed})")),
    )
}

// ---------------------------------------------------------------------------
// TaskStatus
// ---------------------------------------------------------------------------

/// Operational status of a task. Owned by the store; never read from files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Blocked,
    ReadyForReview,
    Completed,
    Archived,
}

impl TaskStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Blocked => "blocked",
            Self::ReadyForReview => "ready_for_review",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PlanStatus
// ---------------------------------------------------------------------------

/// Status shared by epics and features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Draft,
    Active,
    Completed,
    Archived,
}

impl PlanStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Coarse epic priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ConflictStrategyKind
// ---------------------------------------------------------------------------

/// Name of a conflict resolution strategy as written in config or on the CLI.
///
/// `database-wins` is accepted as an alias of `store-wins`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictStrategyKind {
    #[default]
    FileWins,
    #[serde(alias = "database-wins")]
    StoreWins,
    NewerWins,
    Manual,
}

impl ConflictStrategyKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FileWins => "file-wins",
            Self::StoreWins => "store-wins",
            Self::NewerWins => "newer-wins",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for ConflictStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictStrategyKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_named(
            s,
            "conflict strategy",
            "file-wins, store-wins, database-wins, newer-wins, manual",
        )
    }
}

// ---------------------------------------------------------------------------
// DiscoveryStrategy
// ---------------------------------------------------------------------------

/// How the index document and the folder tree are combined during discovery.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "kebab-case")]
pub enum DiscoveryStrategy {
    IndexOnly,
    FolderOnly,
    #[default]
    Merge,
}

impl DiscoveryStrategy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IndexOnly => "index-only",
            Self::FolderOnly => "folder-only",
            Self::Merge => "merge",
        }
    }
}

impl fmt::Display for DiscoveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscoveryStrategy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_named(s, "discovery strategy", "index-only, folder-only, merge")
    }
}

// ---------------------------------------------------------------------------
// ValidationLevel
// ---------------------------------------------------------------------------

/// Strictness of the folder-name grammar accepted during discovery.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationLevel {
    Strict,
    #[default]
    Balanced,
    Permissive,
}

impl ValidationLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Balanced => "balanced",
            Self::Permissive => "permissive",
        }
    }
}

impl fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_named(s, "validation level", "strict, balanced, permissive")
    }
}

// ---------------------------------------------------------------------------
// DiscoverySource
// ---------------------------------------------------------------------------

/// Which discovery producer an entity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DiscoverySource {
    Index,
    Folder,
    Merged,
}

impl DiscoverySource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Folder => "folder",
            Self::Merged => "merged",
        }
    }
}

impl fmt::Display for DiscoverySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ConflictField
// ---------------------------------------------------------------------------

/// File-overridable fields that take part in conflict detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConflictField {
    Title,
    Description,
    FilePath,
}

impl ConflictField {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::FilePath => "file_path",
        }
    }
}

impl fmt::Display for ConflictField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
