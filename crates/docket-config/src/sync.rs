//! Sync pass configuration.

use docket_core::enums::ConflictStrategyKind;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default ceiling for a single work-item file (1 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Default clock skew tolerance in seconds.
pub const DEFAULT_CLOCK_SKEW_SECS: u64 = 60;

/// A named filename pattern. Order in the list is match priority.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PatternConfig {
    pub name: String,
    pub regex: String,
}

impl PatternConfig {
    fn new(name: &str, regex: &str) -> Self {
        Self {
            name: name.to_string(),
            regex: regex.to_string(),
        }
    }
}

/// Built-in filename patterns in priority order.
///
/// - `task`: fully-qualified key embedded in the filename
/// - `numbered`: sequence number + slug, key generated on sync
/// - `prp`: `.prp.md` marker suffix, key generated on sync
#[must_use]
pub fn builtin_patterns() -> Vec<PatternConfig> {
    vec![
        PatternConfig::new(
            "task",
            r"^(?P<task_key>T-E\d{2}(?:-P\d{2})?-F\d{2}-\d{3})(?:-(?P<slug>.+?))?\.md$",
        ),
        PatternConfig::new("numbered", r"^(?P<number>\d{2,3})-(?P<slug>.+)\.md$"),
        PatternConfig::new("prp", r"^(?P<slug>.+)\.prp\.md$"),
    ]
}

fn default_docs_root() -> String {
    "docs/plan".to_string()
}

fn default_enabled_patterns() -> Vec<String> {
    vec!["task".to_string()]
}

const fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

const fn default_clock_skew_secs() -> u64 {
    DEFAULT_CLOCK_SKEW_SECS
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Folder scanned for work-item files, relative to the project root.
    #[serde(default = "default_docs_root")]
    pub docs_root: String,

    /// Conflict resolution strategy when none is given on the command line.
    #[serde(default)]
    pub strategy: ConflictStrategyKind,

    /// Known filename patterns, in match priority order.
    #[serde(default = "builtin_patterns")]
    pub patterns: Vec<PatternConfig>,

    /// Names from `patterns` that are active.
    #[serde(default = "default_enabled_patterns")]
    pub enabled_patterns: Vec<String>,

    /// Files larger than this are skipped by the scanner.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Tolerance for clock differences between file writers and the store host.
    #[serde(default = "default_clock_skew_secs")]
    pub clock_skew_tolerance_secs: u64,

    /// Create missing parent epics/features for imported tasks.
    #[serde(default)]
    pub create_missing: bool,

    /// Delete tasks whose files disappeared (full scans only).
    #[serde(default)]
    pub cleanup: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            docs_root: default_docs_root(),
            strategy: ConflictStrategyKind::default(),
            patterns: builtin_patterns(),
            enabled_patterns: default_enabled_patterns(),
            max_file_size: default_max_file_size(),
            clock_skew_tolerance_secs: default_clock_skew_secs(),
            create_missing: false,
            cleanup: false,
        }
    }
}

impl SyncConfig {
    /// Patterns that are enabled, in priority order.
    pub fn active_patterns(&self) -> impl Iterator<Item = &PatternConfig> {
        self.patterns
            .iter()
            .filter(|pattern| self.enabled_patterns.contains(&pattern.name))
    }

    /// Check cross-field constraints figment cannot express.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for a zero file size ceiling, duplicate
    /// pattern names, or an enabled pattern that is not defined.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_file_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sync.max_file_size".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        for (idx, pattern) in self.patterns.iter().enumerate() {
            if self.patterns[..idx].iter().any(|p| p.name == pattern.name) {
                return Err(ConfigError::InvalidValue {
                    field: "sync.patterns".to_string(),
                    reason: format!("duplicate pattern name '{}'", pattern.name),
                });
            }
        }

        if let Some(unknown) = self
            .enabled_patterns
            .iter()
            .find(|name| !self.patterns.iter().any(|p| &p.name == *name))
        {
            return Err(ConfigError::InvalidValue {
                field: "sync.enabled_patterns".to_string(),
                reason: format!("pattern '{unknown}' is not defined"),
            });
        }

        Ok(())
    }
}
