//! Key grammar for the work hierarchy.
//!
//! ```text
//! epic     E04 | tech-debt | bugs | change-cards
//! feature  E04-F07 | E09-P02-F01
//! task     T-E04-F07-001 | T-E09-P02-F01-001
//! ```

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::CoreError;

/// Epic keys that name a standing bucket instead of a numbered epic.
pub const SPECIAL_EPIC_KEYS: [&str; 3] = ["tech-debt", "bugs", "change-cards"];

static EPIC_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^E\d{2}$").expect("valid regex"));
static FEATURE_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<epic>E\d{2}|tech-debt|bugs|change-cards)(?:-(?P<project>P\d{2}))?-(?P<feature>F\d{2})$")
        .expect("valid regex")
});
static TASK_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^T-(?P<epic>E\d{2})(?:-(?P<project>P\d{2}))?-(?P<feature>F\d{2})-(?P<seq>\d{3})$")
        .expect("valid regex")
});

/// Whether `key` is a numbered (`E04`) or special (`bugs`) epic key.
#[must_use]
pub fn is_epic_key(key: &str) -> bool {
    EPIC_KEY.is_match(key) || SPECIAL_EPIC_KEYS.contains(&key)
}

/// Whether `key` is a feature key, with or without a project segment.
#[must_use]
pub fn is_feature_key(key: &str) -> bool {
    FEATURE_KEY.is_match(key)
}

/// Epic portion of a feature key (`E09-P02-F01` -> `E09`).
#[must_use]
pub fn epic_of_feature(feature_key: &str) -> Option<&str> {
    FEATURE_KEY
        .captures(feature_key)
        .and_then(|caps| caps.name("epic"))
        .map(|m| m.as_str())
}

/// A parsed task key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskKey {
    pub epic: String,
    pub project: Option<String>,
    pub feature: String,
    pub sequence: u32,
}

impl TaskKey {
    /// Parse `T-E04-F07-001` into its parts.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidKey` if `key` does not follow the task grammar.
    pub fn parse(key: &str) -> Result<Self, CoreError> {
        let invalid = || CoreError::InvalidKey {
            kind: "task",
            key: key.to_string(),
        };
        let caps = TASK_KEY.captures(key).ok_or_else(invalid)?;
        let sequence = caps["seq"].parse::<u32>().map_err(|_| invalid())?;
        Ok(Self {
            epic: caps["epic"].to_string(),
            project: caps.name("project").map(|m| m.as_str().to_string()),
            feature: caps["feature"].to_string(),
            sequence,
        })
    }

    /// Owning feature key (`E04-F07`, `E09-P02-F01`).
    #[must_use]
    pub fn feature_key(&self) -> String {
        match &self.project {
            Some(project) => format!("{}-{project}-{}", self.epic, self.feature),
            None => format!("{}-{}", self.epic, self.feature),
        }
    }

    /// Build the task key string for `sequence` within `feature_key`.
    #[must_use]
    pub fn format(feature_key: &str, sequence: u32) -> String {
        format!("T-{feature_key}-{sequence:03}")
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Self::format(&self.feature_key(), self.sequence))
    }
}
