//! Filename pattern registry.
//!
//! Each pattern is a named regex over the bare file name. The registry tries
//! patterns in registration order and reports the first match together with
//! its named captures. A `task_key` capture means the file carries its own
//! key; without one the key comes from frontmatter or is generated.

use std::collections::BTreeMap;

use docket_config::{PatternConfig, SyncConfig};
use regex::Regex;

use crate::error::SyncError;

/// Capture group carrying an embedded task key.
pub const TASK_KEY_CAPTURE: &str = "task_key";

/// Capture group carrying a human slug.
pub const SLUG_CAPTURE: &str = "slug";

#[derive(Debug, Clone)]
struct FilePattern {
    name: String,
    regex: Regex,
}

/// The pattern that claimed a file, with its named captures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    pub pattern: String,
    pub captures: BTreeMap<String, String>,
}

impl PatternMatch {
    /// Key embedded in the file name, if the pattern captures one.
    #[must_use]
    pub fn task_key(&self) -> Option<&str> {
        self.captures.get(TASK_KEY_CAPTURE).map(String::as_str)
    }

    #[must_use]
    pub fn slug(&self) -> Option<&str> {
        self.captures.get(SLUG_CAPTURE).map(String::as_str)
    }
}

/// Ordered set of compiled filename patterns.
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    patterns: Vec<FilePattern>,
}

impl PatternRegistry {
    /// Compile `configs` in order.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Pattern` if a regex does not compile.
    pub fn new<'a>(configs: impl IntoIterator<Item = &'a PatternConfig>) -> Result<Self, SyncError> {
        let patterns = configs
            .into_iter()
            .map(|config| {
                Regex::new(&config.regex)
                    .map(|regex| FilePattern {
                        name: config.name.clone(),
                        regex,
                    })
                    .map_err(|e| SyncError::Pattern {
                        name: config.name.clone(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Registry of the patterns `config` enables.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Pattern` if a regex does not compile.
    pub fn from_config(config: &SyncConfig) -> Result<Self, SyncError> {
        Self::new(config.active_patterns())
    }

    /// Registry restricted to `names`, keeping the configured priority order.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Pattern` if a name is not defined or a regex does not compile.
    pub fn with_enabled(config: &SyncConfig, names: &[String]) -> Result<Self, SyncError> {
        if let Some(unknown) = names
            .iter()
            .find(|name| !config.patterns.iter().any(|p| &p.name == *name))
        {
            return Err(SyncError::Pattern {
                name: unknown.clone(),
                reason: "pattern is not defined".to_string(),
            });
        }
        Self::new(config.patterns.iter().filter(|p| names.contains(&p.name)))
    }

    /// First pattern matching `file_name`, or `None`.
    #[must_use]
    pub fn match_file(&self, file_name: &str) -> Option<PatternMatch> {
        self.patterns.iter().find_map(|pattern| {
            let caps = pattern.regex.captures(file_name)?;
            let captures = pattern
                .regex
                .capture_names()
                .flatten()
                .filter_map(|name| {
                    caps.name(name)
                        .map(|m| (name.to_string(), m.as_str().to_string()))
                })
                .collect();
            Some(PatternMatch {
                pattern: pattern.name.clone(),
                captures,
            })
        })
    }

    /// Pattern names in priority order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|p| p.name.as_str())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
