//! Epic/feature discovery configuration.

use docket_core::enums::{DiscoveryStrategy, ValidationLevel};
use serde::{Deserialize, Serialize};

fn default_index_file() -> String {
    "epic-index.md".to_string()
}

fn default_related_doc_globs() -> Vec<String> {
    [
        "[0-9][0-9]-*.md",
        "architecture*.md",
        "design*.md",
        "decision*.md",
        "notes*.md",
        "research*.md",
        "*-spec.md",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscoveryConfig {
    /// Run discovery before every sync pass.
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub strategy: DiscoveryStrategy,

    #[serde(default)]
    pub validation_level: ValidationLevel,

    /// Index document name, relative to the docs root.
    #[serde(default = "default_index_file")]
    pub index_file: String,

    /// Globs (matched against file names) cataloged as a feature's related docs.
    #[serde(default = "default_related_doc_globs")]
    pub related_doc_globs: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            strategy: DiscoveryStrategy::default(),
            validation_level: ValidationLevel::default(),
            index_file: default_index_file(),
            related_doc_globs: default_related_doc_globs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = DiscoveryConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.strategy, DiscoveryStrategy::Merge);
        assert_eq!(config.validation_level, ValidationLevel::Balanced);
        assert_eq!(config.index_file, "epic-index.md");
        assert!(config.related_doc_globs.iter().any(|g| g == "architecture*.md"));
    }
}
