//! Sync pass reports.
//!
//! Reports serialize to JSON for machine consumers and render as a plain-text
//! summary for people. The JSON schema is derived with `schemars`.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

use docket_core::enums::DiscoveryStrategy;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::conflict::FieldConflict;
use crate::discovery::{DiscoveryConflict, DiscoveryOutcome};

/// Counters and messages from one sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RunReport {
    pub dry_run: bool,
    pub files_scanned: usize,
    /// Files that survived the incremental filter.
    pub files_filtered: usize,
    pub files_skipped: usize,
    /// Filtered files whose path the store did not know.
    pub files_new: usize,
    pub tasks_imported: usize,
    pub tasks_updated: usize,
    pub tasks_deleted: usize,
    pub keys_generated: usize,
    pub conflicts_resolved: usize,
    /// Files claimed by each filename pattern.
    pub pattern_matches: BTreeMap<String, usize>,
    pub conflicts: Vec<FieldConflict>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery: Option<DiscoveryReport>,
}

impl RunReport {
    #[must_use]
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    /// Record and log a non-fatal problem.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{message}");
        self.warnings.push(message);
    }

    #[must_use]
    pub const fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Discovery section of a [`RunReport`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DiscoveryReport {
    pub strategy: DiscoveryStrategy,
    pub index_found: bool,
    pub folders_scanned: usize,
    pub files_analyzed: usize,
    pub epics_discovered: usize,
    pub features_discovered: usize,
    pub epics_imported: usize,
    pub epics_updated: usize,
    pub features_imported: usize,
    pub features_updated: usize,
    pub conflicts_detected: usize,
    pub conflicts_resolved: usize,
    pub conflicts: Vec<DiscoveryConflict>,
    pub warnings: Vec<String>,
}

impl DiscoveryReport {
    /// Summarize `outcome`; import counters start at zero.
    #[must_use]
    pub fn from_outcome(strategy: DiscoveryStrategy, outcome: &DiscoveryOutcome) -> Self {
        Self {
            strategy,
            index_found: outcome.index_found,
            folders_scanned: outcome.folders_scanned,
            files_analyzed: outcome.files_analyzed,
            epics_discovered: outcome.epics.len(),
            features_discovered: outcome.features.len(),
            conflicts_detected: outcome.conflicts.len(),
            conflicts_resolved: outcome.conflicts.len(),
            conflicts: outcome.conflicts.clone(),
            warnings: outcome.warnings.clone(),
            ..Self::default()
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{message}");
        self.warnings.push(message);
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        if self.dry_run {
            out.push_str("DRY-RUN MODE: no changes were made\n\n");
        }
        out.push_str("Sync Summary:\n");
        let rows = [
            ("Files scanned", self.files_scanned),
            ("Files filtered", self.files_filtered),
            ("Files skipped", self.files_skipped),
            ("New files", self.files_new),
            ("Tasks imported", self.tasks_imported),
            ("Tasks updated", self.tasks_updated),
            ("Tasks deleted", self.tasks_deleted),
            ("Keys generated", self.keys_generated),
            ("Conflicts resolved", self.conflicts_resolved),
        ];
        for (label, value) in rows {
            writeln!(out, "  {:<20}{value}", format!("{label}:"))?;
        }
        if !self.pattern_matches.is_empty() {
            out.push_str("  Pattern matches:\n");
            for (pattern, count) in &self.pattern_matches {
                writeln!(out, "    {pattern}: {count}")?;
            }
        }

        if let Some(discovery) = &self.discovery {
            writeln!(out, "\nDiscovery ({}):", discovery.strategy)?;
            let rows = [
                ("Folders scanned", discovery.folders_scanned),
                ("Files analyzed", discovery.files_analyzed),
                ("Epics found", discovery.epics_discovered),
                ("Epics imported", discovery.epics_imported),
                ("Epics updated", discovery.epics_updated),
                ("Features found", discovery.features_discovered),
                ("Features imported", discovery.features_imported),
                ("Features updated", discovery.features_updated),
                ("Conflicts", discovery.conflicts_detected),
            ];
            writeln!(
                out,
                "  {:<20}{}",
                "Index found:",
                if discovery.index_found { "yes" } else { "no" }
            )?;
            for (label, value) in rows {
                writeln!(out, "  {:<20}{value}", format!("{label}:"))?;
            }
            for conflict in &discovery.conflicts {
                writeln!(out, "  - {}", conflict.message)?;
                writeln!(out, "    suggestion: {}", conflict.suggestion)?;
            }
            for warning in &discovery.warnings {
                writeln!(out, "  ! {warning}")?;
            }
        }

        if !self.conflicts.is_empty() {
            out.push_str("\nConflicts:\n");
            for c in &self.conflicts {
                writeln!(
                    out,
                    "  {} {}: file={:?} store={:?}",
                    c.key, c.field, c.file_value, c.store_value
                )?;
            }
        }
        if !self.warnings.is_empty() {
            out.push_str("\nWarnings:\n");
            for warning in &self.warnings {
                writeln!(out, "  - {warning}")?;
            }
        }
        if !self.errors.is_empty() {
            out.push_str("\nErrors:\n");
            for error in &self.errors {
                writeln!(out, "  - {error}")?;
            }
        }
        f.write_str(out.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use docket_core::enums::ConflictField;
    use pretty_assertions::assert_eq;

    use super::*;

    fn sample() -> RunReport {
        let mut report = RunReport::new(true);
        report.files_scanned = 12;
        report.files_filtered = 3;
        report.tasks_imported = 2;
        report.pattern_matches.insert("task".into(), 3);
        report.conflicts.push(FieldConflict {
            key: "T-E04-F07-001".into(),
            field: ConflictField::Title,
            file_value: "New".into(),
            store_value: "Old".into(),
        });
        report.warnings.push("Cannot read x.md".into());
        report
    }

    #[test]
    fn text_summary_lists_counters_and_messages() {
        let text = sample().to_string();
        assert!(text.starts_with("DRY-RUN MODE"));
        assert!(text.contains("  Files scanned:      12"));
        assert!(text.contains("  Tasks imported:     2"));
        assert!(text.contains("    task: 3"));
        assert!(text.contains("T-E04-F07-001 title: file=\"New\" store=\"Old\""));
        assert!(text.contains("Warnings:\n  - Cannot read x.md"));
        assert!(!text.contains("Discovery"));
    }

    #[test]
    fn discovery_section_is_rendered_when_present() {
        let mut report = RunReport::new(false);
        report.discovery = Some(DiscoveryReport {
            index_found: true,
            epics_discovered: 2,
            ..DiscoveryReport::default()
        });
        let text = report.to_string();
        assert!(text.contains("Discovery (merge):"));
        assert!(text.contains("Index found:        yes"));
        assert!(text.contains("Epics found:        2"));
    }

    #[test]
    fn json_omits_absent_discovery() {
        let json = serde_json::to_value(RunReport::new(false)).unwrap();
        assert!(json.get("discovery").is_none());
        assert_eq!(json["dry_run"], false);
    }

    #[test]
    fn json_matches_schema() {
        let schema = serde_json::to_value(schemars::schema_for!(RunReport)).unwrap();
        let validator = jsonschema::validator_for(&schema).unwrap();
        let json = serde_json::to_value(sample()).unwrap();
        assert!(validator.is_valid(&json));

        let back: RunReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, sample());
    }
}
