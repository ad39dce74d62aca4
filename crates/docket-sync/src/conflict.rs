//! Field-level conflict detection between a file and its stored task.
//!
//! Only `title`, `description` and `file_path` are compared. A title
//! conflicts when the file supplies one; a description only when both sides
//! have one. A missing stored path always conflicts with the file location.
//!
//! With a last sync time, each side is classified as changed when its
//! timestamp falls after `last_sync - tolerance`. Conflicts are reported only
//! when both sides changed; a path difference is always reported because the
//! file location is authoritative for where the task lives.

use chrono::{DateTime, TimeDelta, Utc};
use docket_core::entities::Task;
use docket_core::enums::ConflictField;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::metadata::ParsedMetadata;

/// A field whose file and store values differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FieldConflict {
    pub key: String,
    pub field: ConflictField,
    pub file_value: String,
    pub store_value: String,
}

/// Which sides changed since the last sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSide {
    Neither,
    FileOnly,
    StoreOnly,
    Both,
}

/// Conflicts found for one task, with the change classification when known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// `None` when no last sync time was available.
    pub changes: Option<ChangeSide>,
    pub conflicts: Vec<FieldConflict>,
}

pub struct ConflictDetector {
    tolerance: TimeDelta,
}

impl ConflictDetector {
    #[must_use]
    pub const fn new(tolerance: TimeDelta) -> Self {
        Self { tolerance }
    }

    /// Compare every syncable field regardless of timestamps.
    #[must_use]
    pub fn detect_basic(&self, meta: &ParsedMetadata, record: &Task) -> Vec<FieldConflict> {
        let mut conflicts = Vec::new();
        let mut push = |field, file_value: &str, store_value: &str| {
            conflicts.push(FieldConflict {
                key: meta.key.clone(),
                field,
                file_value: file_value.to_string(),
                store_value: store_value.to_string(),
            });
        };

        if let Some(title) = meta.title.as_deref()
            && title != record.title
        {
            push(ConflictField::Title, title, &record.title);
        }
        if let (Some(file), Some(store)) = (meta.description.as_deref(), record.description.as_deref())
            && file != store
        {
            push(ConflictField::Description, file, store);
        }
        if Some(meta.file_path.as_str()) != record.file_path.as_deref() {
            push(
                ConflictField::FilePath,
                &meta.file_path,
                record.file_path.as_deref().unwrap_or_default(),
            );
        }
        conflicts
    }

    /// Classify which sides changed since `last_sync`.
    #[must_use]
    pub fn classify(
        &self,
        meta: &ParsedMetadata,
        record: &Task,
        last_sync: DateTime<Utc>,
    ) -> ChangeSide {
        let threshold = last_sync - self.tolerance;
        match (meta.modified_at > threshold, record.updated_at > threshold) {
            (true, true) => ChangeSide::Both,
            (true, false) => ChangeSide::FileOnly,
            (false, true) => ChangeSide::StoreOnly,
            (false, false) => ChangeSide::Neither,
        }
    }

    /// Detect conflicts using the last sync time when one is available.
    ///
    /// | changes     | reported conflicts          |
    /// |-------------|-----------------------------|
    /// | no history  | basic comparison            |
    /// | both        | basic comparison            |
    /// | file only   | `file_path` difference only |
    /// | store only  | none                        |
    /// | neither     | none                        |
    #[must_use]
    pub fn detect_with_sync_awareness(
        &self,
        meta: &ParsedMetadata,
        record: &Task,
        last_sync: Option<DateTime<Utc>>,
    ) -> Detection {
        let Some(last_sync) = last_sync else {
            return Detection {
                changes: None,
                conflicts: self.detect_basic(meta, record),
            };
        };

        let changes = self.classify(meta, record, last_sync);
        let conflicts = match changes {
            ChangeSide::Both => self.detect_basic(meta, record),
            ChangeSide::FileOnly => self
                .detect_basic(meta, record)
                .into_iter()
                .filter(|c| c.field == ConflictField::FilePath)
                .collect(),
            ChangeSide::StoreOnly | ChangeSide::Neither => Vec::new(),
        };
        Detection {
            changes: Some(changes),
            conflicts,
        }
    }
}

#[cfg(test)]
mod tests {
    use docket_core::enums::TaskStatus;
    use pretty_assertions::assert_eq;

    use super::*;

    fn record(updated_at: DateTime<Utc>) -> Task {
        Task {
            id: "tsk-1".into(),
            feature_id: "fea-1".into(),
            key: "T-E04-F07-001".into(),
            title: "Stored title".into(),
            description: Some("Stored description".into()),
            status: TaskStatus::InProgress,
            priority: 3,
            assigned_agent: Some("backend".into()),
            agent_type: None,
            depends_on: vec![],
            blocked_reason: None,
            file_path: Some("/plan/T-E04-F07-001.md".into()),
            created_at: updated_at,
            started_at: None,
            completed_at: None,
            blocked_at: None,
            updated_at,
        }
    }

    fn meta(modified_at: DateTime<Utc>) -> ParsedMetadata {
        ParsedMetadata {
            key: "T-E04-F07-001".into(),
            title: Some("File title".into()),
            description: Some("Stored description".into()),
            file_path: "/plan/moved/T-E04-F07-001.md".into(),
            modified_at,
        }
    }

    fn detector() -> ConflictDetector {
        ConflictDetector::new(TimeDelta::seconds(60))
    }

    fn fields(conflicts: &[FieldConflict]) -> Vec<ConflictField> {
        conflicts.iter().map(|c| c.field).collect()
    }

    #[test]
    fn basic_reports_title_and_path() {
        let now = Utc::now();
        let conflicts = detector().detect_basic(&meta(now), &record(now));
        assert_eq!(fields(&conflicts), vec![ConflictField::Title, ConflictField::FilePath]);
        assert_eq!(conflicts[0].file_value, "File title");
        assert_eq!(conflicts[0].store_value, "Stored title");
    }

    #[test]
    fn absent_file_values_never_conflict() {
        let now = Utc::now();
        let mut m = meta(now);
        m.title = None;
        m.description = None;
        m.file_path = "/plan/T-E04-F07-001.md".into();
        assert!(detector().detect_basic(&m, &record(now)).is_empty());
    }

    #[test]
    fn description_needs_both_sides() {
        let now = Utc::now();
        let mut r = record(now);
        let mut m = meta(now);
        m.title = None;
        m.file_path = "/plan/T-E04-F07-001.md".into();
        m.description = Some("File description".into());
        assert_eq!(
            fields(&detector().detect_basic(&m, &r)),
            vec![ConflictField::Description]
        );

        r.description = None;
        assert!(detector().detect_basic(&m, &r).is_empty());
    }

    #[test]
    fn missing_store_path_conflicts_with_empty_store_value() {
        let now = Utc::now();
        let mut r = record(now);
        r.file_path = None;
        let conflicts = detector().detect_basic(&meta(now), &r);
        assert_eq!(conflicts[1].field, ConflictField::FilePath);
        assert_eq!(conflicts[1].store_value, "");
    }

    #[test]
    fn identical_records_have_no_conflicts() {
        let now = Utc::now();
        let r = record(now);
        let m = ParsedMetadata {
            key: r.key.clone(),
            title: Some(r.title.clone()),
            description: r.description.clone(),
            file_path: r.file_path.clone().unwrap(),
            modified_at: now,
        };
        assert!(detector().detect_basic(&m, &r).is_empty());
    }

    #[test]
    fn no_last_sync_falls_back_to_basic() {
        let now = Utc::now();
        let detection = detector().detect_with_sync_awareness(&meta(now), &record(now), None);
        assert_eq!(detection.changes, None);
        assert_eq!(detection.conflicts.len(), 2);
    }

    #[test]
    fn both_changed_reports_all_conflicts() {
        let last_sync = Utc::now() - TimeDelta::hours(1);
        let later = last_sync + TimeDelta::minutes(5);
        let detection =
            detector().detect_with_sync_awareness(&meta(later), &record(later), Some(last_sync));
        assert_eq!(detection.changes, Some(ChangeSide::Both));
        assert_eq!(detection.conflicts.len(), 2);
    }

    #[test]
    fn file_only_reports_only_path_conflict() {
        let last_sync = Utc::now() - TimeDelta::hours(1);
        let detection = detector().detect_with_sync_awareness(
            &meta(last_sync + TimeDelta::minutes(5)),
            &record(last_sync - TimeDelta::hours(1)),
            Some(last_sync),
        );
        assert_eq!(detection.changes, Some(ChangeSide::FileOnly));
        assert_eq!(fields(&detection.conflicts), vec![ConflictField::FilePath]);
    }

    #[test]
    fn store_only_and_neither_report_nothing() {
        let last_sync = Utc::now() - TimeDelta::hours(1);
        let old = last_sync - TimeDelta::hours(1);
        let new = last_sync + TimeDelta::minutes(5);

        let store_only =
            detector().detect_with_sync_awareness(&meta(old), &record(new), Some(last_sync));
        assert_eq!(store_only.changes, Some(ChangeSide::StoreOnly));
        assert!(store_only.conflicts.is_empty());

        let neither = detector().detect_with_sync_awareness(&meta(old), &record(old), Some(last_sync));
        assert_eq!(neither.changes, Some(ChangeSide::Neither));
        assert!(neither.conflicts.is_empty());
    }

    #[test]
    fn tolerance_window_counts_as_changed() {
        let last_sync = Utc::now() - TimeDelta::hours(1);
        let inside = last_sync - TimeDelta::seconds(30);
        let outside = last_sync - TimeDelta::seconds(90);
        let d = detector();
        assert_eq!(d.classify(&meta(inside), &record(outside), last_sync), ChangeSide::FileOnly);
        assert_eq!(d.classify(&meta(outside), &record(inside), last_sync), ChangeSide::StoreOnly);
    }
}
