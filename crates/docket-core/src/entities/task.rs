use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::TaskStatus;

/// A unit of work backed by one markdown file.
///
/// `title`, `description`, and `file_path` may be overridden from the file.
/// Every other field is operational state owned by the store.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub feature_id: String,
    pub key: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    /// 1 (highest) to 10 (lowest).
    pub priority: u8,
    pub assigned_agent: Option<String>,
    pub agent_type: Option<String>,
    pub depends_on: Vec<String>,
    pub blocked_reason: Option<String>,
    pub file_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub blocked_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}
