use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::TaskStatus;

/// Append-only audit row recorded whenever a task is imported or changed.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct TaskHistory {
    pub id: String,
    pub task_id: String,
    pub old_status: Option<TaskStatus>,
    pub new_status: Option<TaskStatus>,
    pub agent: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
