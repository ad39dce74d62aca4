use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{PlanStatus, Priority};

/// Top level of the work hierarchy (`E04`, `tech-debt`).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Epic {
    pub id: String,
    pub key: String,
    pub title: String,
    pub description: Option<String>,
    pub status: PlanStatus,
    pub priority: Priority,
    pub file_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
