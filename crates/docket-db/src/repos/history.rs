//! Task history repository (append-only).

use chrono::Utc;

use docket_core::entities::TaskHistory;
use docket_core::enums::TaskStatus;
use docket_core::ids::PREFIX_HISTORY;

use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, parse_datetime, parse_enum};
use crate::service::DocketService;

const SELECT_COLS: &str = "id, task_id, old_status, new_status, agent, notes, created_at";

fn row_to_history(row: &libsql::Row) -> Result<TaskHistory, DatabaseError> {
    let old_status = get_opt_string(row, 2)?;
    let new_status = get_opt_string(row, 3)?;
    Ok(TaskHistory {
        id: row.get(0)?,
        task_id: row.get(1)?,
        old_status: old_status.as_deref().map(parse_enum).transpose()?,
        new_status: new_status.as_deref().map(parse_enum).transpose()?,
        agent: get_opt_string(row, 4)?,
        notes: get_opt_string(row, 5)?,
        created_at: parse_datetime(&row.get::<String>(6)?)?,
    })
}

impl DocketService {
    pub async fn record_task_history(
        &self,
        task_id: &str,
        old_status: Option<TaskStatus>,
        new_status: Option<TaskStatus>,
        agent: Option<&str>,
        notes: Option<&str>,
    ) -> Result<TaskHistory, DatabaseError> {
        let now = Utc::now();
        let id = self.db().generate_id(PREFIX_HISTORY).await?;

        self.db()
            .conn()
            .execute(
                &format!("INSERT INTO task_history ({SELECT_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
                libsql::params![
                    id.as_str(),
                    task_id,
                    old_status.map(TaskStatus::as_str),
                    new_status.map(TaskStatus::as_str),
                    agent,
                    notes,
                    now.to_rfc3339()
                ],
            )
            .await?;

        Ok(TaskHistory {
            id,
            task_id: task_id.to_string(),
            old_status,
            new_status,
            agent: agent.map(String::from),
            notes: notes.map(String::from),
            created_at: now,
        })
    }

    /// History rows for a task, oldest first.
    pub async fn list_task_history(&self, task_id: &str) -> Result<Vec<TaskHistory>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM task_history WHERE task_id = ?1 ORDER BY created_at, rowid"
                ),
                [task_id],
            )
            .await?;
        let mut history = Vec::new();
        while let Some(row) = rows.next().await? {
            history.push(row_to_history(&row)?);
        }
        Ok(history)
    }
}
