//! Epic repository.

use chrono::Utc;

use docket_core::entities::Epic;
use docket_core::enums::{PlanStatus, Priority};
use docket_core::ids::PREFIX_EPIC;

use super::metadata_sets;
use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, parse_datetime, parse_enum};
use crate::service::DocketService;
use crate::updates::plan::PlanUpdate;

const SELECT_COLS: &str =
    "id, key, title, description, status, priority, file_path, created_at, updated_at";

fn row_to_epic(row: &libsql::Row) -> Result<Epic, DatabaseError> {
    Ok(Epic {
        id: row.get(0)?,
        key: row.get(1)?,
        title: row.get(2)?,
        description: get_opt_string(row, 3)?,
        status: parse_enum(&row.get::<String>(4)?)?,
        priority: parse_enum(&row.get::<String>(5)?)?,
        file_path: get_opt_string(row, 6)?,
        created_at: parse_datetime(&row.get::<String>(7)?)?,
        updated_at: parse_datetime(&row.get::<String>(8)?)?,
    })
}

impl DocketService {
    /// Create an active, medium-priority epic.
    pub async fn create_epic(
        &self,
        key: &str,
        title: &str,
        description: Option<&str>,
        file_path: Option<&str>,
    ) -> Result<Epic, DatabaseError> {
        let now = Utc::now();
        let id = self.db().generate_id(PREFIX_EPIC).await?;

        self.db()
            .conn()
            .execute(
                &format!("INSERT INTO epics ({SELECT_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
                libsql::params![
                    id.as_str(),
                    key,
                    title,
                    description,
                    PlanStatus::Active.as_str(),
                    Priority::Medium.as_str(),
                    file_path,
                    now.to_rfc3339(),
                    now.to_rfc3339()
                ],
            )
            .await?;

        tracing::debug!(key, id = %id, "created epic");

        Ok(Epic {
            id,
            key: key.to_string(),
            title: title.to_string(),
            description: description.map(String::from),
            status: PlanStatus::Active,
            priority: Priority::Medium,
            file_path: file_path.map(String::from),
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn find_epic_by_key(&self, key: &str) -> Result<Option<Epic>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(&format!("SELECT {SELECT_COLS} FROM epics WHERE key = ?1"), [key])
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_epic(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn get_epic_by_key(&self, key: &str) -> Result<Epic, DatabaseError> {
        self.find_epic_by_key(key)
            .await?
            .ok_or_else(|| DatabaseError::not_found("epic", key))
    }

    pub async fn update_epic(&self, key: &str, update: &PlanUpdate) -> Result<Epic, DatabaseError> {
        let (mut sets, mut params, mut idx) = metadata_sets(
            update.title.as_ref(),
            update.description.as_ref(),
            update.file_path.as_ref(),
        );

        if sets.is_empty() {
            return self.get_epic_by_key(key).await;
        }

        sets.push(format!("updated_at = ?{idx}"));
        params.push(Utc::now().to_rfc3339().into());
        idx += 1;

        params.push(key.into());
        let sql = format!("UPDATE epics SET {} WHERE key = ?{idx}", sets.join(", "));
        let changed = self
            .db()
            .conn()
            .execute(&sql, libsql::params_from_iter(params))
            .await?;
        if changed == 0 {
            return Err(DatabaseError::not_found("epic", key));
        }

        self.get_epic_by_key(key).await
    }

    pub async fn list_epics(&self) -> Result<Vec<Epic>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(&format!("SELECT {SELECT_COLS} FROM epics ORDER BY key"), ())
            .await?;
        let mut epics = Vec::new();
        while let Some(row) = rows.next().await? {
            epics.push(row_to_epic(&row)?);
        }
        Ok(epics)
    }
}
