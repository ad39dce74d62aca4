//! Feature repository.

use chrono::Utc;

use docket_core::entities::Feature;
use docket_core::enums::PlanStatus;
use docket_core::ids::PREFIX_FEATURE;

use super::metadata_sets;
use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, parse_datetime, parse_enum};
use crate::service::DocketService;
use crate::updates::plan::PlanUpdate;

const SELECT_COLS: &str =
    "id, epic_id, key, title, description, status, file_path, created_at, updated_at";

fn row_to_feature(row: &libsql::Row) -> Result<Feature, DatabaseError> {
    Ok(Feature {
        id: row.get(0)?,
        epic_id: row.get(1)?,
        key: row.get(2)?,
        title: row.get(3)?,
        description: get_opt_string(row, 4)?,
        status: parse_enum(&row.get::<String>(5)?)?,
        file_path: get_opt_string(row, 6)?,
        created_at: parse_datetime(&row.get::<String>(7)?)?,
        updated_at: parse_datetime(&row.get::<String>(8)?)?,
    })
}

impl DocketService {
    /// Create an active feature under the epic with id `epic_id`.
    pub async fn create_feature(
        &self,
        epic_id: &str,
        key: &str,
        title: &str,
        description: Option<&str>,
        file_path: Option<&str>,
    ) -> Result<Feature, DatabaseError> {
        let now = Utc::now();
        let id = self.db().generate_id(PREFIX_FEATURE).await?;

        self.db()
            .conn()
            .execute(
                &format!(
                    "INSERT INTO features ({SELECT_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
                ),
                libsql::params![
                    id.as_str(),
                    epic_id,
                    key,
                    title,
                    description,
                    PlanStatus::Active.as_str(),
                    file_path,
                    now.to_rfc3339(),
                    now.to_rfc3339()
                ],
            )
            .await?;

        tracing::debug!(key, id = %id, "created feature");

        Ok(Feature {
            id,
            epic_id: epic_id.to_string(),
            key: key.to_string(),
            title: title.to_string(),
            description: description.map(String::from),
            status: PlanStatus::Active,
            file_path: file_path.map(String::from),
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn find_feature_by_key(&self, key: &str) -> Result<Option<Feature>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM features WHERE key = ?1"),
                [key],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_feature(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn get_feature_by_key(&self, key: &str) -> Result<Feature, DatabaseError> {
        self.find_feature_by_key(key)
            .await?
            .ok_or_else(|| DatabaseError::not_found("feature", key))
    }

    pub async fn update_feature(
        &self,
        key: &str,
        update: &PlanUpdate,
    ) -> Result<Feature, DatabaseError> {
        let (mut sets, mut params, mut idx) = metadata_sets(
            update.title.as_ref(),
            update.description.as_ref(),
            update.file_path.as_ref(),
        );

        if sets.is_empty() {
            return self.get_feature_by_key(key).await;
        }

        sets.push(format!("updated_at = ?{idx}"));
        params.push(Utc::now().to_rfc3339().into());
        idx += 1;

        params.push(key.into());
        let sql = format!("UPDATE features SET {} WHERE key = ?{idx}", sets.join(", "));
        let changed = self
            .db()
            .conn()
            .execute(&sql, libsql::params_from_iter(params))
            .await?;
        if changed == 0 {
            return Err(DatabaseError::not_found("feature", key));
        }

        self.get_feature_by_key(key).await
    }

    pub async fn list_features(&self) -> Result<Vec<Feature>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(&format!("SELECT {SELECT_COLS} FROM features ORDER BY key"), ())
            .await?;
        let mut features = Vec::new();
        while let Some(row) = rows.next().await? {
            features.push(row_to_feature(&row)?);
        }
        Ok(features)
    }
}
