//! Persisted sync state (key/value rows).

use chrono::{DateTime, Utc};

use crate::error::DatabaseError;
use crate::helpers::parse_datetime;
use crate::service::DocketService;

const LAST_SYNC_TIME: &str = "last_sync_time";

impl DocketService {
    /// Reference time of the last successful sync pass, if any.
    pub async fn last_sync_time(&self) -> Result<Option<DateTime<Utc>>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query("SELECT value FROM sync_state WHERE key = ?1", [LAST_SYNC_TIME])
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(parse_datetime(&row.get::<String>(0)?)?)),
            None => Ok(None),
        }
    }

    pub async fn set_last_sync_time(&self, at: DateTime<Utc>) -> Result<(), DatabaseError> {
        self.db()
            .conn()
            .execute(
                "INSERT INTO sync_state (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                libsql::params![LAST_SYNC_TIME, at.to_rfc3339(), Utc::now().to_rfc3339()],
            )
            .await?;
        Ok(())
    }
}
