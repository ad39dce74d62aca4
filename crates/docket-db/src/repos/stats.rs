//! Row counts for status output.

use serde::Serialize;

use crate::error::DatabaseError;
use crate::service::DocketService;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub epics: u64,
    pub features: u64,
    pub tasks: u64,
    pub tasks_with_files: u64,
}

impl DocketService {
    pub async fn store_counts(&self) -> Result<StoreCounts, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT
                    (SELECT COUNT(*) FROM epics),
                    (SELECT COUNT(*) FROM features),
                    (SELECT COUNT(*) FROM tasks),
                    (SELECT COUNT(*) FROM tasks WHERE file_path IS NOT NULL AND file_path != '')",
                (),
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(StoreCounts {
            epics: row.get(0)?,
            features: row.get(1)?,
            tasks: row.get(2)?,
            tasks_with_files: row.get(3)?,
        })
    }
}
