//! Task repository: CRUD plus the batch lookups a sync pass needs.

use std::collections::{HashMap, HashSet};

use chrono::Utc;

use docket_core::entities::Task;
use docket_core::enums::TaskStatus;
use docket_core::ids::PREFIX_TASK;
use docket_core::keys::TaskKey;

use super::metadata_sets;
use crate::error::DatabaseError;
use crate::helpers::{
    get_opt_string, parse_datetime, parse_enum, parse_optional_datetime, parse_string_list,
};
use crate::service::DocketService;
use crate::updates::task::TaskUpdate;

const SELECT_COLS: &str = "id, feature_id, key, title, description, status, priority, \
     assigned_agent, agent_type, depends_on, blocked_reason, file_path, \
     created_at, started_at, completed_at, blocked_at, updated_at";

/// Bound on `IN (...)` parameters per statement.
const KEY_BATCH: usize = 500;

fn row_to_task(row: &libsql::Row) -> Result<Task, DatabaseError> {
    let priority = row.get::<i64>(6)?;
    Ok(Task {
        id: row.get(0)?,
        feature_id: row.get(1)?,
        key: row.get(2)?,
        title: row.get(3)?,
        description: get_opt_string(row, 4)?,
        status: parse_enum(&row.get::<String>(5)?)?,
        priority: u8::try_from(priority)
            .map_err(|_| DatabaseError::InvalidState(format!("task priority {priority} out of range")))?,
        assigned_agent: get_opt_string(row, 7)?,
        agent_type: get_opt_string(row, 8)?,
        depends_on: parse_string_list(&row.get::<String>(9)?)?,
        blocked_reason: get_opt_string(row, 10)?,
        file_path: get_opt_string(row, 11)?,
        created_at: parse_datetime(&row.get::<String>(12)?)?,
        started_at: parse_optional_datetime(get_opt_string(row, 13)?.as_deref())?,
        completed_at: parse_optional_datetime(get_opt_string(row, 14)?.as_deref())?,
        blocked_at: parse_optional_datetime(get_opt_string(row, 15)?.as_deref())?,
        updated_at: parse_datetime(&row.get::<String>(16)?)?,
    })
}

impl DocketService {
    /// Create a `todo` task under the feature with id `feature_id`.
    pub async fn create_task(
        &self,
        feature_id: &str,
        key: &str,
        title: &str,
        description: Option<&str>,
        file_path: Option<&str>,
        priority: u8,
    ) -> Result<Task, DatabaseError> {
        let now = Utc::now();
        let id = self.db().generate_id(PREFIX_TASK).await?;

        self.db()
            .conn()
            .execute(
                "INSERT INTO tasks (id, feature_id, key, title, description, status, priority,
                                    depends_on, file_path, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, '[]', ?8, ?9, ?10)",
                libsql::params![
                    id.as_str(),
                    feature_id,
                    key,
                    title,
                    description,
                    TaskStatus::Todo.as_str(),
                    i64::from(priority),
                    file_path,
                    now.to_rfc3339(),
                    now.to_rfc3339()
                ],
            )
            .await?;

        Ok(Task {
            id,
            feature_id: feature_id.to_string(),
            key: key.to_string(),
            title: title.to_string(),
            description: description.map(String::from),
            status: TaskStatus::Todo,
            priority,
            assigned_agent: None,
            agent_type: None,
            depends_on: Vec::new(),
            blocked_reason: None,
            file_path: file_path.map(String::from),
            created_at: now,
            started_at: None,
            completed_at: None,
            blocked_at: None,
            updated_at: now,
        })
    }

    pub async fn find_task_by_key(&self, key: &str) -> Result<Option<Task>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(&format!("SELECT {SELECT_COLS} FROM tasks WHERE key = ?1"), [key])
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_task(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn get_task_by_key(&self, key: &str) -> Result<Task, DatabaseError> {
        self.find_task_by_key(key)
            .await?
            .ok_or_else(|| DatabaseError::not_found("task", key))
    }

    /// Fetch every task whose key is in `keys`, keyed by task key.
    ///
    /// Keys without a stored task are simply absent from the map.
    pub async fn get_tasks_by_keys(
        &self,
        keys: &[String],
    ) -> Result<HashMap<String, Task>, DatabaseError> {
        let mut found = HashMap::with_capacity(keys.len());
        for chunk in keys.chunks(KEY_BATCH) {
            let placeholders = (1..=chunk.len())
                .map(|i| format!("?{i}"))
                .collect::<Vec<_>>()
                .join(", ");
            let mut rows = self
                .db()
                .conn()
                .query(
                    &format!("SELECT {SELECT_COLS} FROM tasks WHERE key IN ({placeholders})"),
                    libsql::params_from_iter(chunk.iter().cloned()),
                )
                .await?;
            while let Some(row) = rows.next().await? {
                let task = row_to_task(&row)?;
                found.insert(task.key.clone(), task);
            }
        }
        Ok(found)
    }

    /// Every non-empty `file_path` recorded on a task.
    pub async fn list_task_file_paths(&self) -> Result<HashSet<String>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT file_path FROM tasks WHERE file_path IS NOT NULL AND file_path != ''",
                (),
            )
            .await?;
        let mut paths = HashSet::new();
        while let Some(row) = rows.next().await? {
            paths.insert(row.get::<String>(0)?);
        }
        Ok(paths)
    }

    /// Tasks that have a recorded file path, ordered by key.
    pub async fn list_tasks_with_files(&self) -> Result<Vec<Task>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM tasks
                     WHERE file_path IS NOT NULL AND file_path != '' ORDER BY key"
                ),
                (),
            )
            .await?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next().await? {
            tasks.push(row_to_task(&row)?);
        }
        Ok(tasks)
    }

    /// Highest task sequence number stored under `feature_key` (0 when none).
    pub async fn max_task_sequence(&self, feature_key: &str) -> Result<u32, DatabaseError> {
        let prefix = format!("T-{feature_key}-");
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT key FROM tasks WHERE substr(key, 1, length(?1)) = ?1",
                [prefix.as_str()],
            )
            .await?;
        let mut max = 0;
        while let Some(row) = rows.next().await? {
            let key = row.get::<String>(0)?;
            if let Ok(parsed) = TaskKey::parse(&key)
                && parsed.feature_key() == feature_key
            {
                max = max.max(parsed.sequence);
            }
        }
        Ok(max)
    }

    pub async fn update_task(&self, key: &str, update: &TaskUpdate) -> Result<Task, DatabaseError> {
        let (mut sets, mut params, mut idx) = metadata_sets(
            update.title.as_ref(),
            update.description.as_ref(),
            update.file_path.as_ref(),
        );

        if sets.is_empty() {
            return self.get_task_by_key(key).await;
        }

        sets.push(format!("updated_at = ?{idx}"));
        params.push(Utc::now().to_rfc3339().into());
        idx += 1;

        params.push(key.into());
        let sql = format!("UPDATE tasks SET {} WHERE key = ?{idx}", sets.join(", "));
        let changed = self
            .db()
            .conn()
            .execute(&sql, libsql::params_from_iter(params))
            .await?;
        if changed == 0 {
            return Err(DatabaseError::not_found("task", key));
        }

        self.get_task_by_key(key).await
    }

    pub async fn delete_task(&self, key: &str) -> Result<(), DatabaseError> {
        let changed = self
            .db()
            .conn()
            .execute("DELETE FROM tasks WHERE key = ?1", [key])
            .await?;
        if changed == 0 {
            return Err(DatabaseError::not_found("task", key));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_support::helpers::{seed_feature, test_service};
    use crate::updates::task::TaskUpdateBuilder;

    #[tokio::test]
    async fn create_task_roundtrip() {
        let svc = test_service().await;
        let feature_id = seed_feature(&svc, "E04", "E04-F07").await;

        let task = svc
            .create_task(
                &feature_id,
                "T-E04-F07-001",
                "Implement filter",
                Some("Skip unchanged files"),
                Some("/docs/T-E04-F07-001.md"),
                5,
            )
            .await
            .unwrap();

        assert!(task.id.starts_with("tsk-"));
        assert_eq!(task.status, TaskStatus::Todo);

        let fetched = svc.get_task_by_key("T-E04-F07-001").await.unwrap();
        assert_eq!(fetched, task);
    }

    #[tokio::test]
    async fn get_tasks_by_keys_returns_only_stored() {
        let svc = test_service().await;
        let feature_id = seed_feature(&svc, "E01", "E01-F01").await;
        svc.create_task(&feature_id, "T-E01-F01-001", "A", None, None, 5)
            .await
            .unwrap();
        svc.create_task(&feature_id, "T-E01-F01-002", "B", None, None, 5)
            .await
            .unwrap();

        let keys = vec![
            "T-E01-F01-001".to_string(),
            "T-E01-F01-002".to_string(),
            "T-E01-F01-003".to_string(),
        ];
        let found = svc.get_tasks_by_keys(&keys).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found["T-E01-F01-002"].title, "B");
        assert!(!found.contains_key("T-E01-F01-003"));
    }

    #[tokio::test]
    async fn get_tasks_by_keys_handles_empty_input() {
        let svc = test_service().await;
        assert!(svc.get_tasks_by_keys(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_task_file_paths_skips_null_paths() {
        let svc = test_service().await;
        let feature_id = seed_feature(&svc, "E01", "E01-F01").await;
        svc.create_task(&feature_id, "T-E01-F01-001", "A", None, Some("/a.md"), 5)
            .await
            .unwrap();
        svc.create_task(&feature_id, "T-E01-F01-002", "B", None, None, 5)
            .await
            .unwrap();

        let paths = svc.list_task_file_paths().await.unwrap();
        assert_eq!(paths, HashSet::from(["/a.md".to_string()]));
        assert_eq!(svc.list_tasks_with_files().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn max_task_sequence_is_scoped_to_feature() {
        let svc = test_service().await;
        let f1 = seed_feature(&svc, "E01", "E01-F01").await;
        let f2 = seed_feature(&svc, "E01", "E01-F02").await;
        svc.create_task(&f1, "T-E01-F01-003", "A", None, None, 5).await.unwrap();
        svc.create_task(&f1, "T-E01-F01-011", "B", None, None, 5).await.unwrap();
        svc.create_task(&f2, "T-E01-F02-050", "C", None, None, 5).await.unwrap();

        assert_eq!(svc.max_task_sequence("E01-F01").await.unwrap(), 11);
        assert_eq!(svc.max_task_sequence("E01-F02").await.unwrap(), 50);
        assert_eq!(svc.max_task_sequence("E01-F03").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn update_task_leaves_operational_fields() {
        let svc = test_service().await;
        let feature_id = seed_feature(&svc, "E01", "E01-F01").await;
        let task = svc
            .create_task(&feature_id, "T-E01-F01-001", "Old", None, None, 2)
            .await
            .unwrap();

        let update = TaskUpdateBuilder::new()
            .title("New")
            .file_path(Some("/new.md".into()))
            .build();
        let updated = svc.update_task("T-E01-F01-001", &update).await.unwrap();

        assert_eq!(updated.title, "New");
        assert_eq!(updated.file_path.as_deref(), Some("/new.md"));
        assert_eq!(updated.priority, 2);
        assert_eq!(updated.status, task.status);
        assert!(updated.updated_at >= task.updated_at);
    }

    #[tokio::test]
    async fn delete_task_removes_row() {
        let svc = test_service().await;
        let feature_id = seed_feature(&svc, "E01", "E01-F01").await;
        svc.create_task(&feature_id, "T-E01-F01-001", "Doomed", None, None, 5)
            .await
            .unwrap();

        svc.delete_task("T-E01-F01-001").await.unwrap();
        assert!(svc.find_task_by_key("T-E01-F01-001").await.unwrap().is_none());
        assert!(matches!(
            svc.delete_task("T-E01-F01-001").await,
            Err(DatabaseError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn rolled_back_transaction_discards_writes() {
        let svc = test_service().await;
        let feature_id = seed_feature(&svc, "E01", "E01-F01").await;

        let tx = svc.begin_transaction().await.unwrap();
        svc.create_task(&feature_id, "T-E01-F01-001", "Temp", None, None, 5)
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        assert!(svc.find_task_by_key("T-E01-F01-001").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn committed_transaction_keeps_writes() {
        let svc = test_service().await;
        let feature_id = seed_feature(&svc, "E01", "E01-F01").await;

        let tx = svc.begin_transaction().await.unwrap();
        svc.create_task(&feature_id, "T-E01-F01-001", "Kept", None, None, 5)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert!(svc.find_task_by_key("T-E01-F01-001").await.unwrap().is_some());
    }
}
