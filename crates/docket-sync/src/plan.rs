//! Planned store writes for one sync pass.
//!
//! Every decision is made while planning; [`Plan::apply`] only executes the
//! writes, all inside one transaction. A dry run plans and never applies.

use std::collections::{HashMap, HashSet};

use docket_core::enums::TaskStatus;
use docket_db::error::DatabaseError;
use docket_db::service::DocketService;
use docket_db::updates::plan::PlanUpdate;
use docket_db::updates::task::TaskUpdate;

use crate::error::SyncError;

/// Priority given to imported tasks.
pub(crate) const IMPORT_PRIORITY: u8 = 5;

/// Title used when a file yields none.
pub(crate) const UNTITLED_TASK: &str = "Untitled Task";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Write {
    CreateEpic {
        key: String,
        title: String,
        description: Option<String>,
        file_path: Option<String>,
    },
    UpdateEpic {
        key: String,
        update: PlanUpdate,
    },
    CreateFeature {
        epic_key: String,
        key: String,
        title: String,
        description: Option<String>,
        file_path: Option<String>,
    },
    UpdateFeature {
        key: String,
        update: PlanUpdate,
    },
    ImportTask {
        feature_key: String,
        key: String,
        title: String,
        description: Option<String>,
        file_path: String,
    },
    UpdateTask {
        key: String,
        update: TaskUpdate,
        note: String,
    },
    DeleteTask {
        key: String,
    },
}

#[derive(Debug, Default)]
pub(crate) struct Plan {
    writes: Vec<Write>,
    epics: HashSet<String>,
    features: HashSet<String>,
}

impl Plan {
    pub(crate) fn push(&mut self, write: Write) {
        match &write {
            Write::CreateEpic { key, .. } => {
                self.epics.insert(key.clone());
            }
            Write::CreateFeature { key, .. } => {
                self.features.insert(key.clone());
            }
            _ => {}
        }
        self.writes.push(write);
    }

    /// Whether applying the plan leaves epic `key` in place (created or touched).
    pub(crate) fn has_epic(&self, key: &str) -> bool {
        self.epics.contains(key)
    }

    pub(crate) fn has_feature(&self, key: &str) -> bool {
        self.features.contains(key)
    }

    /// Note an existing epic confirmed during planning.
    pub(crate) fn confirm_epic(&mut self, key: &str) {
        self.epics.insert(key.to_string());
    }

    pub(crate) fn confirm_feature(&mut self, key: &str) {
        self.features.insert(key.to_string());
    }

    #[cfg(test)]
    pub(crate) fn writes(&self) -> &[Write] {
        &self.writes
    }

    /// Execute every write in one transaction; roll back on the first failure.
    pub(crate) async fn apply(&self, service: &DocketService, agent: &str) -> Result<(), SyncError> {
        if self.writes.is_empty() {
            return Ok(());
        }

        let tx = service.begin_transaction().await?;
        match self.execute(service, agent).await {
            Ok(()) => {
                tx.commit().await.map_err(DatabaseError::from)?;
                tracing::info!(writes = self.writes.len(), "sync transaction committed");
                Ok(())
            }
            Err(error) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::error!(error = %rollback, "rollback failed");
                }
                tracing::warn!(%error, "sync transaction rolled back");
                Err(error)
            }
        }
    }

    async fn execute(&self, service: &DocketService, agent: &str) -> Result<(), SyncError> {
        let mut epic_ids: HashMap<&str, String> = HashMap::new();
        let mut feature_ids: HashMap<&str, String> = HashMap::new();

        for write in &self.writes {
            match write {
                Write::CreateEpic {
                    key,
                    title,
                    description,
                    file_path,
                } => {
                    let epic = service
                        .create_epic(key, title, description.as_deref(), file_path.as_deref())
                        .await?;
                    epic_ids.insert(key, epic.id);
                }
                Write::UpdateEpic { key, update } => {
                    service.update_epic(key, update).await?;
                }
                Write::CreateFeature {
                    epic_key,
                    key,
                    title,
                    description,
                    file_path,
                } => {
                    let epic_id = match epic_ids.get(epic_key.as_str()) {
                        Some(id) => id.clone(),
                        None => service.get_epic_by_key(epic_key).await?.id,
                    };
                    let feature = service
                        .create_feature(
                            &epic_id,
                            key,
                            title,
                            description.as_deref(),
                            file_path.as_deref(),
                        )
                        .await?;
                    feature_ids.insert(key, feature.id);
                }
                Write::UpdateFeature { key, update } => {
                    service.update_feature(key, update).await?;
                }
                Write::ImportTask {
                    feature_key,
                    key,
                    title,
                    description,
                    file_path,
                } => {
                    let feature_id = match feature_ids.get(feature_key.as_str()) {
                        Some(id) => id.clone(),
                        None => {
                            let id = service.get_feature_by_key(feature_key).await?.id;
                            feature_ids.insert(feature_key, id.clone());
                            id
                        }
                    };
                    let task = service
                        .create_task(
                            &feature_id,
                            key,
                            title,
                            description.as_deref(),
                            Some(file_path.as_str()),
                            IMPORT_PRIORITY,
                        )
                        .await?;
                    service
                        .record_task_history(
                            &task.id,
                            None,
                            Some(TaskStatus::Todo),
                            Some(agent),
                            Some("Imported from file"),
                        )
                        .await?;
                }
                Write::UpdateTask { key, update, note } => {
                    let task = service.update_task(key, update).await?;
                    service
                        .record_task_history(&task.id, None, None, Some(agent), Some(note.as_str()))
                        .await?;
                }
                Write::DeleteTask { key } => {
                    service.delete_task(key).await?;
                }
            }
        }
        Ok(())
    }
}
