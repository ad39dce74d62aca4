use std::path::PathBuf;

use anyhow::Context;
use docket_config::DocketConfig;
use docket_db::service::DocketService;

/// Shared application resources initialized once at startup.
pub struct AppContext {
    pub service: DocketService,
    pub config: DocketConfig,
    pub project_root: PathBuf,
}

impl AppContext {
    /// Open the project store configured by `general.db_path`.
    pub async fn init(project_root: PathBuf, config: DocketConfig) -> anyhow::Result<Self> {
        let db_path = config.db_path(&project_root);
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let service = DocketService::new_local(&db_path.to_string_lossy())
            .await
            .with_context(|| format!("failed to open docket store at {}", db_path.display()))?;
        tracing::debug!(db = %db_path.display(), "store opened");

        Ok(Self {
            service,
            config,
            project_root,
        })
    }
}
