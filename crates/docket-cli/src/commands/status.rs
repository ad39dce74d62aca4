use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use docket_db::repos::stats::StoreCounts;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
pub struct StatusView {
    pub project_root: PathBuf,
    pub docs_root: String,
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub counts: StoreCounts,
}

impl fmt::Display for StatusView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Project:   {}", self.project_root.display())?;
        writeln!(f, "Docs root: {}", self.docs_root)?;
        match self.last_sync {
            Some(at) => writeln!(f, "Last sync: {}", at.to_rfc3339())?,
            None => writeln!(f, "Last sync: never")?,
        }
        writeln!(f, "Epics:     {}", self.counts.epics)?;
        writeln!(f, "Features:  {}", self.counts.features)?;
        write!(
            f,
            "Tasks:     {} ({} linked to files)",
            self.counts.tasks, self.counts.tasks_with_files
        )
    }
}

/// Handle `docket status`.
pub async fn handle(ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    output(&collect(ctx).await?, flags.format)
}

async fn collect(ctx: &AppContext) -> anyhow::Result<StatusView> {
    Ok(StatusView {
        project_root: ctx.project_root.clone(),
        docs_root: ctx.config.sync.docs_root.clone(),
        last_sync: ctx.service.last_sync_time().await?,
        counts: ctx.service.store_counts().await?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use docket_config::DocketConfig;
    use docket_db::service::DocketService;

    use super::*;

    #[tokio::test]
    async fn reports_never_synced_store() {
        let ctx = AppContext {
            service: DocketService::new_local(":memory:").await.unwrap(),
            config: DocketConfig::default(),
            project_root: PathBuf::from("/work/demo"),
        };

        let view = collect(&ctx).await.unwrap();
        assert_eq!(view.last_sync, None);
        assert_eq!(view.counts, StoreCounts::default());
        assert!(view.to_string().contains("Last sync: never"));
    }

    #[tokio::test]
    async fn reports_last_sync_time() {
        let ctx = AppContext {
            service: DocketService::new_local(":memory:").await.unwrap(),
            config: DocketConfig::default(),
            project_root: PathBuf::from("/work/demo"),
        };
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        ctx.service.set_last_sync_time(at).await.unwrap();

        let view = collect(&ctx).await.unwrap();
        assert_eq!(view.last_sync, Some(at));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["tasks"], 0);
    }
}
