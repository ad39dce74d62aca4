use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context;
use docket_config::{DocketConfig, PROJECT_DIR};
use docket_db::service::DocketService;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::InitArgs;
use crate::output::output;

#[derive(Debug, Serialize)]
pub struct InitOutcome {
    pub project_root: PathBuf,
    pub config_path: PathBuf,
    pub db_path: PathBuf,
    pub config_written: bool,
}

impl fmt::Display for InitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Initialized docket in {}", self.project_root.display())?;
        if self.config_written {
            writeln!(f, "  config: {}", self.config_path.display())?;
        } else {
            writeln!(f, "  config: {} (kept existing)", self.config_path.display())?;
        }
        write!(f, "  store:  {}", self.db_path.display())
    }
}

/// Handle `docket init`.
pub async fn handle(args: &InitArgs, flags: &GlobalFlags) -> anyhow::Result<()> {
    let outcome = initialize(Path::new(&args.path), args.docs_root.as_deref(), args.force).await?;
    output(&outcome, flags.format)
}

/// Create `.docket/`, its config file and the store under `root`.
pub async fn initialize(
    root: &Path,
    docs_root: Option<&str>,
    force: bool,
) -> anyhow::Result<InitOutcome> {
    let project_root = root
        .canonicalize()
        .with_context(|| format!("cannot initialize missing directory {}", root.display()))?;
    let state_dir = project_root.join(PROJECT_DIR);
    std::fs::create_dir_all(&state_dir)
        .with_context(|| format!("failed to create {}", state_dir.display()))?;

    let config_path = DocketConfig::project_config_path(&project_root);
    let config_written = force || !config_path.exists();
    let config = if config_written {
        let mut config = DocketConfig::default();
        if let Some(docs_root) = docs_root {
            config.sync.docs_root = docs_root.to_string();
        }
        let rendered = toml::to_string_pretty(&config).context("failed to render config")?;
        std::fs::write(&config_path, rendered)
            .with_context(|| format!("failed to write {}", config_path.display()))?;
        config
    } else {
        DocketConfig::load(Some(project_root.as_path())).context("existing config is invalid")?
    };

    let db_path = config.db_path(&project_root);
    DocketService::new_local(&db_path.to_string_lossy())
        .await
        .with_context(|| format!("failed to create store at {}", db_path.display()))?;
    tracing::info!(root = %project_root.display(), "project initialized");

    Ok(InitOutcome {
        project_root,
        config_path,
        db_path,
        config_written,
    })
}

#[cfg(test)]
mod tests {
    use super::initialize;

    #[tokio::test]
    async fn creates_state_dir_config_and_store() {
        let temp = tempfile::tempdir().expect("tempdir should create");

        let outcome = initialize(temp.path(), Some("planning"), false)
            .await
            .expect("init should succeed");

        assert!(outcome.config_written);
        assert!(outcome.db_path.is_file());
        let written = std::fs::read_to_string(&outcome.config_path).unwrap();
        assert!(written.contains("docs_root = \"planning\""));
        assert!(outcome.to_string().starts_with("Initialized docket in"));
    }

    #[tokio::test]
    async fn keeps_existing_config_without_force() {
        let temp = tempfile::tempdir().expect("tempdir should create");
        initialize(temp.path(), Some("first"), false).await.unwrap();

        let again = initialize(temp.path(), Some("second"), false).await.unwrap();
        assert!(!again.config_written);
        let written = std::fs::read_to_string(&again.config_path).unwrap();
        assert!(written.contains("\"first\""));

        let forced = initialize(temp.path(), Some("second"), true).await.unwrap();
        assert!(forced.config_written);
    }
}
