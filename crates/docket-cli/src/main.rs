use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use docket_config::{DocketConfig, PROJECT_DIR};

mod cli;
mod commands;
mod context;
mod output;
mod ui;
mod write_lock;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("docket error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    init_tracing(cli.quiet, cli.verbose)?;

    let flags = cli.global_flags();
    ui::init(&flags);

    if let cli::Commands::Init(args) = &cli.command {
        return commands::init::handle(args, &flags).await;
    }

    let project_root = resolve_project_root(flags.project.as_deref())?;
    let config = DocketConfig::load_with_dotenv(Some(project_root.as_path()))
        .context("failed to load docket configuration")?;

    let command = cli.command;
    let write_lock = if command_requires_write_lock(&command) {
        Some(write_lock::acquire_for_project(&project_root).await?)
    } else {
        None
    };

    let ctx = context::AppContext::init(project_root, config)
        .await
        .context("failed to initialize docket application context")?;

    let result = commands::dispatch::dispatch(command, &ctx, &flags).await;
    drop(write_lock);
    result
}

fn init_tracing(quiet: bool, verbose: bool) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("DOCKET_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

fn resolve_project_root(project_override: Option<&str>) -> anyhow::Result<PathBuf> {
    if let Some(path) = project_override {
        let explicit = PathBuf::from(path);

        if explicit.file_name().and_then(|name| name.to_str()) == Some(PROJECT_DIR) {
            return explicit
                .parent()
                .map(Path::to_path_buf)
                .context("invalid --project path: '.docket' directory has no parent");
        }

        if explicit.is_dir() {
            return Ok(explicit);
        }

        anyhow::bail!(
            "invalid --project '{}': directory does not exist",
            explicit.display()
        );
    }

    let start = std::env::current_dir().context("failed to read current directory")?;
    context::find_project_root(&start)
        .context("not a docket project (no .docket directory found). Run 'docket init' first.")
}

const fn command_requires_write_lock(command: &cli::Commands) -> bool {
    match command {
        cli::Commands::Sync(args) => !args.dry_run,
        cli::Commands::Init(_) | cli::Commands::Status => false,
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn dry_run_sync_skips_the_write_lock() {
        let cli = cli::Cli::try_parse_from(["docket", "sync", "--dry-run"]).unwrap();
        assert!(!command_requires_write_lock(&cli.command));

        let cli = cli::Cli::try_parse_from(["docket", "sync"]).unwrap();
        assert!(command_requires_write_lock(&cli.command));
    }

    #[test]
    fn project_override_accepts_the_state_dir() {
        let temp = tempfile::tempdir().unwrap();
        let state = temp.path().join(PROJECT_DIR);
        std::fs::create_dir(&state).unwrap();

        let root = resolve_project_root(state.to_str()).unwrap();
        assert_eq!(root, temp.path());
        assert!(resolve_project_root(Some("/no/such/project")).is_err());
    }
}
