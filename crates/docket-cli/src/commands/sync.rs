use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use docket_config::DocketConfig;
use docket_sync::patterns::PatternRegistry;
use docket_sync::resolver::{ConflictChooser, PromptChooser};
use docket_sync::{DiscoveryOptions, ResolutionStrategy, RunOptions, SyncEngine};

use crate::cli::GlobalFlags;
use crate::cli::root_commands::SyncArgs;
use crate::context::AppContext;
use crate::output::output;

/// Handle `docket sync`.
pub async fn handle(args: &SyncArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let registry = if args.patterns.is_empty() {
        PatternRegistry::from_config(&ctx.config.sync)?
    } else {
        PatternRegistry::with_enabled(&ctx.config.sync, &args.patterns)?
    };

    let mut options = run_options(args, &ctx.config, &ctx.project_root, prompt_chooser);
    options.last_sync = ctx
        .service
        .last_sync_time()
        .await
        .context("failed to read last sync time")?;

    let started = Utc::now();
    match SyncEngine::new(&ctx.service, registry).run(&options).await {
        Ok(report) => {
            if !report.dry_run {
                ctx.service
                    .set_last_sync_time(started)
                    .await
                    .context("failed to record sync time")?;
            }
            output(&report, flags.format)
        }
        Err(failure) => {
            output(failure.report.as_ref(), flags.format)?;
            Err(failure.error).context("sync pass failed; no changes were applied")
        }
    }
}

/// Merge command-line flags over configuration. Flags only ever enable.
fn run_options(
    args: &SyncArgs,
    config: &DocketConfig,
    project_root: &Path,
    chooser: impl FnOnce() -> Arc<dyn ConflictChooser>,
) -> RunOptions {
    let folder = args.folder.as_deref().unwrap_or(&config.sync.docs_root);
    let root = if Path::new(folder).is_absolute() {
        PathBuf::from(folder)
    } else {
        project_root.join(folder)
    };

    let mut options = RunOptions::from_config(root, config);
    options.dry_run = args.dry_run;
    options.force_full_scan = args.force_full_scan;
    options.create_missing |= args.create_missing;
    options.cleanup |= args.cleanup;
    options.strategy =
        ResolutionStrategy::from_kind(args.strategy.unwrap_or(config.sync.strategy), chooser);

    if args.index || options.discovery.is_some() {
        let mut discovery = options
            .discovery
            .take()
            .unwrap_or_else(|| DiscoveryOptions::from_config(&config.discovery));
        if let Some(strategy) = args.discovery_strategy {
            discovery.strategy = strategy;
        }
        if let Some(level) = args.validation_level {
            discovery.validation_level = level;
        }
        options.discovery = Some(discovery);
    }
    options
}

fn prompt_chooser() -> Arc<dyn ConflictChooser> {
    Arc::new(PromptChooser::new(BufReader::new(io::stdin()), io::stderr()))
}
