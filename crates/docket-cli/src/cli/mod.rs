use clap::Parser;

pub mod global;
pub mod root_commands;

pub use global::{ColorMode, GlobalFlags, OutputFormat};
pub use root_commands::Commands;

/// Top-level CLI parser for the `docket` binary.
#[derive(Debug, Parser)]
#[command(name = "docket", version, about = "Docket - sync markdown work items into a task store")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: json, table, text, raw
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Table coloring: auto, always, never
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorMode,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project root path (defaults to auto-detect via .docket)
    #[arg(short, long, global = true)]
    pub project: Option<String>,
}

impl Cli {
    /// Extract ergonomic global flags struct for command handlers.
    #[must_use]
    pub fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            format: self.format,
            color: self.color,
            quiet: self.quiet,
            verbose: self.verbose,
            project: self.project.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};
    use docket_core::enums::{ConflictStrategyKind, DiscoveryStrategy, ValidationLevel};

    use super::{Cli, Commands, GlobalFlags, OutputFormat};

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_before_subcommand() {
        let cli = Cli::try_parse_from(["docket", "--format", "table", "--verbose", "status"])
            .expect("cli should parse");

        assert_eq!(cli.format, OutputFormat::Table);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["docket", "status", "--format", "raw", "--quiet"])
            .expect("cli should parse");

        assert_eq!(cli.format, OutputFormat::Raw);
        assert!(cli.quiet);
    }

    #[test]
    fn output_format_defaults_to_text() {
        let cli = Cli::try_parse_from(["docket", "status"]).expect("cli should parse");
        assert_eq!(cli.format, OutputFormat::Text);
    }

    #[test]
    fn output_format_rejects_invalid_value() {
        let parsed = Cli::try_parse_from(["docket", "--format", "xml", "status"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn sync_flags_parse() {
        let cli = Cli::try_parse_from([
            "docket",
            "sync",
            "--folder",
            "plan",
            "--dry-run",
            "--strategy",
            "database-wins",
            "--create-missing",
            "--cleanup",
            "--pattern",
            "task",
            "--pattern",
            "prp",
            "--force-full-scan",
            "--index",
            "--discovery-strategy",
            "folder-only",
            "--validation-level",
            "permissive",
        ])
        .expect("cli should parse");

        let Commands::Sync(args) = cli.command else {
            panic!("expected sync command");
        };
        assert_eq!(args.folder.as_deref(), Some("plan"));
        assert!(args.dry_run);
        assert_eq!(args.strategy, Some(ConflictStrategyKind::StoreWins));
        assert!(args.create_missing);
        assert!(args.cleanup);
        assert_eq!(args.patterns, vec!["task", "prp"]);
        assert!(args.force_full_scan);
        assert!(args.index);
        assert_eq!(args.discovery_strategy, Some(DiscoveryStrategy::FolderOnly));
        assert_eq!(args.validation_level, Some(ValidationLevel::Permissive));
    }

    #[test]
    fn sync_rejects_unknown_strategy() {
        let parsed = Cli::try_parse_from(["docket", "sync", "--strategy", "coin-flip"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn global_flags_extraction_copies_values() {
        let cli = Cli::try_parse_from(["docket", "--project", "/tmp/demo", "status"])
            .expect("cli should parse");
        let flags: GlobalFlags = cli.global_flags();
        assert_eq!(flags.project.as_deref(), Some("/tmp/demo"));
    }
}
