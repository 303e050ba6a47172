//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use dr_core::ReportKind;

/// Work reports from git history.
///
/// Aggregates commit statistics across configured repositories and streams a
/// written report from an OpenAI-compatible language model.
#[derive(Debug, Parser)]
#[command(name = "devreport", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List configured projects.
    Projects {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show commit statistics for the reporting period.
    Stats {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate a report and stream it to stdout.
    Generate {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Target length in words (defaults to the configured value for the kind).
        #[arg(short, long)]
        words: Option<u32>,

        /// Print the prompt instead of calling the model.
        #[arg(long)]
        prompt_only: bool,
    },

    /// Inspect a repository before registering it.
    Repo {
        #[command(subcommand)]
        action: RepoAction,
    },

    /// Check git availability and configuration.
    Doctor,
}

/// Which projects and period to report on.
#[derive(Debug, Clone, Args)]
pub struct SelectionArgs {
    /// Project id or name. Repeat for several; defaults to every project.
    #[arg(short, long = "project")]
    pub projects: Vec<String>,

    /// Report kind: daily, weekly, monthly, quarterly or yearly.
    #[arg(short, long, default_value = "daily")]
    pub kind: ReportKind,

    /// Start daily reports at the previous midnight.
    #[arg(long)]
    pub cross_day: bool,

    /// Custom range start: YYYY-MM-DD, "YYYY-MM-DD HH:MM:SS" or "N days ago".
    #[arg(long, requires = "until")]
    pub since: Option<String>,

    /// Custom range end, in the same formats as --since.
    #[arg(long, requires = "since")]
    pub until: Option<String>,
}

/// Repository introspection actions.
#[derive(Debug, Subcommand)]
pub enum RepoAction {
    /// List everyone who authored a commit, as `name <email>`.
    Authors {
        /// Absolute path to the repository.
        path: PathBuf,
    },
    /// List the repository's submodules.
    Submodules {
        /// Absolute path to the repository.
        path: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn selection_flags_parse() {
        let cli = Cli::parse_from([
            "devreport",
            "stats",
            "-p",
            "api",
            "--project",
            "web",
            "--kind",
            "weekly",
            "--json",
        ]);
        let Some(Commands::Stats { selection, json }) = cli.command else {
            panic!("expected stats command");
        };
        assert!(json);
        assert_eq!(selection.projects, ["api", "web"]);
        assert_eq!(selection.kind, ReportKind::Weekly);
        assert!(selection.since.is_none());
    }

    #[test]
    fn custom_range_needs_both_bounds() {
        let result = Cli::try_parse_from(["devreport", "stats", "--since", "2025-01-01"]);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let result = Cli::try_parse_from(["devreport", "generate", "--kind", "hourly"]);
        assert!(result.is_err());
    }
}
