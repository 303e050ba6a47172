//! CLI subcommand implementations.

pub mod doctor;
pub mod generate;
pub mod projects;
pub mod repo;
pub mod stats;
pub mod util;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use dr_engine::{OrchestratorOptions, ReportOrchestrator, RepositoryFailure};
use dr_git::GitStatsProvider;
use dr_llm::Client;

use crate::cli::SelectionArgs;
use crate::config::Config;

/// The orchestrator wired to git and the chat completions client.
pub type Orchestrator = ReportOrchestrator<GitStatsProvider, Client>;

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")
}

/// Builds an orchestrator with the projects and period requested on the
/// command line. Must be called from within a Tokio runtime.
pub(crate) fn prepare(config: &Config, selection: &SelectionArgs) -> Result<Orchestrator> {
    let ids = util::resolve_projects(config, &selection.projects)?;
    let custom = util::custom_range(selection, Local::now().naive_local())?;

    let options = OrchestratorOptions {
        quiet_period: config.refresh_debounce(),
        report_defaults: config.reports,
        ..OrchestratorOptions::default()
    };
    let client = Client::new().context("failed to build HTTP client")?;
    let mut orchestrator = ReportOrchestrator::new(
        config.projects.clone(),
        options,
        Arc::new(GitStatsProvider::new()),
        Arc::new(client),
    );
    orchestrator.set_report_kind(selection.kind);
    orchestrator.set_cross_day(selection.cross_day);
    orchestrator.set_custom_range(custom);
    orchestrator.select(ids);
    Ok(orchestrator)
}

/// Runs one aggregation cycle and returns the repositories that failed.
pub(crate) async fn refresh(orchestrator: &mut Orchestrator) -> Vec<RepositoryFailure> {
    orchestrator.refresh().await;
    orchestrator.failures().to_vec()
}
