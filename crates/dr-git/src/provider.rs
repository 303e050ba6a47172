//! The git-backed statistics provider.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::Local;
use dr_core::period::GIT_DATE_FORMAT;
use dr_core::snapshot::{FILE_SUMMARY_CAP, sort_newest_first, summarize_file_changes};
use dr_core::{
    CommitRecord, ReportingPeriod, SAMPLE_COMMIT_CAP, StatisticsProvider, StatisticsSnapshot,
    StatsQuery,
};

use crate::GitError;
use crate::command::{run_git, validate_repo_path};
use crate::inspect::resolve_submodule;
use crate::log::{LogFilter, parse_git_log};

/// Sample commits taken from each enabled submodule.
pub const SUBMODULE_SAMPLE_LIMIT: usize = 20;

/// Statistics provider running the `git` executable found on `PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitStatsProvider;

impl GitStatsProvider {
    pub const fn new() -> Self {
        Self
    }
}

impl StatisticsProvider for GitStatsProvider {
    type Error = GitError;

    async fn fetch_stats(&self, query: &StatsQuery) -> Result<StatisticsSnapshot, GitError> {
        validate_repo_path(&query.repo_path)?;
        let filter = LogFilter::new(&query.period, &query.author_filter)?;

        let mut stats = RepositoryStats::default();
        let main = fetch_repository(&query.repo_path, &filter, SAMPLE_COMMIT_CAP).await?;
        stats.absorb(main);

        for submodule in &query.enabled_submodule_paths {
            let path = resolve_submodule(&query.repo_path, submodule);
            if let Err(err) = validate_repo_path(&path) {
                tracing::warn!(path = %path.display(), error = %err, "skipping invalid submodule");
                continue;
            }
            match fetch_repository(&path, &filter, SUBMODULE_SAMPLE_LIMIT).await {
                Ok(sub) => stats.absorb(sub),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "submodule statistics failed");
                }
            }
        }

        tracing::debug!(
            repo = %query.repo_path.display(),
            commits = stats.total_commits,
            samples = stats.samples.len(),
            "fetched statistics"
        );
        Ok(stats.into_snapshot(&query.period))
    }
}

#[derive(Debug, Default)]
struct RepositoryStats {
    total_commits: usize,
    authors: BTreeSet<String>,
    samples: Vec<CommitRecord>,
}

impl RepositoryStats {
    fn absorb(&mut self, other: Self) {
        self.total_commits += other.total_commits;
        self.authors.extend(other.authors);
        self.samples.extend(other.samples);
    }

    fn into_snapshot(mut self, period: &ReportingPeriod) -> StatisticsSnapshot {
        sort_newest_first(&mut self.samples);
        self.samples.truncate(SAMPLE_COMMIT_CAP);

        let mut snapshot = StatisticsSnapshot::empty(period);
        if let Some(range) = sampled_date_range(&self.samples) {
            snapshot.date_range = range;
        }
        snapshot.total_commits = self.total_commits;
        snapshot.total_files_changed = self.samples.iter().map(|c| c.files.len()).sum();
        snapshot.authors = self.authors;
        snapshot.file_change_summary = summarize_file_changes(&self.samples, FILE_SUMMARY_CAP);
        snapshot.sample_commits = self.samples;
        snapshot
    }
}

/// Counts matching commits and samples the newest `sample_limit` of them.
async fn fetch_repository(
    repo: &Path,
    filter: &LogFilter,
    sample_limit: usize,
) -> Result<RepositoryStats, GitError> {
    let count_args = filter.count_args();
    let sample_args = filter.sample_args(sample_limit);
    let (names, log) = tokio::try_join!(
        run_git(Some(repo), &count_args),
        run_git(Some(repo), &sample_args),
    )?;

    let names: Vec<&str> = names
        .lines()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect();

    Ok(RepositoryStats {
        total_commits: names.len(),
        authors: names.into_iter().map(str::to_string).collect(),
        samples: parse_git_log(&log)?,
    })
}

/// Oldest and newest sample timestamps in local time, if any samples exist.
fn sampled_date_range(samples: &[CommitRecord]) -> Option<(String, String)> {
    let render = |commit: &CommitRecord| {
        commit
            .timestamp
            .with_timezone(&Local)
            .naive_local()
            .format(GIT_DATE_FORMAT)
            .to_string()
    };
    let newest = samples.iter().max_by_key(|c| c.timestamp)?;
    let oldest = samples.iter().min_by_key(|c| c.timestamp)?;
    Some((render(oldest), render(newest)))
}
