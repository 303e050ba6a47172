//! Concurrent statistics fetch and merge.

use std::fmt;
use std::sync::Arc;

use dr_core::{ProjectConfig, ReportingPeriod, StatisticsProvider, StatisticsSnapshot, StatsQuery};
use futures_util::future::join_all;
use serde::Serialize;

/// Monotonic tag identifying an aggregation cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct FetchEpoch(u64);

impl FetchEpoch {
    pub const fn value(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for FetchEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One repository to fetch statistics for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryTarget {
    pub id: String,
    pub name: String,
    pub query: StatsQuery,
}

impl RepositoryTarget {
    pub fn from_project(project: &ProjectConfig, period: ReportingPeriod) -> Self {
        Self {
            id: project.id.clone(),
            name: project.name.clone(),
            query: StatsQuery::for_project(project, period),
        }
    }
}

/// A repository whose fetch failed during a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryFailure {
    pub repository_id: String,
    pub repository_name: String,
    pub message: String,
}

/// Result of one aggregation cycle.
///
/// `snapshot` is `None` when no repository succeeded.
#[derive(Debug, Clone)]
pub struct AggregationOutcome {
    pub epoch: FetchEpoch,
    pub period: ReportingPeriod,
    pub snapshot: Option<StatisticsSnapshot>,
    pub failures: Vec<RepositoryFailure>,
}

/// Fans statistics fetches out to the provider and merges the results.
pub struct StatisticsAggregator<S> {
    provider: Arc<S>,
}

impl<S> Clone for StatisticsAggregator<S> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
        }
    }
}

impl<S: StatisticsProvider> StatisticsAggregator<S> {
    pub const fn new(provider: Arc<S>) -> Self {
        Self { provider }
    }

    /// Fetches every target and merges the successful snapshots.
    ///
    /// A single target's snapshot is returned unchanged. With several targets
    /// the fetches run concurrently and a failing repository is reported
    /// without aborting the others.
    pub async fn aggregate(
        &self,
        epoch: FetchEpoch,
        period: ReportingPeriod,
        targets: &[RepositoryTarget],
    ) -> AggregationOutcome {
        let results = join_all(targets.iter().map(|target| async move {
            let result = self.provider.fetch_stats(&target.query).await;
            (target, result)
        }))
        .await;

        let mut snapshots = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for (target, result) in results {
            match result {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(err) => {
                    tracing::warn!(
                        %epoch,
                        repository = %target.name,
                        path = %target.query.repo_path.display(),
                        error = %err,
                        "statistics fetch failed"
                    );
                    failures.push(RepositoryFailure {
                        repository_id: target.id.clone(),
                        repository_name: target.name.clone(),
                        message: err.to_string(),
                    });
                }
            }
        }

        let snapshot = match (targets.len(), snapshots.len()) {
            (_, 0) => None,
            (1, _) => snapshots.pop(),
            _ => Some(StatisticsSnapshot::merge(&period, snapshots)),
        };

        AggregationOutcome {
            epoch,
            period,
            snapshot,
            failures,
        }
    }
}

/// An aggregation cycle stamped with the epoch active when it started.
///
/// Running a cycle does not touch orchestrator state; the outcome is handed
/// back to [`ReportOrchestrator::apply_refresh`](crate::ReportOrchestrator::apply_refresh),
/// which discards it if a newer cycle has started meanwhile.
pub struct AggregationCycle<S> {
    epoch: FetchEpoch,
    period: ReportingPeriod,
    targets: Vec<RepositoryTarget>,
    aggregator: StatisticsAggregator<S>,
}

impl<S: StatisticsProvider> AggregationCycle<S> {
    pub(crate) const fn new(
        epoch: FetchEpoch,
        period: ReportingPeriod,
        targets: Vec<RepositoryTarget>,
        aggregator: StatisticsAggregator<S>,
    ) -> Self {
        Self {
            epoch,
            period,
            targets,
            aggregator,
        }
    }

    pub const fn epoch(&self) -> FetchEpoch {
        self.epoch
    }

    pub const fn period(&self) -> ReportingPeriod {
        self.period
    }

    pub fn targets(&self) -> &[RepositoryTarget] {
        &self.targets
    }

    pub async fn run(self) -> AggregationOutcome {
        self.aggregator
            .aggregate(self.epoch, self.period, &self.targets)
            .await
    }
}
