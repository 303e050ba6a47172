//! The report orchestrator: single owner of selection, snapshot and session.

use std::sync::Arc;
use std::time::Duration;

use dr_core::{
    GenerationProvider, GenerationSettings, ProjectConfig, PromptInput, ReportDefaults,
    ReportKind, ReportingPeriod, RepositorySelection, StatisticsProvider, StatisticsSnapshot,
    ValidationError, synthesize,
};
use tokio::sync::broadcast;

use crate::aggregator::{
    AggregationCycle, AggregationOutcome, FetchEpoch, RepositoryFailure, RepositoryTarget,
    StatisticsAggregator,
};
use crate::controller::{GenerationController, GenerationSession, GenerationUpdate, SessionId};
use crate::event::ReportEvent;
use crate::scheduler::{DEFAULT_QUIET_PERIOD, RefreshScheduler, prune_selection};

/// Construction options.
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Quiet interval before a burst of input changes triggers a refresh.
    pub quiet_period: Duration,
    pub report_defaults: ReportDefaults,
    /// Buffered events per subscriber before the slowest one starts lagging.
    pub event_capacity: usize,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            quiet_period: DEFAULT_QUIET_PERIOD,
            report_defaults: ReportDefaults::default(),
            event_capacity: 256,
        }
    }
}

/// Inputs captured when a cycle starts, so a prompt describes what was fetched.
#[derive(Debug, Clone)]
struct CycleContext {
    epoch: FetchEpoch,
    kind: ReportKind,
    custom: bool,
    repositories: Vec<(String, String)>,
}

#[derive(Debug)]
struct LoadedSnapshot {
    period: ReportingPeriod,
    snapshot: StatisticsSnapshot,
    kind: ReportKind,
    custom: bool,
    /// Names of the repositories that contributed, in selection order.
    repository_names: Vec<String>,
}

/// Coordinates period resolution, aggregation and streaming generation.
///
/// All state lives here and is only written through `&mut self`. Aggregation
/// cycles run detached from the orchestrator and come back through
/// [`apply_refresh`](Self::apply_refresh), where results from superseded
/// epochs are discarded.
pub struct ReportOrchestrator<S, G> {
    projects: Vec<ProjectConfig>,
    selection: RepositorySelection,
    kind: ReportKind,
    cross_day: bool,
    custom_range: Option<ReportingPeriod>,
    word_target: u32,
    defaults: ReportDefaults,
    epoch: FetchEpoch,
    loaded: Option<LoadedSnapshot>,
    in_flight: Option<CycleContext>,
    failures: Vec<RepositoryFailure>,
    aggregator: StatisticsAggregator<S>,
    controller: GenerationController<G>,
    scheduler: RefreshScheduler,
    events: broadcast::Sender<ReportEvent>,
}

impl<S, G> ReportOrchestrator<S, G>
where
    S: StatisticsProvider,
    G: GenerationProvider,
{
    pub fn new(
        projects: Vec<ProjectConfig>,
        options: OrchestratorOptions,
        statistics: Arc<S>,
        generation: Arc<G>,
    ) -> Self {
        let (events, _) = broadcast::channel(options.event_capacity.max(1));
        let kind = ReportKind::Daily;
        Self {
            projects,
            selection: RepositorySelection::default(),
            kind,
            cross_day: false,
            custom_range: None,
            word_target: options.report_defaults.word_target(kind),
            defaults: options.report_defaults,
            epoch: FetchEpoch::default(),
            loaded: None,
            in_flight: None,
            failures: Vec::new(),
            aggregator: StatisticsAggregator::new(statistics),
            controller: GenerationController::new(generation),
            scheduler: RefreshScheduler::new(options.quiet_period),
            events,
        }
    }

    /// Subscribes to state-change events.
    pub fn subscribe(&self) -> broadcast::Receiver<ReportEvent> {
        self.events.subscribe()
    }

    // ========== Inputs ==========

    /// Replaces the known project list, pruning selections of deleted projects.
    pub fn set_projects(&mut self, projects: Vec<ProjectConfig>) {
        self.projects = projects;
        self.inputs_changed();
    }

    pub fn select<I, T>(&mut self, ids: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.selection = RepositorySelection::new(ids);
        self.inputs_changed();
    }

    /// Switches report kind and resets the word target to its default.
    pub fn set_report_kind(&mut self, kind: ReportKind) {
        self.kind = kind;
        self.word_target = self.defaults.word_target(kind);
        self.inputs_changed();
    }

    pub fn set_cross_day(&mut self, cross_day: bool) {
        self.cross_day = cross_day;
        self.inputs_changed();
    }

    pub fn set_custom_range(&mut self, range: Option<ReportingPeriod>) {
        self.custom_range = range;
        self.inputs_changed();
    }

    pub const fn set_word_target(&mut self, words: u32) {
        self.word_target = words;
    }

    fn inputs_changed(&mut self) {
        prune_selection(&mut self.selection, &self.projects);
        if self.selection.is_empty() {
            self.scheduler.cancel();
            self.invalidate();
        } else {
            self.scheduler.schedule();
        }
    }

    // ========== Accessors ==========

    pub const fn selection(&self) -> &RepositorySelection {
        &self.selection
    }

    pub const fn report_kind(&self) -> ReportKind {
        self.kind
    }

    pub const fn word_target(&self) -> u32 {
        self.word_target
    }

    /// Epoch of the most recently started aggregation cycle.
    pub const fn epoch(&self) -> FetchEpoch {
        self.epoch
    }

    pub fn snapshot(&self) -> Option<&StatisticsSnapshot> {
        self.loaded.as_ref().map(|loaded| &loaded.snapshot)
    }

    /// Repositories that failed in the most recently applied cycle.
    pub fn failures(&self) -> &[RepositoryFailure] {
        &self.failures
    }

    pub fn session(&self) -> Option<&GenerationSession> {
        self.controller.session()
    }

    pub const fn refresh_pending(&self) -> bool {
        self.scheduler.is_pending()
    }

    /// The reporting period as of now.
    pub fn period(&self) -> ReportingPeriod {
        ReportingPeriod::current(self.kind, self.cross_day, self.custom_range)
    }

    pub fn period_label(&self, period: &ReportingPeriod) -> String {
        period.label(self.custom_range.is_none().then_some(self.kind))
    }

    /// Selected projects in selection order.
    pub fn selected_projects(&self) -> Vec<&ProjectConfig> {
        self.selection
            .ids()
            .iter()
            .filter_map(|id| self.projects.iter().find(|p| &p.id == id))
            .collect()
    }

    /// Selected project names joined with " + ".
    pub fn project_label(&self) -> String {
        self.selected_projects()
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(" + ")
    }

    // ========== Aggregation ==========

    /// Starts a new aggregation cycle for the current selection and period.
    ///
    /// Any pending debounced refresh is superseded. Returns `None` and clears
    /// the snapshot when nothing is selected.
    pub fn begin_refresh(&mut self) -> Option<AggregationCycle<S>> {
        self.scheduler.cancel();
        prune_selection(&mut self.selection, &self.projects);
        if self.selection.is_empty() {
            self.invalidate();
            return None;
        }

        self.epoch = self.epoch.next();
        let period = self.period();
        let targets: Vec<RepositoryTarget> = self
            .selected_projects()
            .into_iter()
            .map(|project| RepositoryTarget::from_project(project, period))
            .collect();

        tracing::debug!(
            epoch = %self.epoch,
            repositories = targets.len(),
            %period,
            "starting aggregation"
        );
        self.in_flight = Some(CycleContext {
            epoch: self.epoch,
            kind: self.kind,
            custom: self.custom_range.is_some(),
            repositories: targets
                .iter()
                .map(|t| (t.id.clone(), t.name.clone()))
                .collect(),
        });
        Some(AggregationCycle::new(
            self.epoch,
            period,
            targets,
            self.aggregator.clone(),
        ))
    }

    /// Applies a finished cycle. Returns `false` if the cycle was superseded.
    pub fn apply_refresh(&mut self, outcome: AggregationOutcome) -> bool {
        if outcome.epoch != self.epoch {
            tracing::debug!(
                stale = %outcome.epoch,
                current = %self.epoch,
                "discarding stale aggregation result"
            );
            return false;
        }

        let context = self.in_flight.take().filter(|c| c.epoch == outcome.epoch);
        self.failures.clone_from(&outcome.failures);
        for failure in outcome.failures {
            self.publish(ReportEvent::RepositoryFailed {
                epoch: outcome.epoch,
                failure,
            });
        }

        match outcome.snapshot {
            Some(snapshot) => {
                let empty = snapshot.is_empty();
                self.publish(ReportEvent::SnapshotUpdated {
                    epoch: outcome.epoch,
                    total_commits: snapshot.total_commits,
                    total_files_changed: snapshot.total_files_changed,
                    author_count: snapshot.authors.len(),
                });
                if empty {
                    self.publish(ReportEvent::NoCommitsFound {
                        epoch: outcome.epoch,
                    });
                }
                let (kind, custom, repository_names): (ReportKind, bool, Vec<String>) = match context {
                    Some(context) => (
                        context.kind,
                        context.custom,
                        context
                            .repositories
                            .into_iter()
                            .filter(|(id, _)| {
                                !self.failures.iter().any(|f| &f.repository_id == id)
                            })
                            .map(|(_, name)| name)
                            .collect(),
                    ),
                    None => (
                        self.kind,
                        self.custom_range.is_some(),
                        self.selected_projects().iter().map(|p| p.name.clone()).collect(),
                    ),
                };
                self.loaded = Some(LoadedSnapshot {
                    period: outcome.period,
                    snapshot,
                    kind,
                    custom,
                    repository_names,
                });
            }
            None => self.drop_snapshot(),
        }
        true
    }

    /// Runs one aggregation cycle to completion and applies it.
    pub async fn refresh(&mut self) -> bool {
        let Some(cycle) = self.begin_refresh() else {
            return false;
        };
        let outcome = cycle.run().await;
        self.apply_refresh(outcome)
    }

    /// Waits for the debounced trigger, then refreshes.
    ///
    /// Returns `false` without waiting when no refresh is scheduled.
    pub async fn run_scheduled_refresh(&mut self) -> bool {
        if !self.scheduler.fired().await {
            return false;
        }
        self.refresh().await
    }

    /// Bumps the epoch so in-flight cycles are discarded, then drops the snapshot.
    fn invalidate(&mut self) {
        self.epoch = self.epoch.next();
        self.in_flight = None;
        self.failures.clear();
        self.drop_snapshot();
    }

    fn drop_snapshot(&mut self) {
        if self.loaded.take().is_some() {
            self.publish(ReportEvent::SnapshotCleared);
        }
    }

    // ========== Generation ==========

    /// Builds the prompt for the loaded snapshot.
    ///
    /// Report kind, period and project names are those the snapshot was
    /// fetched with, even if the inputs changed since.
    pub fn prompt(&self) -> Result<String, ValidationError> {
        if self.selection.is_empty() {
            return Err(ValidationError::NoSelection);
        }
        let loaded = self.loaded.as_ref().ok_or(ValidationError::NoSnapshot)?;
        if loaded.snapshot.is_empty() {
            return Err(ValidationError::EmptySnapshot);
        }

        let project_label = loaded.repository_names.join(" + ");
        let period_label = loaded
            .period
            .label((!loaded.custom).then_some(loaded.kind));
        Ok(synthesize(&PromptInput {
            snapshot: &loaded.snapshot,
            kind: loaded.kind,
            word_target: self.word_target,
            project_label: &project_label,
            period_label: &period_label,
        }))
    }

    /// Starts a generation session for the loaded snapshot.
    ///
    /// Any active session is torn down first. Fails before any I/O when
    /// nothing is selected, no commits are loaded, or `settings` is incomplete.
    pub fn generate(&mut self, settings: &GenerationSettings) -> Result<SessionId, ValidationError> {
        let prompt = self.prompt()?;
        settings.validate()?;
        self.controller.start(prompt, settings)
    }

    /// Waits for the next generation update and publishes it.
    pub async fn next_generation_update(&mut self) -> Option<GenerationUpdate> {
        let update = self.controller.next_update().await?;
        if update.status.is_terminal() {
            self.publish(ReportEvent::SessionTerminal {
                session: update.session,
                status: update.status,
                text: update.accumulated_text.clone(),
            });
        } else {
            self.publish(ReportEvent::ChunkReceived {
                session: update.session,
                status: update.status,
                delta: update.delta.clone(),
                accumulated_text: update.accumulated_text.clone(),
            });
        }
        Some(update)
    }

    /// Abandons the active generation session.
    pub fn cancel_generation(&mut self) -> Option<SessionId> {
        self.controller.cancel()
    }

    /// Cancels pending refreshes and the active session.
    pub fn shutdown(&mut self) {
        self.scheduler.cancel();
        self.controller.cancel();
    }

    fn publish(&self, event: ReportEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
