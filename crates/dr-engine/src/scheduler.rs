//! Debounced refresh triggering.

use std::time::Duration;

use dr_core::{ProjectConfig, RepositorySelection};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Quiet interval used when none is configured.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(500);

/// Collapses bursts of input changes into a single refresh trigger.
///
/// Every [`schedule`](Self::schedule) cancels the pending timer and starts a
/// fresh one; only the most recent timer can fire.
pub struct RefreshScheduler {
    quiet: Duration,
    generation: u64,
    pending: Option<JoinHandle<()>>,
    fired_tx: mpsc::UnboundedSender<u64>,
    fired_rx: mpsc::UnboundedReceiver<u64>,
}

impl RefreshScheduler {
    pub fn new(quiet: Duration) -> Self {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        Self {
            quiet,
            generation: 0,
            pending: None,
            fired_tx,
            fired_rx,
        }
    }

    pub const fn quiet_period(&self) -> Duration {
        self.quiet
    }

    /// (Re)starts the quiet-period timer.
    pub fn schedule(&mut self) {
        self.cancel();
        self.generation += 1;
        let generation = self.generation;
        let quiet = self.quiet;
        let fired = self.fired_tx.clone();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            let _ = fired.send(generation);
        }));
    }

    /// Drops the pending trigger, if any.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }

    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Waits for the pending trigger to fire.
    ///
    /// Returns `false` immediately when nothing is scheduled. Triggers from
    /// timers that were superseded before being observed are skipped.
    pub async fn fired(&mut self) -> bool {
        while self.pending.is_some() {
            let Some(generation) = self.fired_rx.recv().await else {
                return false;
            };
            if generation == self.generation {
                self.pending = None;
                return true;
            }
            tracing::trace!(generation, current = self.generation, "skipping superseded trigger");
        }
        false
    }
}

impl Default for RefreshScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_PERIOD)
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Removes selected ids that are no longer registered projects.
///
/// Deleted projects are expected, so this only logs.
pub fn prune_selection(selection: &mut RepositorySelection, projects: &[ProjectConfig]) -> Vec<String> {
    let removed = selection.retain_known(projects.iter().map(|p| p.id.as_str()));
    if !removed.is_empty() {
        tracing::debug!(?removed, "pruned selection of deleted projects");
    }
    removed
}
