//! State-change events published by the orchestrator.

use serde::Serialize;

use crate::aggregator::{FetchEpoch, RepositoryFailure};
use crate::controller::{SessionId, SessionStatus};

/// A discrete state change, delivered to every subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReportEvent {
    /// A fresh snapshot replaced the previous one.
    SnapshotUpdated {
        epoch: FetchEpoch,
        total_commits: usize,
        total_files_changed: usize,
        author_count: usize,
    },
    /// The snapshot was dropped (empty selection or every fetch failed).
    SnapshotCleared,
    /// One repository could not be fetched; the cycle carried on without it.
    RepositoryFailed {
        epoch: FetchEpoch,
        #[serde(flatten)]
        failure: RepositoryFailure,
    },
    /// The freshly applied snapshot has no commits.
    NoCommitsFound { epoch: FetchEpoch },
    /// Generated text arrived for the active session.
    ChunkReceived {
        session: SessionId,
        status: SessionStatus,
        delta: String,
        accumulated_text: String,
    },
    /// The session completed or failed.
    SessionTerminal {
        session: SessionId,
        status: SessionStatus,
        text: String,
    },
}
