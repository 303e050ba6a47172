//! Report generation orchestration.
//!
//! Coordinates the asynchronous parts of producing a report:
//! - Aggregation: concurrent per-repository statistics fetches merged into one snapshot
//! - Generation: a single streaming session relaying provider output
//! - Scheduling: debouncing bursts of input changes into one refresh
//!
//! [`ReportOrchestrator`] owns all of it. Every method that schedules work must
//! be called from within a Tokio runtime.

mod aggregator;
mod controller;
mod event;
mod orchestrator;
mod scheduler;

pub use aggregator::{
    AggregationCycle, AggregationOutcome, FetchEpoch, RepositoryFailure, RepositoryTarget,
    StatisticsAggregator,
};
pub use controller::{
    ERROR_MARKER_PREFIX, GenerationController, GenerationSession, GenerationUpdate, SessionId,
    SessionStatus,
};
pub use event::ReportEvent;
pub use orchestrator::{OrchestratorOptions, ReportOrchestrator};
pub use scheduler::{DEFAULT_QUIET_PERIOD, RefreshScheduler, prune_selection};
