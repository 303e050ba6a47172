//! Core domain logic for git work reports.
//!
//! This crate contains the fundamental types and logic for:
//! - Periods: resolving the reporting window for a report kind
//! - Snapshots: commit statistics for one or more repositories and their merge
//! - Prompts: turning a snapshot into a generation prompt
//! - Providers: the statistics and generation collaborator seams

pub mod period;
pub mod prompt;
pub mod provider;
pub mod settings;
pub mod snapshot;
pub mod types;

pub use period::ReportingPeriod;
pub use prompt::{ModuleMention, PromptInput, ReportStyle, module_histogram, synthesize};
pub use provider::{
    ChunkEvent, ChunkStream, GenerationProvider, GenerationRequest, StatisticsProvider,
    StatsQuery, StreamChunk,
};
pub use settings::{GenerationSettings, ProjectConfig, ReportDefaults, SubmoduleConfig};
pub use snapshot::{
    CommitRecord, FileChange, FileChangeSummary, FileStatus, SAMPLE_COMMIT_CAP,
    StatisticsSnapshot,
};
pub use types::{ReportKind, RepositorySelection, UnknownReportKind, ValidationError};
