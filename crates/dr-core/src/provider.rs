//! Collaborator seams: statistics and text generation providers.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use futures_util::Stream;
use serde::{Deserialize, Serialize};

use crate::period::ReportingPeriod;
use crate::settings::{GenerationSettings, ProjectConfig};
use crate::snapshot::StatisticsSnapshot;

/// Parameters of one statistics fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsQuery {
    pub repo_path: PathBuf,
    pub period: ReportingPeriod,
    pub author_filter: Vec<String>,
    pub enabled_submodule_paths: Vec<PathBuf>,
}

impl StatsQuery {
    pub fn for_project(project: &ProjectConfig, period: ReportingPeriod) -> Self {
        Self {
            repo_path: project.repo_path.clone(),
            period,
            author_filter: project.authors.clone(),
            enabled_submodule_paths: project.enabled_submodule_paths(),
        }
    }
}

/// Computes commit statistics for a single repository.
pub trait StatisticsProvider: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn fetch_stats(
        &self,
        query: &StatsQuery,
    ) -> impl Future<Output = Result<StatisticsSnapshot, Self::Error>> + Send;
}

/// One generation request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub settings: GenerationSettings,
    pub prompt: String,
}

/// Wire record pushed by a generation provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChunk {
    pub content: String,
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl StreamChunk {
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            content: text.into(),
            done: false,
            error: None,
        }
    }

    pub const fn done() -> Self {
        Self {
            content: String::new(),
            done: true,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            done: true,
            error: Some(message.into()),
        }
    }

    /// True for chunks that end the stream.
    pub fn is_terminal(&self) -> bool {
        self.done || self.error.as_deref().is_some_and(|e| !e.is_empty())
    }
}

/// A validated stream chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkEvent {
    Content(String),
    Done,
    Error(String),
}

impl ChunkEvent {
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error(_))
    }
}

impl From<StreamChunk> for ChunkEvent {
    fn from(chunk: StreamChunk) -> Self {
        match chunk.error {
            Some(message) if !message.is_empty() => Self::Error(message),
            _ if chunk.done => Self::Done,
            _ => Self::Content(chunk.content),
        }
    }
}

/// Ordered, push-delivered generation output.
pub type ChunkStream = Pin<Box<dyn Stream<Item = StreamChunk> + Send + 'static>>;

/// Streams generated text for a prompt.
///
/// The returned stream ends after a `done` or `error` chunk. Timeouts are the
/// provider's responsibility.
pub trait GenerationProvider: Send + Sync {
    fn open_stream(&self, request: GenerationRequest) -> ChunkStream;
}
