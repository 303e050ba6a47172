//! Commit statistics backed by the `git` command line.
//!
//! [`GitStatsProvider`] implements [`dr_core::StatisticsProvider`] by running
//! `git log` through `tokio::process`, so fetches for several repositories
//! proceed concurrently. The [`inspect`] helpers answer the smaller questions
//! a front end asks about a repository before it is registered.

mod command;
pub mod inspect;
pub mod log;
mod provider;

use std::path::PathBuf;

use thiserror::Error;

pub use inspect::{
    Submodule, folder_name, git_version, is_repository, list_authors, list_submodules,
};
pub use log::parse_git_log;
pub use provider::{GitStatsProvider, SUBMODULE_SAMPLE_LIMIT};

/// Errors from running or parsing git.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("repository path must be absolute: {}", .0.display())]
    RelativePath(PathBuf),

    #[error("repository path does not exist or is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("invalid date argument: {0:?}")]
    InvalidDate(String),

    #[error("invalid author filter: {0:?}")]
    InvalidAuthor(String),

    /// git could not be started at all, usually because it is not installed.
    #[error("failed to run git: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("git {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("invalid author date {value:?} for commit {hash}")]
    InvalidTimestamp {
        hash: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}
