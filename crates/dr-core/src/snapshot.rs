//! Commit statistics snapshots and their merge.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::period::ReportingPeriod;

/// Maximum number of sample commits kept in a snapshot.
pub const SAMPLE_COMMIT_CAP: usize = 50;

/// Maximum number of entries in a snapshot's file change summary.
pub const FILE_SUMMARY_CAP: usize = 20;

/// How a commit touched a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Deleted,
    Modified,
}

impl FileStatus {
    /// Maps a `git --name-status` letter. Anything but `A` and `D` counts as a
    /// modification (renames, copies, type changes).
    pub const fn from_git_letter(letter: char) -> Self {
        match letter {
            'A' => Self::Added,
            'D' => Self::Deleted,
            _ => Self::Modified,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Deleted => "deleted",
            Self::Modified => "modified",
        }
    }
}

/// A single file touched by a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub status: FileStatus,
    pub path: String,
}

/// One commit as reported by the statistics provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub hash: String,
    pub author: String,
    pub email: String,
    pub timestamp: DateTime<FixedOffset>,
    pub message: String,
    #[serde(default)]
    pub files: Vec<FileChange>,
}

/// Change count for one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChangeSummary {
    pub path: String,
    pub change_count: usize,
}

/// Aggregated statistics for one or more repositories over a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    pub total_commits: usize,
    pub total_files_changed: usize,
    pub authors: BTreeSet<String>,
    pub date_range: (String, String),
    /// Newest first, at most [`SAMPLE_COMMIT_CAP`] entries.
    pub sample_commits: Vec<CommitRecord>,
    pub file_change_summary: Vec<FileChangeSummary>,
}

impl StatisticsSnapshot {
    /// A snapshot with no commits spanning `period`.
    pub fn empty(period: &ReportingPeriod) -> Self {
        Self {
            total_commits: 0,
            total_files_changed: 0,
            authors: BTreeSet::new(),
            date_range: (period.git_since(), period.git_until()),
            sample_commits: Vec::new(),
            file_change_summary: Vec::new(),
        }
    }

    /// True when the snapshot holds no commits.
    pub const fn is_empty(&self) -> bool {
        self.total_commits == 0
    }

    /// Merges per-repository snapshots into one.
    ///
    /// Totals are summed, authors unioned, sample commits concatenated, sorted
    /// newest first and capped at [`SAMPLE_COMMIT_CAP`]. File summaries are
    /// summed per path. The result does not depend on input order.
    pub fn merge<I>(period: &ReportingPeriod, snapshots: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let mut merged = Self::empty(period);
        let mut file_counts: HashMap<String, usize> = HashMap::new();

        for snapshot in snapshots {
            merged.total_commits += snapshot.total_commits;
            merged.total_files_changed += snapshot.total_files_changed;
            merged.authors.extend(snapshot.authors);
            merged.sample_commits.extend(snapshot.sample_commits);
            for entry in snapshot.file_change_summary {
                *file_counts.entry(entry.path).or_insert(0) += entry.change_count;
            }
        }

        sort_newest_first(&mut merged.sample_commits);
        merged.sample_commits.truncate(SAMPLE_COMMIT_CAP);
        merged.file_change_summary = top_file_changes(file_counts, FILE_SUMMARY_CAP);
        merged
    }
}

/// Sorts commits newest first. Equal timestamps are ordered by hash.
pub fn sort_newest_first(commits: &mut [CommitRecord]) {
    commits.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| a.hash.cmp(&b.hash))
    });
}

/// Counts file touches across `commits`, keeping the `limit` busiest paths.
pub fn summarize_file_changes(commits: &[CommitRecord], limit: usize) -> Vec<FileChangeSummary> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for commit in commits {
        for file in &commit.files {
            *counts.entry(file.path.clone()).or_insert(0) += 1;
        }
    }
    top_file_changes(counts, limit)
}

fn top_file_changes(counts: HashMap<String, usize>, limit: usize) -> Vec<FileChangeSummary> {
    let mut entries: Vec<FileChangeSummary> = counts
        .into_iter()
        .map(|(path, change_count)| FileChangeSummary { path, change_count })
        .collect();
    entries.sort_by(|a, b| {
        b.change_count
            .cmp(&a.change_count)
            .then_with(|| a.path.cmp(&b.path))
    });
    entries.truncate(limit);
    entries
}
