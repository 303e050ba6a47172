//! `git log` invocation arguments and output parsing.

use chrono::DateTime;
use dr_core::{CommitRecord, FileChange, FileStatus, ReportingPeriod};

use crate::GitError;
use crate::command::{validate_author, validate_date};

/// Separates header fields in `git log` output.
pub const FIELD_SEPARATOR: char = '\x1e';

/// Header format: hash, author name, author email, strict ISO author date, subject.
const HEADER_FORMAT: &str = "--format=%H%x1e%an%x1e%ae%x1e%aI%x1e%s";

/// Validated `git log` range and author arguments shared by every pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LogFilter {
    args: Vec<String>,
}

impl LogFilter {
    pub(crate) fn new(period: &ReportingPeriod, authors: &[String]) -> Result<Self, GitError> {
        let since = period.git_since();
        let until = period.git_until();
        validate_date(&since)?;
        validate_date(&until)?;

        let mut args = vec![
            "log".to_string(),
            "--no-merges".to_string(),
            format!("--since={since}"),
            format!("--until={until}"),
        ];
        for author in authors {
            validate_author(author)?;
            args.push(format!("--author={author}"));
        }
        Ok(Self { args })
    }

    /// Arguments listing one author name per matching commit.
    pub(crate) fn count_args(&self) -> Vec<String> {
        let mut args = self.args.clone();
        args.push("--format=%an".to_string());
        args
    }

    /// Arguments listing the newest `limit` commits with their changed files.
    pub(crate) fn sample_args(&self, limit: usize) -> Vec<String> {
        let mut args = self.args.clone();
        args.push(format!("--max-count={limit}"));
        args.push(HEADER_FORMAT.to_string());
        args.push("--name-status".to_string());
        args
    }
}

/// Parses `git log --name-status` output produced with the header format above.
///
/// Lines before the first header and malformed headers are skipped. Renames
/// and copies record their destination path.
pub fn parse_git_log(raw: &str) -> Result<Vec<CommitRecord>, GitError> {
    let mut commits = Vec::new();
    let mut current: Option<CommitRecord> = None;

    for line in raw.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        if line.contains(FIELD_SEPARATOR) {
            if let Some(commit) = current.take() {
                commits.push(commit);
            }
            current = parse_header(line)?;
        } else if let Some(commit) = current.as_mut() {
            if let Some(file) = parse_file_line(line) {
                commit.files.push(file);
            }
        }
    }

    commits.extend(current);
    Ok(commits)
}

fn parse_header(line: &str) -> Result<Option<CommitRecord>, GitError> {
    let fields: Vec<&str> = line.splitn(5, FIELD_SEPARATOR).collect();
    let [hash, author, email, date, message] = fields.as_slice() else {
        tracing::debug!(line, "skipping malformed commit header");
        return Ok(None);
    };

    let timestamp =
        DateTime::parse_from_rfc3339(date).map_err(|source| GitError::InvalidTimestamp {
            hash: (*hash).to_string(),
            value: (*date).to_string(),
            source,
        })?;

    Ok(Some(CommitRecord {
        hash: (*hash).to_string(),
        author: (*author).to_string(),
        email: (*email).to_string(),
        timestamp,
        message: (*message).to_string(),
        files: Vec::new(),
    }))
}

fn parse_file_line(line: &str) -> Option<FileChange> {
    let mut fields = line.split('\t');
    let status = fields.next()?.chars().next()?;
    let path = fields.next_back()?;
    if path.is_empty() {
        return None;
    }
    Some(FileChange {
        status: FileStatus::from_git_letter(status),
        path: path.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDateTime;

    fn header(hash: &str, date: &str, subject: &str) -> String {
        format!("{hash}\x1eAda\x1eada@example.com\x1e{date}\x1e{subject}")
    }

    #[test]
    fn parses_headers_and_file_lines() {
        let raw = format!(
            "{}\n\nM\tsrc/api/user.rs\nA\tsrc/api/new.rs\nD\told.txt\n\n{}\n\nR087\tsrc/a.rs\tsrc/b.rs\n",
            header("abc", "2025-01-02T10:00:00+08:00", "feat: add users"),
            header("def", "2025-01-01T09:00:00+00:00", "refactor: move a"),
        );

        let commits = parse_git_log(&raw).unwrap();

        assert_eq!(commits.len(), 2);
        let first = &commits[0];
        assert_eq!(first.hash, "abc");
        assert_eq!(first.author, "Ada");
        assert_eq!(first.email, "ada@example.com");
        assert_eq!(first.message, "feat: add users");
        assert_eq!(first.timestamp.to_rfc3339(), "2025-01-02T10:00:00+08:00");
        let statuses: Vec<_> = first.files.iter().map(|f| f.status).collect();
        assert_eq!(
            statuses,
            [FileStatus::Modified, FileStatus::Added, FileStatus::Deleted]
        );

        assert_eq!(commits[1].files.len(), 1);
        assert_eq!(commits[1].files[0].path, "src/b.rs");
        assert_eq!(commits[1].files[0].status, FileStatus::Modified);
    }

    #[test]
    fn subject_may_contain_tabs_and_separators_after_the_fourth_field() {
        let raw = header("abc", "2025-01-02T10:00:00Z", "fix:\tthing \x1e more");
        let commits = parse_git_log(&raw).unwrap();
        assert_eq!(commits[0].message, "fix:\tthing \x1e more");
        assert!(commits[0].files.is_empty());
    }

    #[test]
    fn malformed_headers_and_stray_lines_are_skipped() {
        let raw = format!(
            "M\tbefore-any-header.rs\nonly\x1etwo\nM\torphan.rs\n{}\nM\tkept.rs\n",
            header("abc", "2025-01-02T10:00:00Z", "ok"),
        );
        let commits = parse_git_log(&raw).unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].files.len(), 1);
        assert_eq!(commits[0].files[0].path, "kept.rs");
    }

    #[test]
    fn invalid_dates_are_errors() {
        let err = parse_git_log(&header("abc", "yesterday", "x")).unwrap_err();
        assert!(matches!(err, GitError::InvalidTimestamp { hash, .. } if hash == "abc"));
    }

    #[test]
    fn empty_output_has_no_commits() {
        assert!(parse_git_log("").unwrap().is_empty());
        assert!(parse_git_log("\n\n").unwrap().is_empty());
    }

    #[test]
    fn filter_builds_range_and_author_arguments() {
        let parse = |s| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap();
        let period =
            ReportingPeriod::new(parse("2025-01-06 00:00:00"), parse("2025-01-08 12:30:00")).unwrap();
        let filter = LogFilter::new(&period, &["Ada".to_string()]).unwrap();

        let args = filter.sample_args(50);
        assert!(args.contains(&"--since=2025-01-06 00:00:00".to_string()));
        assert!(args.contains(&"--until=2025-01-08 12:30:00".to_string()));
        assert!(args.contains(&"--author=Ada".to_string()));
        assert!(args.contains(&"--max-count=50".to_string()));
        assert!(args.contains(&"--name-status".to_string()));
        assert_eq!(filter.count_args().last().unwrap(), "--format=%an");
    }

    #[test]
    fn filter_rejects_option_like_authors() {
        let parse = |s| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap();
        let period =
            ReportingPeriod::new(parse("2025-01-06 00:00:00"), parse("2025-01-06 00:00:00")).unwrap();
        let err = LogFilter::new(&period, &["--all".to_string()]).unwrap_err();
        assert!(matches!(err, GitError::InvalidAuthor(_)));
    }
}
