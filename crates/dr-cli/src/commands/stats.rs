//! Stats command for showing aggregated commit statistics.

use std::io::Write;

use anyhow::Result;
use dr_core::StatisticsSnapshot;
use dr_engine::RepositoryFailure;
use serde::Serialize;

use crate::Config;
use crate::cli::SelectionArgs;
use crate::commands::util::{short_hash, subject};
use crate::commands::{prepare, refresh, runtime};

/// Rows shown per section in text output.
const TEXT_ROW_LIMIT: usize = 10;

/// Everything the stats command prints.
#[derive(Debug, Serialize)]
pub struct StatsReport {
    pub period: String,
    pub timezone: String,
    pub projects: Vec<String>,
    pub snapshot: Option<StatisticsSnapshot>,
    pub failures: Vec<RepositoryFailure>,
}

pub fn run<W: Write>(
    writer: &mut W,
    config: &Config,
    selection: &SelectionArgs,
    json: bool,
) -> Result<()> {
    let report = runtime()?.block_on(async {
        let mut orchestrator = prepare(config, selection)?;
        let failures = refresh(&mut orchestrator).await;
        let period = orchestrator.period();
        anyhow::Ok(StatsReport {
            period: orchestrator.period_label(&period),
            timezone: iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string()),
            projects: orchestrator
                .selected_projects()
                .iter()
                .map(|p| p.name.clone())
                .collect(),
            snapshot: orchestrator.snapshot().cloned(),
            failures,
        })
    })?;

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
        return Ok(());
    }
    render(writer, &report)
}

pub fn render<W: Write>(writer: &mut W, report: &StatsReport) -> Result<()> {
    writeln!(writer, "Period:   {}", report.period)?;
    writeln!(writer, "Timezone: {}", report.timezone)?;
    writeln!(writer, "Projects: {}", report.projects.join(" + "))?;

    match &report.snapshot {
        None => {
            writeln!(writer)?;
            writeln!(writer, "No statistics available.")?;
        }
        Some(snapshot) if snapshot.is_empty() => {
            writeln!(writer)?;
            writeln!(writer, "No commits found in this period.")?;
        }
        Some(snapshot) => render_snapshot(writer, snapshot)?,
    }

    if !report.failures.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "FAILURES")?;
        writeln!(writer, "────────")?;
        for failure in &report.failures {
            writeln!(writer, "  {}: {}", failure.repository_name, failure.message)?;
        }
    }
    Ok(())
}

fn render_snapshot<W: Write>(writer: &mut W, snapshot: &StatisticsSnapshot) -> Result<()> {
    let authors: Vec<&str> = snapshot.authors.iter().map(String::as_str).collect();

    writeln!(writer)?;
    writeln!(writer, "Commits:       {}", snapshot.total_commits)?;
    writeln!(
        writer,
        "Files changed: {} (in sampled commits)",
        snapshot.total_files_changed
    )?;
    writeln!(writer, "Authors:       {}", authors.join(", "))?;
    writeln!(
        writer,
        "Active:        {} to {}",
        snapshot.date_range.0, snapshot.date_range.1
    )?;

    if !snapshot.file_change_summary.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "TOP FILES")?;
        writeln!(writer, "─────────")?;
        for entry in snapshot.file_change_summary.iter().take(TEXT_ROW_LIMIT) {
            writeln!(writer, "  {:>3}  {}", entry.change_count, entry.path)?;
        }
    }

    writeln!(writer)?;
    writeln!(writer, "RECENT COMMITS")?;
    writeln!(writer, "──────────────")?;
    for commit in snapshot.sample_commits.iter().take(TEXT_ROW_LIMIT) {
        writeln!(
            writer,
            "  {}  {}  {}  {}",
            commit.timestamp.format("%Y-%m-%d %H:%M"),
            short_hash(&commit.hash),
            commit.author,
            subject(&commit.message)
        )?;
    }
    let remaining = snapshot.total_commits.saturating_sub(TEXT_ROW_LIMIT);
    if remaining > 0 {
        writeln!(writer, "  ... and {remaining} more")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BTreeSet;

    use chrono::DateTime;
    use dr_core::{CommitRecord, FileChange, FileChangeSummary, FileStatus};
    use insta::assert_snapshot;

    fn commit(hash: &str, author: &str, timestamp: &str, message: &str) -> CommitRecord {
        CommitRecord {
            hash: hash.to_string(),
            author: author.to_string(),
            email: format!("{}@example.com", author.to_lowercase()),
            timestamp: DateTime::parse_from_rfc3339(timestamp).unwrap(),
            message: message.to_string(),
            files: vec![FileChange {
                status: FileStatus::Modified,
                path: "api/users.rs".to_string(),
            }],
        }
    }

    fn report(snapshot: Option<StatisticsSnapshot>, failures: Vec<RepositoryFailure>) -> StatsReport {
        StatsReport {
            period: "weekly report (2025-03-03 00:00:00 to 2025-03-05 18:00:00)".to_string(),
            timezone: "UTC".to_string(),
            projects: vec!["Backend".to_string(), "Frontend".to_string()],
            snapshot,
            failures,
        }
    }

    fn render_to_string(report: &StatsReport) -> String {
        let mut output = Vec::new();
        render(&mut output, report).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn renders_snapshot_sections() {
        let snapshot = StatisticsSnapshot {
            total_commits: 2,
            total_files_changed: 2,
            authors: BTreeSet::from(["Ada".to_string(), "Bob".to_string()]),
            date_range: (
                "2025-03-03 09:00:00".to_string(),
                "2025-03-05 11:00:00".to_string(),
            ),
            sample_commits: vec![
                commit("0123456789", "Ada", "2025-03-05T11:00:00Z", "fix: pagination\n\nbody"),
                commit("abcdef0123", "Bob", "2025-03-03T09:00:00Z", "feat: users"),
            ],
            file_change_summary: vec![FileChangeSummary {
                path: "api/users.rs".to_string(),
                change_count: 2,
            }],
        };
        let failures = vec![RepositoryFailure {
            repository_id: "web".to_string(),
            repository_name: "Frontend".to_string(),
            message: "not a git repository".to_string(),
        }];

        assert_snapshot!(render_to_string(&report(Some(snapshot), failures)), @r"
        Period:   weekly report (2025-03-03 00:00:00 to 2025-03-05 18:00:00)
        Timezone: UTC
        Projects: Backend + Frontend

        Commits:       2
        Files changed: 2 (in sampled commits)
        Authors:       Ada, Bob
        Active:        2025-03-03 09:00:00 to 2025-03-05 11:00:00

        TOP FILES
        ─────────
            2  api/users.rs

        RECENT COMMITS
        ──────────────
          2025-03-05 11:00  0123456  Ada  fix: pagination
          2025-03-03 09:00  abcdef0  Bob  feat: users

        FAILURES
        ────────
          Frontend: not a git repository
        ");
    }

    #[test]
    fn empty_snapshot_says_so() {
        let period = dr_core::ReportingPeriod::new(
            chrono::NaiveDateTime::parse_from_str("2025-03-03 00:00:00", "%Y-%m-%d %H:%M:%S")
                .unwrap(),
            chrono::NaiveDateTime::parse_from_str("2025-03-05 18:00:00", "%Y-%m-%d %H:%M:%S")
                .unwrap(),
        )
        .unwrap();
        let output = render_to_string(&report(Some(StatisticsSnapshot::empty(&period)), Vec::new()));
        assert!(output.ends_with("\nNo commits found in this period.\n"));
        assert!(!output.contains("FAILURES"));
    }

    #[test]
    fn missing_snapshot_lists_failures() {
        let failures = vec![RepositoryFailure {
            repository_id: "api".to_string(),
            repository_name: "Backend".to_string(),
            message: "permission denied".to_string(),
        }];
        let output = render_to_string(&report(None, failures));
        assert!(output.contains("No statistics available."));
        assert!(output.contains("  Backend: permission denied"));
    }

    #[test]
    fn json_report_serializes_failures() {
        let report = report(None, vec![RepositoryFailure {
            repository_id: "api".to_string(),
            repository_name: "Backend".to_string(),
            message: "boom".to_string(),
        }]);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["failures"][0]["repository_id"], "api");
        assert!(value["snapshot"].is_null());
    }
}
