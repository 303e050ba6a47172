//! Shared utilities for CLI commands.

use std::sync::LazyLock;

use anyhow::Context;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use dr_core::ReportingPeriod;
use dr_core::period::GIT_DATE_FORMAT;
use regex::Regex;

use crate::cli::SelectionArgs;
use crate::config::Config;

/// Pre-compiled regex for relative date parsing.
static RELATIVE_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\s+(hour|day|week)s?\s+ago$").expect("relative date pattern is valid")
});

/// Conservative bound for relative dates (~100 years in hours).
const MAX_RELATIVE_HOURS: i64 = 100 * 365 * 24;

/// Which end of a custom range a date string describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Start,
    End,
}

/// Parses a custom range bound in local time.
///
/// Supports:
/// - Date: "2025-01-15" (start of day for `--since`, end of day for `--until`)
/// - Date and time: "2025-01-15 10:30:00"
/// - Relative: "3 days ago", "2 weeks ago", "12 hours ago"
pub fn parse_bound(s: &str, bound: Bound, now: NaiveDateTime) -> anyhow::Result<NaiveDateTime> {
    let s = s.trim();
    if let Ok(datetime) = NaiveDateTime::parse_from_str(s, GIT_DATE_FORMAT) {
        return Ok(datetime);
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let time = match bound {
            Bound::Start => NaiveTime::MIN,
            Bound::End => NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN),
        };
        return Ok(date.and_time(time));
    }

    let Some(caps) = RELATIVE_DATE_RE.captures(s) else {
        anyhow::bail!(
            "Invalid date: {s}. Use YYYY-MM-DD, \"YYYY-MM-DD HH:MM:SS\" or relative (e.g. '3 days ago')"
        );
    };

    let n: i64 = caps[1]
        .parse()
        .context("failed to parse number in relative date")?;
    let hours_per_unit = match &caps[2] {
        "hour" => 1,
        "day" => 24,
        "week" => 24 * 7,
        unit => anyhow::bail!("Unknown time unit: {unit}"),
    };
    if n > MAX_RELATIVE_HOURS / hours_per_unit {
        anyhow::bail!("Relative date too far back: {n} {}", &caps[2]);
    }

    Ok(now - Duration::hours(n * hours_per_unit))
}

/// Builds the custom range requested by `--since/--until`, if any.
pub fn custom_range(
    args: &SelectionArgs,
    now: NaiveDateTime,
) -> anyhow::Result<Option<ReportingPeriod>> {
    let (Some(since), Some(until)) = (&args.since, &args.until) else {
        return Ok(None);
    };
    let since = parse_bound(since, Bound::Start, now)?;
    let until = parse_bound(until, Bound::End, now)?;
    Ok(Some(ReportingPeriod::new(since, until)?))
}

/// Maps `--project` arguments to project ids; every project when none are given.
pub fn resolve_projects(config: &Config, requested: &[String]) -> anyhow::Result<Vec<String>> {
    if requested.is_empty() {
        return Ok(config.projects.iter().map(|p| p.id.clone()).collect());
    }
    requested
        .iter()
        .map(|key| {
            config
                .find_project(key)
                .map(|p| p.id.clone())
                .with_context(|| format!("unknown project: {key} (see `devreport projects`)"))
        })
        .collect()
}

/// First line of a commit message.
pub fn subject(message: &str) -> &str {
    message.lines().next().unwrap_or_default()
}

/// Abbreviated commit hash.
pub fn short_hash(hash: &str) -> &str {
    hash.get(..7).unwrap_or(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;

    use dr_core::{ProjectConfig, ReportKind};

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2025-03-10 15:45:00", GIT_DATE_FORMAT).unwrap()
    }

    fn selection(since: Option<&str>, until: Option<&str>) -> SelectionArgs {
        SelectionArgs {
            projects: Vec::new(),
            kind: ReportKind::Daily,
            cross_day: false,
            since: since.map(str::to_string),
            until: until.map(str::to_string),
        }
    }

    fn config() -> Config {
        let project = |id: &str, name: &str| ProjectConfig {
            id: id.to_string(),
            name: name.to_string(),
            repo_path: PathBuf::from("/work").join(id),
            authors: Vec::new(),
            submodules: Vec::new(),
        };
        Config {
            projects: vec![project("api", "Backend"), project("web", "Frontend")],
            ..Config::default()
        }
    }

    #[test]
    fn date_only_bounds_cover_whole_days() {
        let since = parse_bound("2025-01-15", Bound::Start, now()).unwrap();
        let until = parse_bound("2025-01-15", Bound::End, now()).unwrap();
        assert_eq!(since.to_string(), "2025-01-15 00:00:00");
        assert_eq!(until.to_string(), "2025-01-15 23:59:59");
    }

    #[test]
    fn datetime_bounds_are_used_verbatim() {
        let parsed = parse_bound("2025-01-15 10:30:00", Bound::End, now()).unwrap();
        assert_eq!(parsed.to_string(), "2025-01-15 10:30:00");
    }

    #[test]
    fn relative_bounds_count_back_from_now() {
        assert_eq!(
            parse_bound("3 days ago", Bound::Start, now()).unwrap().to_string(),
            "2025-03-07 15:45:00"
        );
        assert_eq!(
            parse_bound("1 week ago", Bound::Start, now()).unwrap().to_string(),
            "2025-03-03 15:45:00"
        );
        assert_eq!(
            parse_bound("2 hours ago", Bound::End, now()).unwrap().to_string(),
            "2025-03-10 13:45:00"
        );
    }

    #[test]
    fn invalid_bounds_are_rejected() {
        assert!(parse_bound("yesterday", Bound::Start, now()).is_err());
        assert!(parse_bound("2025-13-01", Bound::Start, now()).is_err());
        assert!(parse_bound("999999999 weeks ago", Bound::Start, now()).is_err());
    }

    #[test]
    fn custom_range_requires_ordered_bounds() {
        assert!(custom_range(&selection(None, None), now()).unwrap().is_none());

        let range = custom_range(&selection(Some("2025-01-01"), Some("2025-01-31")), now())
            .unwrap()
            .unwrap();
        assert_eq!(range.to_string(), "2025-01-01 00:00:00 to 2025-01-31 23:59:59");

        let err = custom_range(&selection(Some("2025-02-01"), Some("2025-01-01")), now())
            .unwrap_err();
        assert!(err.to_string().contains("2025-02-01"), "{err}");
    }

    #[test]
    fn projects_resolve_by_id_or_name() {
        let config = config();
        assert_eq!(resolve_projects(&config, &[]).unwrap(), ["api", "web"]);
        assert_eq!(
            resolve_projects(&config, &["Frontend".to_string(), "api".to_string()]).unwrap(),
            ["web", "api"]
        );
        let err = resolve_projects(&config, &["mobile".to_string()]).unwrap_err();
        assert!(err.to_string().contains("unknown project: mobile"));
    }

    #[test]
    fn commit_text_helpers() {
        assert_eq!(subject("feat: add users\n\nLonger body"), "feat: add users");
        assert_eq!(subject(""), "");
        assert_eq!(short_hash("0123456789abcdef"), "0123456");
        assert_eq!(short_hash("abc"), "abc");
    }
}
