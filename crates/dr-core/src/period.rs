//! Reporting period resolution.
//!
//! All calculations happen on local wall-clock time. Weeks start on Monday and
//! quarters start in January, April, July and October.

use std::fmt;

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::types::{ReportKind, ValidationError};

/// Format understood by `git log --since/--until`.
pub const GIT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A closed `[since, until]` window in local time, second precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportingPeriod {
    since: NaiveDateTime,
    until: NaiveDateTime,
}

impl ReportingPeriod {
    /// Creates a period from explicit bounds.
    pub fn new(since: NaiveDateTime, until: NaiveDateTime) -> Result<Self, ValidationError> {
        let since = truncate_to_seconds(since);
        let until = truncate_to_seconds(until);
        if since > until {
            return Err(ValidationError::InvertedPeriod { since, until });
        }
        Ok(Self { since, until })
    }

    /// Computes the period for `kind` as seen at `now`.
    ///
    /// A custom range wins over the kind and is returned verbatim. For daily
    /// reports `cross_day` moves the start back to the previous midnight so
    /// commits made after midnight still count toward the prior day.
    pub fn resolve(
        kind: ReportKind,
        cross_day: bool,
        custom: Option<Self>,
        now: NaiveDateTime,
    ) -> Self {
        if let Some(custom) = custom {
            return custom;
        }

        let now = truncate_to_seconds(now);
        let today = now.date();
        let start = match kind {
            ReportKind::Daily if cross_day => today.pred_opt().unwrap_or(today),
            ReportKind::Daily => today,
            ReportKind::Weekly => {
                today - Duration::days(i64::from(today.weekday().num_days_from_monday()))
            }
            ReportKind::Monthly => today.with_day(1).unwrap_or(today),
            ReportKind::Quarterly => {
                let first_month = (today.month0() / 3) * 3 + 1;
                NaiveDate::from_ymd_opt(today.year(), first_month, 1).unwrap_or(today)
            }
            ReportKind::Yearly => NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
        };

        Self {
            since: start.and_time(NaiveTime::MIN),
            until: now,
        }
    }

    /// Same as [`resolve`](Self::resolve) using the current local time.
    pub fn current(kind: ReportKind, cross_day: bool, custom: Option<Self>) -> Self {
        Self::resolve(kind, cross_day, custom, Local::now().naive_local())
    }

    pub const fn since(&self) -> NaiveDateTime {
        self.since
    }

    pub const fn until(&self) -> NaiveDateTime {
        self.until
    }

    /// Lower bound rendered for git.
    pub fn git_since(&self) -> String {
        self.since.format(GIT_DATE_FORMAT).to_string()
    }

    /// Upper bound rendered for git.
    pub fn git_until(&self) -> String {
        self.until.format(GIT_DATE_FORMAT).to_string()
    }

    /// Label used in prompts, e.g. "weekly report (2025-01-06 00:00:00 to ...)".
    ///
    /// Pass `None` for custom ranges, which have no kind of their own.
    pub fn label(&self, kind: Option<ReportKind>) -> String {
        match kind {
            Some(kind) => format!("{} ({self})", kind.label()),
            None => self.to_string(),
        }
    }
}

impl fmt::Display for ReportingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.git_since(), self.git_until())
    }
}

fn truncate_to_seconds(value: NaiveDateTime) -> NaiveDateTime {
    value.with_nanosecond(0).unwrap_or(value)
}
