//! Core type definitions with validation.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised before any provider is contacted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No repository is selected.
    #[error("no repository selected")]
    NoSelection,

    /// Generation was requested before statistics were loaded.
    #[error("no statistics loaded for the current selection")]
    NoSnapshot,

    /// The loaded statistics contain no commits.
    #[error("no commits found in the selected period")]
    EmptySnapshot,

    /// A required generation backend setting is blank.
    #[error("missing generation setting: {field}")]
    MissingSetting { field: &'static str },

    /// A generation backend setting is present but unusable.
    #[error("invalid generation setting: {field} ({reason})")]
    InvalidSetting {
        field: &'static str,
        reason: &'static str,
    },

    /// A custom period whose start lies after its end.
    #[error("invalid period: {since} is after {until}")]
    InvertedPeriod {
        since: NaiveDateTime,
        until: NaiveDateTime,
    },
}

/// Granularity of a report.
///
/// Drives both the reporting period and the prompt template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl ReportKind {
    /// All kinds, shortest first.
    pub const ALL: [Self; 5] = [
        Self::Daily,
        Self::Weekly,
        Self::Monthly,
        Self::Quarterly,
        Self::Yearly,
    ];

    /// String representation used in config files and on the command line.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
        }
    }

    /// Human-readable name, e.g. "weekly report".
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Daily => "daily report",
            Self::Weekly => "weekly report",
            Self::Monthly => "monthly report",
            Self::Quarterly => "quarterly report",
            Self::Yearly => "yearly report",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown report kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown report kind: {0} (expected daily, weekly, monthly, quarterly or yearly)")]
pub struct UnknownReportKind(pub String);

impl FromStr for ReportKind {
    type Err = UnknownReportKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "day" => Ok(Self::Daily),
            "weekly" | "week" => Ok(Self::Weekly),
            "monthly" | "month" => Ok(Self::Monthly),
            "quarterly" | "quarter" => Ok(Self::Quarterly),
            "yearly" | "year" => Ok(Self::Yearly),
            _ => Err(UnknownReportKind(s.to_string())),
        }
    }
}

/// Ordered set of selected repository (project) ids.
///
/// Insertion order is preserved and duplicates are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySelection {
    ids: Vec<String>,
}

impl RepositorySelection {
    /// Builds a selection, keeping the first occurrence of each id.
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut selection = Self::default();
        for id in ids {
            selection.insert(id);
        }
        selection
    }

    /// Adds an id if it is not already selected. Returns whether it was added.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.ids.contains(&id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|selected| selected == id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Drops ids that are not in `known`, returning the removed ids.
    pub fn retain_known<'a, I>(&mut self, known: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let known: Vec<&str> = known.into_iter().collect();
        let (kept, removed): (Vec<String>, Vec<String>) = self
            .ids
            .drain(..)
            .partition(|id| known.contains(&id.as_str()));
        self.ids = kept;
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_kind_roundtrips_through_str() {
        for kind in ReportKind::ALL {
            assert_eq!(kind.as_str().parse::<ReportKind>().unwrap(), kind);
        }
    }

    #[test]
    fn report_kind_accepts_short_aliases() {
        assert_eq!("Week".parse::<ReportKind>().unwrap(), ReportKind::Weekly);
        assert_eq!(" day ".parse::<ReportKind>().unwrap(), ReportKind::Daily);
    }

    #[test]
    fn report_kind_rejects_unknown() {
        let err = "fortnightly".parse::<ReportKind>().unwrap_err();
        assert_eq!(err, UnknownReportKind("fortnightly".to_string()));
    }

    #[test]
    fn report_kind_serializes_lowercase() {
        let json = serde_json::to_string(&ReportKind::Quarterly).unwrap();
        assert_eq!(json, "\"quarterly\"");
    }

    #[test]
    fn selection_deduplicates_and_keeps_order() {
        let selection = RepositorySelection::new(["b", "a", "b", "c"]);
        assert_eq!(selection.ids(), ["b", "a", "c"]);
    }

    #[test]
    fn retain_known_prunes_deleted_ids() {
        let mut selection = RepositorySelection::new(["a", "gone", "b"]);
        let removed = selection.retain_known(["a", "b", "c"]);
        assert_eq!(removed, vec!["gone".to_string()]);
        assert_eq!(selection.ids(), ["a", "b"]);
    }

    #[test]
    fn retain_known_with_nothing_known_empties_selection() {
        let mut selection = RepositorySelection::new(["a"]);
        selection.retain_known(std::iter::empty());
        assert!(selection.is_empty());
    }
}
