//! Read-only settings supplied by the configuration collaborator.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::{ReportKind, ValidationError};

/// Default word-count target per report kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportDefaults {
    pub daily: u32,
    pub weekly: u32,
    pub monthly: u32,
    pub quarterly: u32,
    pub yearly: u32,
}

impl Default for ReportDefaults {
    fn default() -> Self {
        Self {
            daily: 100,
            weekly: 300,
            monthly: 500,
            quarterly: 800,
            yearly: 1000,
        }
    }
}

impl ReportDefaults {
    pub const fn word_target(&self, kind: ReportKind) -> u32 {
        match kind {
            ReportKind::Daily => self.daily,
            ReportKind::Weekly => self.weekly,
            ReportKind::Monthly => self.monthly,
            ReportKind::Quarterly => self.quarterly,
            ReportKind::Yearly => self.yearly,
        }
    }
}

/// Sampling temperatures accepted by chat completion backends.
const TEMPERATURE_RANGE: std::ops::RangeInclusive<f64> = 0.0..=2.0;

/// Connection parameters for the generation backend.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    /// Request timeout in seconds, enforced by the generation provider.
    /// Configured as `timeout`.
    #[serde(rename = "timeout")]
    pub timeout_secs: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.7,
            timeout_secs: 30,
        }
    }
}

impl fmt::Debug for GenerationSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationSettings")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl GenerationSettings {
    /// Checks that key, endpoint and model are present and that temperature
    /// and timeout are usable.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            ("api_key", &self.api_key),
            ("base_url", &self.base_url),
            ("model", &self.model),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingSetting { field });
            }
        }
        if !TEMPERATURE_RANGE.contains(&self.temperature) {
            return Err(ValidationError::InvalidSetting {
                field: "temperature",
                reason: "must be between 0 and 2",
            });
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidSetting {
                field: "timeout",
                reason: "must be at least one second",
            });
        }
        Ok(())
    }
}

/// A registered repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub id: String,
    pub name: String,
    pub repo_path: PathBuf,
    /// Author filters passed to the statistics provider. Empty means everyone.
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub submodules: Vec<SubmoduleConfig>,
}

impl ProjectConfig {
    pub fn enabled_submodule_paths(&self) -> Vec<PathBuf> {
        self.submodules
            .iter()
            .filter(|s| s.enabled)
            .map(|s| s.path.clone())
            .collect()
    }
}

/// A submodule of a registered repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmoduleConfig {
    pub path: PathBuf,
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
}
