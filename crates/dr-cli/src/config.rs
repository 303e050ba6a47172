//! Configuration loading.

use std::path::{Path, PathBuf};
use std::time::Duration;

use dr_core::{GenerationSettings, ProjectConfig, ReportDefaults};
use dr_engine::DEFAULT_QUIET_PERIOD;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
///
/// The API key is redacted from `Debug` output by [`GenerationSettings`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Registered repositories.
    #[serde(default)]
    pub projects: Vec<ProjectConfig>,
    /// Word targets per report kind.
    #[serde(default)]
    pub reports: ReportDefaults,
    /// Generation backend connection.
    #[serde(default)]
    pub llm: GenerationSettings,
    /// Quiet period before a burst of input changes triggers a refresh.
    pub refresh_debounce_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            projects: Vec::new(),
            reports: ReportDefaults::default(),
            llm: GenerationSettings::default(),
            refresh_debounce_ms: u64::try_from(DEFAULT_QUIET_PERIOD.as_millis()).unwrap_or(500),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    ///
    /// Later sources win: built-in defaults, the user config file, `path`,
    /// then `DEVREPORT_*` environment variables (`__` separates nested keys,
    /// e.g. `DEVREPORT_LLM__API_KEY`).
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(default_path) = default_config_path() {
            figment = figment.merge(Toml::file(default_path));
        }

        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }

        figment
            .merge(Env::prefixed("DEVREPORT_").split("__"))
            .extract()
    }

    pub fn refresh_debounce(&self) -> Duration {
        Duration::from_millis(self.refresh_debounce_ms)
    }

    /// Finds a project by id, falling back to an exact name match.
    pub fn find_project(&self, key: &str) -> Option<&ProjectConfig> {
        self.projects
            .iter()
            .find(|p| p.id == key)
            .or_else(|| self.projects.iter().find(|p| p.name == key))
    }
}

/// Returns the platform-specific config directory for devreport.
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("devreport"))
}

/// The config file read on every run, if the platform has a config directory.
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}
