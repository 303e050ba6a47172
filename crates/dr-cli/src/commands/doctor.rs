//! Doctor command for checking that reports can be produced.

use std::io::Write;
use std::path::Path;

use anyhow::{Result, bail};

use crate::Config;
use crate::commands::runtime;
use crate::config::default_config_path;

/// Outcome of a single check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub label: String,
    pub ok: bool,
    pub detail: String,
}

impl Check {
    fn ok(label: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ok: true,
            detail: detail.into(),
        }
    }

    fn problem(label: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ok: false,
            detail: detail.into(),
        }
    }
}

pub fn run<W: Write>(writer: &mut W, config: &Config, config_path: Option<&Path>) -> Result<()> {
    let checks = runtime()?.block_on(collect(config, config_path));
    render(writer, &checks)?;

    let problems = checks.iter().filter(|c| !c.ok).count();
    if problems > 0 {
        bail!("{problems} problem(s) found");
    }
    Ok(())
}

async fn collect(config: &Config, config_path: Option<&Path>) -> Vec<Check> {
    let mut checks = Vec::new();

    checks.push(match dr_git::git_version().await {
        Ok(version) => Check::ok("git", version),
        Err(err) => Check::problem("git", err.to_string()),
    });

    let path = config_path.map(Path::to_path_buf).or_else(default_config_path);
    checks.push(match path {
        Some(path) if path.exists() => Check::ok("config", path.display().to_string()),
        Some(path) => Check::ok("config", format!("{} (not found, using defaults)", path.display())),
        None => Check::ok("config", "no config directory on this platform"),
    });

    if config.projects.is_empty() {
        checks.push(Check::problem("projects", "none configured"));
    }
    for project in &config.projects {
        let label = format!("project {}", project.id);
        checks.push(match dr_git::is_repository(&project.repo_path).await {
            Ok(true) => Check::ok(label, project.repo_path.display().to_string()),
            Ok(false) => Check::problem(
                label,
                format!("{} is not a git repository", project.repo_path.display()),
            ),
            Err(err) => Check::problem(label, err.to_string()),
        });
    }

    checks.push(match config.llm.validate() {
        Ok(()) => Check::ok("llm", format!("{} at {}", config.llm.model, config.llm.base_url)),
        Err(err) => Check::problem("llm", err.to_string()),
    });

    checks
}

pub fn render<W: Write>(writer: &mut W, checks: &[Check]) -> Result<()> {
    let width = checks.iter().map(|c| c.label.len()).max().unwrap_or(0);
    for check in checks {
        let mark = if check.ok { "ok" } else { "!!" };
        writeln!(writer, "[{mark}] {:width$}  {}", check.label, check.detail)?;
    }
    Ok(())
}
