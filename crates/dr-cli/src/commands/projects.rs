//! Projects command for listing configured repositories.

use std::io::Write;

use anyhow::Result;

use crate::Config;

pub fn run<W: Write>(writer: &mut W, config: &Config, json: bool) -> Result<()> {
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&config.projects)?)?;
        return Ok(());
    }

    if config.projects.is_empty() {
        writeln!(writer, "No projects configured.")?;
        writeln!(
            writer,
            "Hint: add [[projects]] entries to the config file (see 'devreport doctor')."
        )?;
        return Ok(());
    }

    for project in &config.projects {
        writeln!(writer, "{} [{}]", project.name, project.id)?;
        writeln!(writer, "  path: {}", project.repo_path.display())?;
        if project.authors.is_empty() {
            writeln!(writer, "  authors: everyone")?;
        } else {
            writeln!(writer, "  authors: {}", project.authors.join(", "))?;
        }
        if !project.submodules.is_empty() {
            let submodules = project
                .submodules
                .iter()
                .map(|s| {
                    let state = if s.enabled { "on" } else { "off" };
                    format!("{} ({state})", s.path.display())
                })
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(writer, "  submodules: {submodules}")?;
        }
    }

    Ok(())
}
