//! Repo commands for inspecting a repository before registering it.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use dr_git::Submodule;

use crate::RepoAction;
use crate::commands::runtime;

pub fn run<W: Write>(writer: &mut W, action: &RepoAction) -> Result<()> {
    let rt = runtime()?;
    match action {
        RepoAction::Authors { path } => {
            let authors = rt
                .block_on(dr_git::list_authors(path))
                .with_context(|| format!("failed to list authors of {}", path.display()))?;
            write_authors(writer, &authors)
        }
        RepoAction::Submodules { path } => {
            let submodules = rt
                .block_on(dr_git::list_submodules(path))
                .with_context(|| format!("failed to list submodules of {}", path.display()))?;
            write_submodules(writer, path, &submodules)
        }
    }
}

fn write_authors<W: Write>(writer: &mut W, authors: &[String]) -> Result<()> {
    if authors.is_empty() {
        writeln!(writer, "No commits found.")?;
    }
    for author in authors {
        writeln!(writer, "{author}")?;
    }
    Ok(())
}

/// Lists submodules followed by a config snippet registering them.
fn write_submodules<W: Write>(writer: &mut W, repo: &Path, submodules: &[Submodule]) -> Result<()> {
    if submodules.is_empty() {
        writeln!(writer, "No submodules in {}.", dr_git::folder_name(repo))?;
        return Ok(());
    }

    let width = submodules.iter().map(|s| s.path.len()).max().unwrap_or(0);
    for submodule in submodules {
        writeln!(writer, "{:width$}  {}", submodule.path, submodule.name)?;
    }

    writeln!(writer)?;
    for submodule in submodules {
        writeln!(writer, "[[projects.submodules]]")?;
        writeln!(writer, "path = {:?}", submodule.path)?;
        writeln!(writer, "name = {:?}", submodule.name)?;
        writeln!(writer, "enabled = true")?;
    }
    Ok(())
}
