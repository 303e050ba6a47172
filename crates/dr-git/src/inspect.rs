//! Repository introspection helpers.

use std::path::{Path, PathBuf};

use crate::GitError;
use crate::command::{run_git, validate_repo_path};

/// A submodule listed by `git submodule status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submodule {
    /// Last path component.
    pub name: String,
    /// Path relative to the superproject root.
    pub path: String,
    pub full_path: PathBuf,
}

/// Returns the `git --version` line.
pub async fn git_version() -> Result<String, GitError> {
    let output = run_git(None, &["--version".to_string()]).await?;
    Ok(output.trim().to_string())
}

/// True when `path` is inside a git work tree.
pub async fn is_repository(path: &Path) -> Result<bool, GitError> {
    validate_repo_path(path)?;
    match run_git(
        Some(path),
        &["rev-parse".to_string(), "--is-inside-work-tree".to_string()],
    )
    .await
    {
        Ok(output) => Ok(output.trim() == "true"),
        Err(GitError::CommandFailed { .. }) => Ok(false),
        Err(err) => Err(err),
    }
}

/// Every `name <email>` that authored a commit on any ref, sorted and deduplicated.
pub async fn list_authors(path: &Path) -> Result<Vec<String>, GitError> {
    validate_repo_path(path)?;
    let output = run_git(
        Some(path),
        &[
            "log".to_string(),
            "--all".to_string(),
            "--format=%an <%ae>".to_string(),
        ],
    )
    .await?;

    let mut authors: Vec<String> = output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    authors.sort();
    authors.dedup();
    Ok(authors)
}

/// Submodules of the repository at `path`.
///
/// A repository whose submodules cannot be listed is treated as having none.
pub async fn list_submodules(path: &Path) -> Result<Vec<Submodule>, GitError> {
    validate_repo_path(path)?;
    match run_git(Some(path), &["submodule".to_string(), "status".to_string()]).await {
        Ok(output) => Ok(parse_submodule_status(path, &output)),
        Err(GitError::CommandFailed { stderr, .. }) => {
            tracing::debug!(path = %path.display(), %stderr, "submodule status failed");
            Ok(Vec::new())
        }
        Err(err) => Err(err),
    }
}

/// Parses `git submodule status` lines such as ` 1a2b3c lib/core (v1.2)`.
///
/// The leading state marker (`-`, `+`, `U`) is ignored.
pub fn parse_submodule_status(base: &Path, output: &str) -> Vec<Submodule> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.trim().splitn(3, ' ');
            let _commit = fields.next()?;
            let path = fields.next().filter(|p| !p.is_empty())?;
            let name = path.rsplit('/').next().unwrap_or(path);
            Some(Submodule {
                name: name.to_string(),
                path: path.to_string(),
                full_path: base.join(path),
            })
        })
        .collect()
}

/// Last component of `path`, or the whole path when it has none.
pub fn folder_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

/// Resolves a configured submodule path against its superproject.
pub fn resolve_submodule(base: &Path, submodule: &Path) -> PathBuf {
    base.join(submodule)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_submodule_status_lines() {
        let output = " 1a2b3c4d libs/core (v1.2.0)\n-5e6f7a8b vendor/ui\n+9c0d1e2f tools (heads/main)\n\n";
        let submodules = parse_submodule_status(Path::new("/work/app"), output);

        assert_eq!(submodules.len(), 3);
        assert_eq!(submodules[0].name, "core");
        assert_eq!(submodules[0].path, "libs/core");
        assert_eq!(submodules[0].full_path, PathBuf::from("/work/app/libs/core"));
        assert_eq!(submodules[1].name, "ui");
        assert_eq!(submodules[2].name, "tools");
    }

    #[test]
    fn lines_without_a_path_are_ignored() {
        assert!(parse_submodule_status(Path::new("/r"), "deadbeef\n   \n").is_empty());
    }

    #[test]
    fn folder_name_uses_last_component() {
        assert_eq!(folder_name(Path::new("/work/my-app")), "my-app");
        assert_eq!(folder_name(Path::new("/")), "/");
    }

    #[test]
    fn submodule_paths_resolve_against_the_superproject() {
        assert_eq!(
            resolve_submodule(Path::new("/work/app"), Path::new("libs/core")),
            PathBuf::from("/work/app/libs/core")
        );
        assert_eq!(
            resolve_submodule(Path::new("/work/app"), Path::new("/elsewhere/core")),
            PathBuf::from("/elsewhere/core")
        );
    }

    #[tokio::test]
    async fn relative_paths_are_rejected_before_running_git() {
        let err = list_authors(Path::new("not/absolute")).await.unwrap_err();
        assert!(matches!(err, GitError::RelativePath(_)));
    }
}
