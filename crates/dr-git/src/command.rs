//! Running git subprocesses.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use crate::GitError;

/// Runs `git <args>` and returns its stdout.
///
/// `repo` becomes the working directory when given. The child is killed if
/// the returned future is dropped before it finishes.
pub(crate) async fn run_git(repo: Option<&Path>, args: &[String]) -> Result<String, GitError> {
    let mut command = Command::new("git");
    command
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true);
    if let Some(repo) = repo {
        command.current_dir(repo);
    }

    tracing::debug!(
        repo = repo.map(|r| r.display().to_string()),
        args = %args.join(" "),
        "running git"
    );
    let output = command.output().await.map_err(GitError::Spawn)?;

    if !output.status.success() {
        return Err(GitError::CommandFailed {
            command: args.first().cloned().unwrap_or_default(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    tracing::trace!(bytes = stdout.len(), "git output");
    Ok(stdout)
}

/// Checks that `path` is an absolute path to an existing directory.
pub(crate) fn validate_repo_path(path: &Path) -> Result<(), GitError> {
    if !path.is_absolute() {
        return Err(GitError::RelativePath(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Err(GitError::NotADirectory(path.to_path_buf()));
    }
    Ok(())
}

/// Rejects date arguments git could misread as options or that are not dates.
pub(crate) fn validate_date(date: &str) -> Result<(), GitError> {
    if date.len() > 30 || date.contains('\n') || date.starts_with('-') {
        return Err(GitError::InvalidDate(date.to_string()));
    }
    Ok(())
}

pub(crate) fn validate_author(author: &str) -> Result<(), GitError> {
    if author.starts_with('-') || author.contains('\n') {
        return Err(GitError::InvalidAuthor(author.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_are_rejected() {
        let err = validate_repo_path(Path::new("relative/repo")).unwrap_err();
        assert!(matches!(err, GitError::RelativePath(_)));
    }

    #[test]
    fn missing_directories_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone");
        let err = validate_repo_path(&missing).unwrap_err();
        assert!(matches!(err, GitError::NotADirectory(_)));

        let file = dir.path().join("file");
        std::fs::write(&file, "").unwrap();
        assert!(matches!(
            validate_repo_path(&file).unwrap_err(),
            GitError::NotADirectory(_)
        ));
        assert!(validate_repo_path(dir.path()).is_ok());
    }

    #[test]
    fn option_like_dates_are_rejected() {
        assert!(validate_date("2025-01-01 00:00:00").is_ok());
        assert!(validate_date("--all").is_err());
        assert!(validate_date("2025-01-01\n--all").is_err());
        assert!(validate_date(&"9".repeat(31)).is_err());
    }

    #[test]
    fn option_like_authors_are_rejected() {
        assert!(validate_author("Ada Lovelace").is_ok());
        assert!(matches!(
            validate_author("--exec=x").unwrap_err(),
            GitError::InvalidAuthor(_)
        ));
    }
}
