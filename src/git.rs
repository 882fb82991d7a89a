//! Git command runner.
//!
//! Provides a wrapper around git commands with captured stdout/stderr and
//! structured error handling. All git operations go through this module.

use crate::error::{BuilderError, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Result of a successful git command execution.
#[derive(Debug, Clone)]
pub struct GitOutput {
    /// Standard output from the command (trimmed).
    pub stdout: String,
    /// Standard error from the command (trimmed).
    pub stderr: String,
}

impl GitOutput {
    fn from_output(output: &Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }

    /// Returns stdout lines as a vector.
    pub fn lines(&self) -> Vec<&str> {
        if self.stdout.is_empty() {
            Vec::new()
        } else {
            self.stdout.lines().collect()
        }
    }
}

/// Run a git command with the specified working directory.
///
/// # Arguments
///
/// * `cwd` - The working directory to run the command in
/// * `args` - The git command arguments (without "git" prefix)
///
/// # Returns
///
/// * `Ok(GitOutput)` - On successful execution (exit code 0)
/// * `Err(BuilderError::Sync)` - On spawn failure or non-zero exit code
pub fn run_git<P: AsRef<Path>>(cwd: P, args: &[&str]) -> Result<GitOutput> {
    let cwd = cwd.as_ref();

    let output = Command::new("git")
        .current_dir(cwd)
        .args(args)
        // Never block on a credential prompt in an unattended build.
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .map_err(|e| {
            BuilderError::Sync(format!(
                "failed to execute git {}: {} (is git installed?)",
                args.first().unwrap_or(&""),
                e
            ))
        })?;

    let git_output = GitOutput::from_output(&output);

    if output.status.success() {
        Ok(git_output)
    } else {
        let exit_code = output.status.code().unwrap_or(-1);
        let error_msg = if git_output.stderr.is_empty() {
            git_output.stdout.clone()
        } else {
            git_output.stderr.clone()
        };

        Err(BuilderError::Sync(format!(
            "git {} failed (exit code {}): {}",
            args.first().unwrap_or(&""),
            exit_code,
            error_msg
        )))
    }
}

/// Get the repository root directory using `git rev-parse --show-toplevel`.
///
/// Returns `None` when `dir` does not exist or is not inside a checkout.
pub fn repo_root<P: AsRef<Path>>(dir: P) -> Option<PathBuf> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return None;
    }

    run_git(dir, &["rev-parse", "--show-toplevel"])
        .ok()
        .map(|output| PathBuf::from(output.stdout))
}

/// Check whether `dir` is the top level of a git checkout.
///
/// A directory nested somewhere inside another checkout does not count.
pub fn is_checkout_root<P: AsRef<Path>>(dir: P) -> bool {
    let dir = dir.as_ref();
    let Some(root) = repo_root(dir) else {
        return false;
    };

    match (root.canonicalize(), dir.canonicalize()) {
        (Ok(root), Ok(dir)) => root == dir,
        _ => false,
    }
}

/// Get the configured URL of a remote, `None` if the remote does not exist.
pub fn remote_url<P: AsRef<Path>>(repo: P, remote: &str) -> Option<String> {
    run_git(repo, &["remote", "get-url", remote])
        .ok()
        .map(|output| output.stdout)
        .filter(|url| !url.is_empty())
}

/// Get the name of the checked-out branch.
pub fn current_branch<P: AsRef<Path>>(repo: P) -> Result<String> {
    let output = run_git(repo, &["rev-parse", "--abbrev-ref", "HEAD"])?;
    if output.stdout == "HEAD" {
        return Err(BuilderError::Sync(
            "working copy has a detached HEAD; configure a branch to pull".to_string(),
        ));
    }
    Ok(output.stdout)
}
