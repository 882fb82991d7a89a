//! Inspection of the working directory and the resulting git operations.

use super::url::RepoUrl;
use crate::config::CloneSpec;
use crate::error::{BuilderError, Result};
use crate::git::{self, GitOutput};
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

const REMOTE: &str = "origin";

/// What the working directory currently holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalState {
    /// Directory absent or not the top level of a checkout.
    NoLocalCopy,
    /// Checkout whose `origin` equals the expected URL.
    Matches,
    /// Checkout whose `origin` differs from the expected URL or is missing.
    Mismatch,
}

impl LocalState {
    pub fn action(&self) -> SyncAction {
        match self {
            LocalState::NoLocalCopy => SyncAction::Clone,
            LocalState::Matches => SyncAction::Pull,
            LocalState::Mismatch => SyncAction::PurgeAndClone,
        }
    }
}

/// Synchronization step taken for a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// Fetch and fast-forward the existing checkout.
    Pull,
    /// Clone into a fresh directory.
    Clone,
    /// Delete the existing checkout, then clone.
    PurgeAndClone,
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncAction::Pull => "pull",
            SyncAction::Clone => "clone",
            SyncAction::PurgeAndClone => "purge-and-clone",
        };
        f.write_str(name)
    }
}

/// Classify the working directory against the expected repository URL.
///
/// The comparison is on the credentialed URL, the same form `clone`
/// records as `origin`. Local paths compare by the directory they resolve to.
pub fn inspect(work_dir: &Path, expected: &RepoUrl) -> LocalState {
    if !git::is_checkout_root(work_dir) {
        return LocalState::NoLocalCopy;
    }

    match git::remote_url(work_dir, REMOTE) {
        Some(found) if expected.matches_remote(&found) => LocalState::Matches,
        Some(found) => {
            debug!(
                "origin of {} is {}, expected {}",
                work_dir.display(),
                expected.redact(&found),
                expected
            );
            LocalState::Mismatch
        }
        None => {
            debug!("{} has no '{}' remote", work_dir.display(), REMOTE);
            LocalState::Mismatch
        }
    }
}

/// Bring the working copy at `work_dir` up to date with `spec`.
///
/// Returns the action that was carried out. Failures are fatal and never
/// retried; a purge already performed is not rolled back.
pub fn synchronize(work_dir: &Path, spec: &CloneSpec) -> Result<SyncAction> {
    let url = RepoUrl::from_spec(spec);
    if !url.has_credentials() && (spec.username.is_some() || spec.key.is_some()) {
        warn!("git credentials ignored: need both username and key and a scheme:// repository URL");
    }
    info!("Checking if the repository is already pulled ...");
    let action = inspect(work_dir, &url).action();

    match action {
        SyncAction::Pull => {
            info!("Repository found! Pulling it ...");
            pull(work_dir, spec.branch.as_deref(), &url)?;
        }
        SyncAction::Clone => {
            info!("Repository not found! Cloning {} ...", url);
            clone(work_dir, spec.branch.as_deref(), &url)?;
        }
        SyncAction::PurgeAndClone => {
            info!(
                "Working copy at {} belongs to another remote; re-cloning {} ...",
                work_dir.display(),
                url
            );
            purge(work_dir)?;
            clone(work_dir, spec.branch.as_deref(), &url)?;
        }
    }

    Ok(action)
}

/// Fetch `origin` and fast-forward the configured (or current) branch.
fn pull(work_dir: &Path, branch: Option<&str>, url: &RepoUrl) -> Result<()> {
    run(work_dir, &["fetch", REMOTE], url)?;

    // A configured branch is always checked out, which also recovers a
    // detached HEAD.
    let branch = match branch {
        Some(branch) => {
            debug!("checking out {}", branch);
            run(work_dir, &["checkout", branch], url)?;
            branch.to_string()
        }
        None => git::current_branch(work_dir)?,
    };

    let upstream = format!("{}/{}", REMOTE, branch);
    run(work_dir, &["merge", "--ff-only", &upstream], url)?;
    Ok(())
}

/// Clone into `work_dir`, replacing whatever non-checkout content is there.
fn clone(work_dir: &Path, branch: Option<&str>, url: &RepoUrl) -> Result<()> {
    if work_dir.exists() {
        purge(work_dir)?;
    }

    let parent = work_dir.parent().ok_or_else(|| {
        BuilderError::Sync(format!(
            "cannot clone into '{}': it has no parent directory",
            work_dir.display()
        ))
    })?;
    std::fs::create_dir_all(parent).map_err(|e| {
        BuilderError::Io(format!(
            "failed to create directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    // Relative local sources resolve against the invoking directory.
    let cwd = std::env::current_dir()
        .map_err(|e| BuilderError::Io(format!("failed to read current directory: {}", e)))?;
    let target = std::path::absolute(work_dir).map_err(|e| {
        BuilderError::Io(format!(
            "failed to resolve '{}': {}",
            work_dir.display(),
            e
        ))
    })?;
    let target = target.to_string_lossy();
    let mut args = vec!["clone"];
    if let Some(branch) = branch {
        args.extend(["--branch", branch]);
    }
    args.extend([url.as_str(), target.as_ref()]);

    run(&cwd, &args, url)?;
    info!("Cloned into {}", work_dir.display());
    Ok(())
}

/// Recursively delete the working directory.
fn purge(work_dir: &Path) -> Result<()> {
    debug!("removing {}", work_dir.display());
    std::fs::remove_dir_all(work_dir).map_err(|e| {
        BuilderError::Io(format!(
            "failed to remove working directory '{}': {}",
            work_dir.display(),
            e
        ))
    })
}

/// Run git, logging its output and scrubbing credentials from errors.
fn run(cwd: &Path, args: &[&str], url: &RepoUrl) -> Result<GitOutput> {
    match git::run_git(cwd, args) {
        Ok(output) => {
            for line in output.lines() {
                debug!("git: {}", url.redact(line));
            }
            Ok(output)
        }
        Err(BuilderError::Sync(msg)) => Err(BuilderError::Sync(url.redact(&msg))),
        Err(other) => Err(other),
    }
}
