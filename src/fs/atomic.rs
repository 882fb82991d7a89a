//! Atomic writes of private files.
//!
//! Content is written to a temporary file in the target's directory, synced,
//! and renamed over the target, so a reader never observes a half-written
//! file. On Unix the temporary file is created with mode `0600` before any
//! content is written, so secrets are never world-readable, not even briefly.

use crate::error::{BuilderError, Result};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Atomically write `content` to `path`, readable only by the owner.
///
/// # Returns
///
/// * `Ok(())` - On successful atomic write
/// * `Err(BuilderError::Io)` - On create, write, or rename failure
pub fn atomic_write_private<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            BuilderError::Io(format!(
                "failed to create parent directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let temp_path = generate_temp_path(path)?;
    write_and_sync(&temp_path, content)?;
    atomic_replace(&temp_path, path)
}

/// Temporary file path in the same directory as the target: `.{filename}.tmp`.
fn generate_temp_path(target: &Path) -> Result<PathBuf> {
    let parent = target.parent().unwrap_or(Path::new("."));
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| BuilderError::Io(format!("invalid file path '{}'", target.display())))?;

    Ok(parent.join(format!(".{}.tmp", filename)))
}

fn open_private(path: &Path) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    // A stale temp file from a crashed run may carry wider permissions.
    let _ = fs::remove_file(path);

    let mut file = open_private(path).map_err(|e| {
        BuilderError::Io(format!(
            "failed to create temporary file '{}': {}",
            path.display(),
            e
        ))
    })?;

    file.write_all(content).map_err(|e| {
        let _ = fs::remove_file(path);
        BuilderError::Io(format!("failed to write to temporary file: {}", e))
    })?;

    file.sync_all().map_err(|e| {
        let _ = fs::remove_file(path);
        BuilderError::Io(format!("failed to sync temporary file to disk: {}", e))
    })?;

    Ok(())
}

fn atomic_replace(source: &Path, target: &Path) -> Result<()> {
    // rename() replaces an existing target atomically on POSIX; on Windows it
    // replaces as well since Rust uses MoveFileExW with MOVEFILE_REPLACE_EXISTING.
    fs::rename(source, target).map_err(|e| {
        let _ = fs::remove_file(source);
        BuilderError::Io(format!(
            "failed to atomically replace '{}': {}",
            target.display(),
            e
        ))
    })?;

    if let Some(parent) = target.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }

    Ok(())
}
