//! Marks loaded files as done
//!
//! A loaded file is renamed to the same name with a leading `.` in the same
//! directory. The default glob does not match dotfiles, so the next run skips
//! it; files that failed keep their name and are picked up again.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{LoadError, Result};

pub const DONE_MARKER: &str = ".";

/// Sibling path `path` is renamed to once loaded
pub fn done_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(DONE_MARKER);
    if let Some(file_name) = path.file_name() {
        name.push(file_name);
    }
    path.with_file_name(name)
}

/// Rename `path` to its done path
///
/// Source and target share a directory, so the rename is atomic on one
/// filesystem.
pub async fn mark_done(path: &Path) -> Result<PathBuf> {
    let target = done_path(path);

    tokio::fs::rename(path, &target)
        .await
        .map_err(|source| LoadError::Rename {
            path: path.to_path_buf(),
            source,
        })?;

    debug!(from = %path.display(), to = %target.display(), "Marked file as processed");
    Ok(target)
}
