// storage/io.rs
// Low-level file operations for the storage engine

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::Path;

use crate::error::{FastDbError, Result};
use crate::log_warn;

/// Read a whole file, mapping "absent" to `NotFound`
pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>> {
    match fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(FastDbError::NotFound(format!(
            "{} does not exist",
            path.display()
        ))),
        Err(e) => Err(FastDbError::storage(path, e)),
    }
}

/// Create a directory and its parents; an existing directory is success
pub(crate) fn ensure_dir(path: &Path) -> Result<()> {
    match fs::create_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(e) => Err(FastDbError::storage(path, e)),
    }
}

/// Replace `target` with `data` so that readers see either the old or the
/// new content, never a mix.
///
/// Writes a uniquely named temporary sibling, optionally fsyncs it and
/// renames it over the target. Concurrent writers of the same target never
/// share a temporary file. On failure the temporary file is removed and the
/// target is left untouched.
pub(crate) fn write_atomic(target: &Path, data: &[u8], fsync: bool) -> Result<()> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let prefix = format!(
        ".{}.",
        target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    );

    let mut temp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| FastDbError::storage(dir, e))?;

    temp.write_all(data)
        .map_err(|e| FastDbError::storage(temp.path(), e))?;
    if fsync {
        temp.as_file()
            .sync_all()
            .map_err(|e| FastDbError::storage(temp.path(), e))?;
    }

    // Dropping the PersistError inside the map removes the temporary file
    temp.persist(target)
        .map_err(|e| FastDbError::storage(target, e.error))?;

    if fsync {
        sync_dir_best_effort(dir);
    }
    Ok(())
}

/// Sync the directory entry of a completed rename
///
/// The new snapshot is already in place at this point, so a failure is
/// logged rather than reported as a failed save.
fn sync_dir_best_effort(dir: &Path) {
    if let Err(e) = sync_dir(dir) {
        log_warn!("Snapshot renamed but directory sync failed: {}", e);
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| FastDbError::storage(dir, e))
}

// Directory handles cannot be fsynced on this platform; rename durability
// is left to the filesystem.
#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
