//! Atomic local writes and backup file naming.
//!
//! ## `write_atomic`
//!
//! 1. Create the parent directory if needed.
//! 2. Write the full content to `<path>.pipesync.tmp`.
//! 3. Rename onto the final path (atomic on POSIX).
//! 4. On rename failure, remove the tmp file and leave the original intact.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use pipesync_core::{codec, Pipeline};

use crate::error::{io_err, SyncError};

pub const LOCAL_BACKUP_SUFFIX: &str = ".local.bak.json";
pub const REMOTE_BACKUP_SUFFIX: &str = ".remote.bak.json";

/// Backup content for a side that did not exist at decision time.
pub const ABSENT_BACKUP: &[u8] = b"null\n";

/// Where the two sides of a divergent comparison are preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupPaths {
    pub local: PathBuf,
    pub remote: PathBuf,
}

/// Backup paths for the artifact at `path`: the extension is dropped and
/// the backup suffix appended, so `ci/build.json` gives
/// `ci/build.local.bak.json` and `ci/build.remote.bak.json`.
pub fn backup_paths(path: &Path) -> BackupPaths {
    let stem = path.with_extension("");
    let with_suffix = |suffix: &str| {
        let mut name = OsString::from(stem.as_os_str());
        name.push(suffix);
        PathBuf::from(name)
    };
    BackupPaths {
        local: with_suffix(LOCAL_BACKUP_SUFFIX),
        remote: with_suffix(REMOTE_BACKUP_SUFFIX),
    }
}

/// Encode `pipeline` and write it atomically to `path`.
pub fn write_pipeline(path: &Path, pipeline: &Pipeline) -> Result<(), SyncError> {
    let bytes = codec::encode(pipeline)?;
    write_atomic(path, &bytes)
}

/// Read a backup file. `None` means that side did not exist when the
/// backup was taken.
pub fn load_backup(path: &Path) -> Result<Option<Pipeline>, SyncError> {
    let bytes = std::fs::read(path).map_err(|e| io_err(path, e))?;
    let pipeline: Option<Pipeline> = codec::decode_json(&bytes)?;
    Ok(pipeline)
}

/// Write `bytes` to `path` through a sibling tmp file and a rename, so a
/// failed write never truncates what is already there.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), SyncError> {
    write_atomic_with_tmp(path, bytes, &tmp_path(path))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".pipesync.tmp");
    PathBuf::from(name)
}

fn write_atomic_with_tmp(path: &Path, bytes: &[u8], tmp: &Path) -> Result<(), SyncError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }

    std::fs::write(tmp, bytes).map_err(|e| io_err(tmp, e))?;

    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }

    tracing::debug!("wrote: {}", path.display());
    Ok(())
}
