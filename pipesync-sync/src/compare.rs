//! Divergence detection between the local artifact and the remote pipeline.
//!
//! When the two sides differ, each side's full content is written next to
//! the local artifact before anything else is mutated. Backups are
//! best-effort: a failed backup is logged and the sync carries on.

use std::path::{Path, PathBuf};

use serde::Serialize;
use similar::TextDiff;

use pipesync_core::{codec, Pipeline};

use crate::backup::{backup_paths, write_atomic, write_pipeline, ABSENT_BACKUP};
use crate::error::SyncError;

/// Outcome of comparing the local artifact with the remote pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Comparison {
    pub diverged: bool,
    /// Local side as it was at decision time, if a backup was written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_backup: Option<PathBuf>,
    /// Remote side as it was at decision time, if a backup was written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_backup: Option<PathBuf>,
}

/// Structural comparison of `local` and `remote`.
///
/// An absent remote counts as divergence; its backup holds JSON `null`,
/// which [`crate::load_backup`] reads back as `None`. `path` is the local artifact
/// the backups are named after.
pub fn compare(local: &Pipeline, remote: Option<&Pipeline>, path: &Path) -> Comparison {
    if remote == Some(local) {
        tracing::debug!("'{}' is identical locally and remotely", local.name);
        return Comparison::default();
    }

    tracing::warn!("'{}' differs between {} and the registry", local.name, path.display());
    if let Some(remote) = remote {
        if tracing::log_enabled!(tracing::Level::Debug) {
            match unified_diff(local, remote, path) {
                Ok(diff) => tracing::debug!("divergence for '{}':\n{diff}", local.name),
                Err(e) => tracing::debug!("could not render divergence: {e}"),
            }
        }
    }

    let paths = backup_paths(path);
    Comparison {
        diverged: true,
        local_backup: backup(&paths.local, Some(local), "local"),
        remote_backup: backup(&paths.remote, remote, "remote"),
    }
}

fn backup(path: &Path, pipeline: Option<&Pipeline>, side: &str) -> Option<PathBuf> {
    let written = match pipeline {
        Some(pipeline) => write_pipeline(path, pipeline),
        None => write_atomic(path, ABSENT_BACKUP),
    };
    match written {
        Ok(()) => {
            tracing::info!("{side} backup: {}", path.display());
            Some(path.to_path_buf())
        }
        Err(e) => {
            tracing::warn!("could not write {side} backup {}: {e}", path.display());
            None
        }
    }
}

/// Unified diff from the remote pipeline to the local one, i.e. what a push
/// would change. Empty when the two encode identically.
pub fn unified_diff(local: &Pipeline, remote: &Pipeline, path: &Path) -> Result<String, SyncError> {
    let old = codec::encode_string(remote)?;
    let new = codec::encode_string(local)?;
    if old == new {
        return Ok(String::new());
    }

    let old_header = format!("remote/{}", remote.name);
    let new_header = format!("local/{}", path.display());
    Ok(TextDiff::from_lines(&old, &new)
        .unified_diff()
        .header(&old_header, &new_header)
        .context_radius(3)
        .to_string())
}
