//! Sync orchestration: Push, Pull, Clone, Delete and the divergence diff.
//!
//! Every operation that may change either side compares first, so both
//! sides are preserved as backups before the mutation. Any error from a
//! mutating registry call aborts the operation and is returned as is; no
//! call is retried.

use std::path::Path;

use pipesync_client::{HttpTransport, RegistryClient, Transport};
use pipesync_core::{codec, ConcurrencyToken, GroupName, Pipeline, PipelineName, ServerConfig};

use crate::artifacts::ArtifactRequest;
use crate::backup::write_pipeline;
use crate::compare::{compare, unified_diff};
use crate::error::SyncError;
use crate::report::{SyncAction, SyncReport};

/// Divergence between a local artifact and its remote pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffReport {
    pub pipeline: PipelineName,
    /// Unified diff from remote to local; empty when in sync.
    pub unified_diff: String,
}

impl DiffReport {
    pub fn in_sync(&self) -> bool {
        self.unified_diff.is_empty()
    }
}

/// Keeps local pipeline artifacts and the registry in step.
#[derive(Debug)]
pub struct Synchronizer<T = HttpTransport> {
    client: RegistryClient<T>,
}

impl Synchronizer<HttpTransport> {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            client: RegistryClient::new(config),
        }
    }
}

impl<T: Transport> Synchronizer<T> {
    pub fn with_client(client: RegistryClient<T>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &RegistryClient<T> {
        &self.client
    }

    /// Remote token and pipeline. An empty token means the pipeline does
    /// not exist remotely.
    pub fn exist(&self, name: &PipelineName) -> Result<(ConcurrencyToken, Option<Pipeline>), SyncError> {
        Ok(match self.client.fetch(name)? {
            Some(fetched) => (fetched.token, Some(fetched.pipeline)),
            None => (ConcurrencyToken::default(), None),
        })
    }

    /// Publish the local artifact at `path`.
    ///
    /// Creates the pipeline in `group` when it does not exist remotely,
    /// otherwise overwrites it with a conditional update. No merge happens:
    /// the local artifact wins if the token is still current.
    pub fn push(&self, path: &Path, group: &GroupName) -> Result<SyncReport, SyncError> {
        let local = codec::load_at(path)?;
        let (token, remote) = self.exist(&local.name)?;
        let comparison = compare(&local, remote.as_ref(), path);

        let action = if token.is_empty() {
            self.client.create(group, &local)?;
            SyncAction::Created
        } else {
            self.client.update(&local, &token)?;
            SyncAction::Updated
        };

        Ok(SyncReport::new(local.name, action).with_comparison(comparison))
    }

    /// Replace the local artifact at `path` with the remote pipeline of the
    /// same name. The local content is read only for its name and for the
    /// pre-pull backup.
    pub fn pull(&self, path: &Path) -> Result<SyncReport, SyncError> {
        let local = codec::load_at(path)?;
        let remote = self.fetch_existing(&local.name)?;
        let comparison = compare(&local, Some(&remote), path);

        write_pipeline(path, &remote)?;
        tracing::info!("pulled pipeline '{}' into {}", remote.name, path.display());
        Ok(SyncReport::new(remote.name, SyncAction::Pulled).with_comparison(comparison))
    }

    /// Write remote pipeline `name` to `path`. The file need not exist; if
    /// it does and decodes, it is compared and backed up first.
    pub fn clone_pipeline(&self, path: &Path, name: &PipelineName) -> Result<SyncReport, SyncError> {
        let remote = self.fetch_existing(name)?;

        let comparison = if path.exists() {
            match codec::load_at(path) {
                Ok(previous) => Some(compare(&previous, Some(&remote), path)),
                Err(e) => {
                    tracing::warn!("overwriting unreadable {}: {e}", path.display());
                    None
                }
            }
        } else {
            None
        };

        write_pipeline(path, &remote)?;
        tracing::info!("cloned pipeline '{name}' into {}", path.display());
        let mut report = SyncReport::new(remote.name, SyncAction::Cloned);
        report.comparison = comparison;
        Ok(report)
    }

    /// Delete remote pipeline `name`, detaching it from its environment
    /// first.
    pub fn delete(&self, name: &PipelineName) -> Result<SyncReport, SyncError> {
        let outcome = self.client.delete(name)?;
        tracing::info!("deleted pipeline '{name}': {}", outcome.message);
        let mut report = SyncReport::new(outcome.pipeline, SyncAction::Deleted);
        report.detached_from = outcome.detached_from;
        Ok(report)
    }

    /// Unified diff between the local artifact at `path` and the remote
    /// pipeline. Writes nothing.
    pub fn diff(&self, path: &Path) -> Result<DiffReport, SyncError> {
        let local = codec::load_at(path)?;
        let remote = self.fetch_existing(&local.name)?;
        Ok(DiffReport {
            unified_diff: unified_diff(&local, &remote, path)?,
            pipeline: local.name,
        })
    }

    /// Download one artifact, resolving missing run numbers from history.
    pub fn fetch_artifact(&self, request: &ArtifactRequest) -> Result<Vec<u8>, SyncError> {
        let counters = if request.runs.needs_history() {
            Some(self.client.history(&request.pipeline)?)
        } else {
            None
        };
        let locator = request.resolve(counters.as_ref())?;
        tracing::debug!("artifact {}", locator.relative_path());
        Ok(self.client.artifact(&locator)?)
    }

    fn fetch_existing(&self, name: &PipelineName) -> Result<Pipeline, SyncError> {
        self.client
            .fetch(name)?
            .map(|fetched| fetched.pipeline)
            .ok_or_else(|| SyncError::NotFound(name.clone()))
    }
}
