//! Run-number resolution for artifact downloads.
//!
//! An explicit run number wins and must parse. Otherwise the latest
//! counters from run history are used. Pipeline and stage resolve
//! independently; the download fails if either stays unresolved.

use pipesync_client::ArtifactLocator;
use pipesync_core::{PipelineName, RunCounters};

use crate::error::SyncError;

pub const DEFAULT_ARTIFACT_PATH: &str = "cruise-output/console.log";

/// Which runs to take an artifact from. `None` means "latest".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSelector {
    pub pipeline_run: Option<String>,
    pub stage_run: Option<String>,
}

impl RunSelector {
    pub fn latest() -> Self {
        Self::default()
    }

    /// True when history has to be consulted for at least one counter.
    pub fn needs_history(&self) -> bool {
        self.pipeline_run.is_none() || self.stage_run.is_none()
    }
}

/// An artifact addressed by name, with runs still to be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRequest {
    pub pipeline: PipelineName,
    pub stage: String,
    pub job: String,
    pub path: String,
    pub runs: RunSelector,
}

impl ArtifactRequest {
    pub fn new(pipeline: impl Into<PipelineName>, stage: impl Into<String>, job: impl Into<String>) -> Self {
        Self {
            pipeline: pipeline.into(),
            stage: stage.into(),
            job: job.into(),
            path: DEFAULT_ARTIFACT_PATH.to_string(),
            runs: RunSelector::latest(),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_runs(mut self, runs: RunSelector) -> Self {
        self.runs = runs;
        self
    }

    /// Turn this request into fully-qualified coordinates.
    ///
    /// `counters` is the latest history, when it was fetched.
    pub fn resolve(&self, counters: Option<&RunCounters>) -> Result<ArtifactLocator, SyncError> {
        let pipeline_counter = resolve_run(
            self.runs.pipeline_run.as_deref(),
            counters.and_then(|c| c.pipeline(&self.pipeline.0)),
            "pipeline",
            &self.pipeline.0,
        )?;
        let stage_counter = resolve_run(
            self.runs.stage_run.as_deref(),
            counters.and_then(|c| c.stage(&self.stage)),
            "stage",
            &self.stage,
        )?;
        Ok(ArtifactLocator {
            pipeline: self.pipeline.clone(),
            pipeline_counter,
            stage: self.stage.clone(),
            stage_counter,
            job: self.job.clone(),
            path: self.path.clone(),
        })
    }
}

fn resolve_run(
    explicit: Option<&str>,
    latest: Option<u64>,
    scope: &'static str,
    name: &str,
) -> Result<u64, SyncError> {
    if let Some(value) = explicit {
        return value
            .trim()
            .parse()
            .map_err(|source| SyncError::InvalidRunNumber {
                value: value.to_string(),
                source,
            });
    }
    latest.ok_or_else(|| SyncError::RunNotFound {
        scope,
        name: name.to_string(),
    })
}
