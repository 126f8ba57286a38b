//! Run history and artifact retrieval.
//!
//! "Latest" is the first entry of the history response. The registry's
//! ordering is trusted; a later entry with a higher counter is logged but
//! does not change the result.

use pipesync_core::{codec, PipelineName, RunCounters, RunHistory};

use crate::error::{ClientError, Result};
use crate::registry::{unexpected, RegistryClient};
use crate::transport::{Method, Request, Transport};

pub const HISTORY_MEDIA_TYPE: &str = "application/vnd.go.cd.v1+json";

/// Fully-qualified coordinates of one build artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLocator {
    pub pipeline: PipelineName,
    pub pipeline_counter: u64,
    pub stage: String,
    pub stage_counter: u64,
    pub job: String,
    /// Path inside the job's artifact tree, e.g. `cruise-output/console.log`.
    pub path: String,
}

impl ArtifactLocator {
    /// `files/<pipeline>/<counter>/<stage>/<counter>/<job>/<path>`
    pub fn relative_path(&self) -> String {
        format!(
            "files/{}/{}/{}/{}/{}/{}",
            self.pipeline.0,
            self.pipeline_counter,
            self.stage,
            self.stage_counter,
            self.job,
            self.path.trim_start_matches('/'),
        )
    }
}

impl<T: Transport> RegistryClient<T> {
    /// Raw run history of `name`, most recent first.
    pub fn run_history(&self, name: &PipelineName) -> Result<RunHistory> {
        let path = self
            .config()
            .api_path(&format!("pipelines/{}/history", name.0));
        let request = Request::new(Method::Get, path.clone()).header("Accept", HISTORY_MEDIA_TYPE);
        let response = self.send(request)?;
        match response.status {
            404 => Err(ClientError::NotFound(name.clone())),
            s if (200..300).contains(&s) => Ok(codec::decode_json(&response.body)?),
            _ => Err(unexpected(Method::Get, path, &response)),
        }
    }

    /// Latest pipeline and stage counters for `name`.
    pub fn history(&self, name: &PipelineName) -> Result<RunCounters> {
        let history = self.run_history(name)?;
        latest_counters(name, &history)
    }

    /// Fetch one artifact by its coordinates. No counter resolution here.
    pub fn artifact(&self, locator: &ArtifactLocator) -> Result<Vec<u8>> {
        let path = self.config().site_path(&locator.relative_path());
        let response = self.send(Request::new(Method::Get, path.clone()))?;
        if !response.is_success() {
            return Err(unexpected(Method::Get, path, &response));
        }
        tracing::debug!("fetched {} bytes from {path}", response.body.len());
        Ok(response.body)
    }
}

/// Extract `p_<name>` and `s_<stage>` counters from the first history entry.
///
/// An empty history is an error; there is no zero default. A stage counter
/// that does not parse is an error too.
pub fn latest_counters(name: &PipelineName, history: &RunHistory) -> Result<RunCounters> {
    let Some(latest) = history.pipelines.first() else {
        return Err(ClientError::EmptyHistory(name.clone()));
    };

    if let Some(newer) = history
        .pipelines
        .iter()
        .skip(1)
        .find(|run| run.counter > latest.counter)
    {
        tracing::warn!(
            "history for '{name}' is not newest-first: run {} listed after run {}",
            newer.counter,
            latest.counter
        );
    }

    let mut counters = RunCounters::default();
    counters.insert_pipeline(&name.0, latest.counter);
    for stage in &latest.stages {
        let counter = stage
            .counter
            .parse()
            .map_err(|source| ClientError::InvalidCounter {
                pipeline: name.clone(),
                stage: stage.name.clone(),
                counter: stage.counter.to_string(),
                source,
            })?;
        counters.insert_stage(&stage.name, counter);
    }
    Ok(counters)
}
