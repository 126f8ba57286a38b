//! `pipesync artifacts <pipeline> <stage> <job>`: download one artifact.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use pipesync_sync::{write_atomic, ArtifactRequest, RunSelector, DEFAULT_ARTIFACT_PATH};

use super::GlobalArgs;

/// Arguments for `pipesync artifacts`.
#[derive(Args, Debug)]
pub struct ArtifactsArgs {
    pub pipeline: String,
    pub stage: String,
    pub job: String,

    /// Pipeline run number. Defaults to the latest run.
    #[arg(long, value_name = "N")]
    pub pipeline_run: Option<String>,

    /// Stage run number. Defaults to the latest run.
    #[arg(long, value_name = "N")]
    pub stage_run: Option<String>,

    /// Path inside the job's artifacts.
    #[arg(long, default_value = DEFAULT_ARTIFACT_PATH)]
    pub artifact_path: String,

    /// Save to this file instead of printing to stdout.
    #[arg(long, value_name = "FILE")]
    pub save: Option<PathBuf>,
}

impl ArtifactsArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let sync = global.synchronizer()?;
        let request = ArtifactRequest::new(self.pipeline.as_str(), self.stage, self.job)
            .with_path(self.artifact_path)
            .with_runs(RunSelector {
                pipeline_run: self.pipeline_run,
                stage_run: self.stage_run,
            });

        let bytes = sync
            .fetch_artifact(&request)
            .with_context(|| format!("could not fetch {} of '{}'", request.path, request.pipeline))?;

        match self.save {
            Some(path) => {
                write_atomic(&path, &bytes)?;
                println!("✓ saved {} bytes to {}", bytes.len(), path.display());
            }
            None => {
                let mut out = std::io::stdout().lock();
                out.write_all(&bytes).context("failed to write artifact to stdout")?;
                out.flush()?;
            }
        }
        Ok(())
    }
}
