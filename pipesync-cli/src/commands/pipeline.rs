//! `pipesync pipeline push|pull|clone|delete|diff`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;

use pipesync_core::{GroupName, PipelineName};
use pipesync_sync::{SyncAction, SyncReport};

use super::GlobalArgs;

/// Pipeline definition sync.
#[derive(Subcommand, Debug)]
pub enum PipelineCommand {
    /// Create or update the remote pipeline from a local file.
    Push(PushArgs),

    /// Replace a local file with the remote pipeline of the same name.
    Pull {
        /// Local pipeline file.
        path: PathBuf,
    },

    /// Write a remote pipeline to a new local file.
    Clone {
        /// Remote pipeline name.
        name: String,
        /// Destination file.
        path: PathBuf,
    },

    /// Detach a pipeline from its environment and delete it.
    Delete {
        /// Remote pipeline name.
        name: String,
    },

    /// Show how a local file differs from the remote pipeline.
    Diff {
        /// Local pipeline file.
        path: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct PushArgs {
    /// Local pipeline file.
    pub path: PathBuf,

    /// Pipeline group used when the pipeline has to be created.
    #[arg(default_value = "defaultGroup")]
    pub group: String,
}

pub fn run(cmd: PipelineCommand, global: &GlobalArgs) -> Result<()> {
    let sync = global.synchronizer()?;
    let report = match cmd {
        PipelineCommand::Push(args) => sync
            .push(&args.path, &GroupName::from(args.group))
            .with_context(|| format!("push failed for {}", args.path.display()))?,
        PipelineCommand::Pull { path } => sync
            .pull(&path)
            .with_context(|| format!("pull failed for {}", path.display()))?,
        PipelineCommand::Clone { name, path } => sync
            .clone_pipeline(&path, &PipelineName::from(name.as_str()))
            .with_context(|| format!("clone of '{name}' failed"))?,
        PipelineCommand::Delete { name } => sync
            .delete(&PipelineName::from(name.as_str()))
            .with_context(|| format!("delete of '{name}' failed"))?,
        PipelineCommand::Diff { path } => {
            let diff = sync
                .diff(&path)
                .with_context(|| format!("diff failed for {}", path.display()))?;
            if diff.in_sync() {
                println!("No differences for '{}'.", diff.pipeline);
            } else {
                print!("{}", diff.unified_diff);
                if !diff.unified_diff.ends_with('\n') {
                    println!();
                }
            }
            return Ok(());
        }
    };

    print_report(&report);
    global.emit(&report)
}

fn print_report(report: &SyncReport) {
    let verb = match report.action {
        SyncAction::Created | SyncAction::Updated => report.action.to_string().green(),
        SyncAction::Pulled | SyncAction::Cloned => report.action.to_string().cyan(),
        SyncAction::Deleted => report.action.to_string().red(),
    };
    println!("✓ '{}' {verb}", report.pipeline);

    if let Some(environment) = &report.detached_from {
        println!("  detached from environment '{environment}'");
    }
    if let Some(comparison) = report.comparison.as_ref().filter(|c| c.diverged) {
        println!("  {}", "local and remote differed".yellow());
        for backup in comparison.local_backup.iter().chain(&comparison.remote_backup) {
            println!("  ⤷  {}", backup.display());
        }
    }
}
