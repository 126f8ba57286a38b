//! pipesync: keep pipeline definitions in step with a pipeline registry.
//!
//! # Usage
//!
//! ```text
//! pipesync pipeline push <path> [group]
//! pipesync pipeline pull <path>
//! pipesync pipeline clone <name> <path>
//! pipesync pipeline delete <name>
//! pipesync pipeline diff <path>
//! pipesync history <pipeline> [--json]
//! pipesync artifacts <pipeline> <stage> <job> [--pipeline-run N] [--stage-run N]
//!                    [--artifact-path P] [--save FILE]
//! ```
//!
//! Global: `--loglevel`, `--host`, `--timeout`, `--report`. Connection
//! defaults come from `PIPESYNC_*` environment variables.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    artifacts::ArtifactsArgs, history::HistoryArgs, pipeline::PipelineCommand, GlobalArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "pipesync",
    version,
    about = "Synchronize pipeline definitions with a pipeline registry",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Push, pull, clone, delete or diff a pipeline definition.
    Pipeline {
        #[command(subcommand)]
        command: PipelineCommand,
    },

    /// Show the latest run counters of a pipeline and its stages.
    History(HistoryArgs),

    /// Download a build artifact.
    Artifacts(ArtifactsArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.global.init_tracing();
    match cli.command {
        Commands::Pipeline { command } => commands::pipeline::run(command, &cli.global),
        Commands::History(args) => args.run(&cli.global),
        Commands::Artifacts(args) => args.run(&cli.global),
    }
}
