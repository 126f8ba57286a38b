//! Subcommands and the options they share.

pub mod artifacts;
pub mod history;
pub mod pipeline;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use pipesync_core::ServerConfig;
use pipesync_sync::{emit, FileSink, PrintSink, ReportSink, SyncReport, Synchronizer};

/// Options accepted by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Log filter, e.g. `debug` or `pipesync_client=debug`. Falls back to
    /// `RUST_LOG`, then `info`.
    #[arg(long, global = true, value_name = "LEVEL")]
    pub loglevel: Option<String>,

    /// Registry host including scheme. Overrides `PIPESYNC_HOST`.
    #[arg(long, global = true, value_name = "URL")]
    pub host: Option<String>,

    /// Per-request timeout in seconds. Overrides `PIPESYNC_TIMEOUT`.
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Append a JSON report of the operation to this file (`-` for stdout).
    #[arg(long, global = true, value_name = "PATH")]
    pub report: Option<PathBuf>,
}

impl GlobalArgs {
    /// Install the log subscriber. Library crates log through `log`; the
    /// subscriber picks those records up too.
    pub fn init_tracing(&self) {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = match &self.loglevel {
            Some(level) => EnvFilter::new(level),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        };
        let _ = fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
    }

    pub fn server_config(&self) -> Result<ServerConfig> {
        let mut config = ServerConfig::from_env().context("invalid PIPESYNC_* configuration")?;
        if let Some(host) = &self.host {
            config = config.with_host(host.as_str()).context("invalid --host")?;
        }
        if let Some(secs) = self.timeout {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }

    pub fn synchronizer(&self) -> Result<Synchronizer> {
        Ok(Synchronizer::new(self.server_config()?))
    }

    /// Write `report` to the `--report` sink, if one was given.
    pub fn emit(&self, report: &SyncReport) -> Result<()> {
        let Some(target) = &self.report else {
            return Ok(());
        };
        let mut sink: Box<dyn ReportSink> = if target.as_os_str() == "-" {
            Box::new(PrintSink)
        } else {
            Box::new(FileSink::new(target.clone()))
        };
        emit(sink.as_mut(), report)
            .with_context(|| format!("failed to write report to {}", target.display()))
    }
}
