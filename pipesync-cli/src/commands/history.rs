//! `pipesync history <pipeline>`: latest run counters.

use anyhow::{Context, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use pipesync_core::PipelineName;

use super::GlobalArgs;

/// Arguments for `pipesync history`.
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Pipeline name.
    pub pipeline: String,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct CounterRow {
    #[tabled(rename = "key")]
    key: String,
    #[tabled(rename = "latest run")]
    counter: u64,
}

impl HistoryArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let sync = global.synchronizer()?;
        let name = PipelineName::from(self.pipeline.as_str());
        let counters = sync
            .client()
            .history(&name)
            .with_context(|| format!("history lookup failed for '{name}'"))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&counters).context("failed to serialize counters")?
            );
            return Ok(());
        }

        let rows: Vec<CounterRow> = counters
            .iter()
            .map(|(key, counter)| CounterRow {
                key: key.clone(),
                counter: *counter,
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}
