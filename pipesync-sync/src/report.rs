//! Sync reports and the sinks they are written to.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use pipesync_core::{EnvironmentName, PipelineName};

use crate::compare::Comparison;
use crate::error::SyncError;

// ---------------------------------------------------------------------------
// SyncReport
// ---------------------------------------------------------------------------

/// What a completed sync operation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    Created,
    Updated,
    Pulled,
    Cloned,
    Deleted,
}

impl std::fmt::Display for SyncAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SyncAction::Created => "created",
            SyncAction::Updated => "updated",
            SyncAction::Pulled => "pulled",
            SyncAction::Cloned => "cloned",
            SyncAction::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

/// Result of one Push, Pull, Clone or Delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub pipeline: PipelineName,
    pub action: SyncAction,
    /// Set when the operation compared local and remote state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<Comparison>,
    /// Environment the pipeline was detached from (delete only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detached_from: Option<EnvironmentName>,
    pub synced_at: DateTime<Utc>,
}

impl SyncReport {
    pub(crate) fn new(pipeline: PipelineName, action: SyncAction) -> Self {
        Self {
            pipeline,
            action,
            comparison: None,
            detached_from: None,
            synced_at: Utc::now(),
        }
    }

    pub(crate) fn with_comparison(mut self, comparison: Comparison) -> Self {
        self.comparison = Some(comparison);
        self
    }

    /// True when the comparison step found the two sides different.
    pub fn diverged(&self) -> bool {
        self.comparison.as_ref().is_some_and(|c| c.diverged)
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Somewhere diagnostic output can be written.
pub trait ReportSink {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;
}

/// Writes to standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrintSink;

impl ReportSink for PrintSink {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(bytes)?;
        out.flush()
    }
}

/// Appends to a file, creating it on first use.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl ReportSink for FileSink {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(bytes)
    }
}

impl ReportSink for Vec<u8> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

/// Write `report` to `sink` as one line of JSON.
pub fn emit(sink: &mut dyn ReportSink, report: &SyncReport) -> Result<(), SyncError> {
    let mut line = serde_json::to_vec(report)?;
    line.push(b'\n');
    sink.write(&line).map_err(SyncError::Report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn report_serializes_as_one_json_line() {
        let report = SyncReport::new("build".into(), SyncAction::Updated).with_comparison(Comparison {
            diverged: true,
            local_backup: Some(PathBuf::from("build.local.bak.json")),
            remote_backup: None,
        });
        let mut sink = Vec::new();
        emit(&mut sink, &report).unwrap();

        assert_eq!(sink.iter().filter(|b| **b == b'\n').count(), 1);
        let value: serde_json::Value = serde_json::from_slice(&sink).unwrap();
        assert_eq!(value["pipeline"], "build");
        assert_eq!(value["action"], "updated");
        assert_eq!(value["comparison"]["diverged"], true);
        assert_eq!(value["comparison"]["local_backup"], "build.local.bak.json");
        assert!(value["comparison"].get("remote_backup").is_none());
        assert!(value.get("detached_from").is_none());
        assert!(value["synced_at"].is_string());
    }

    #[test]
    fn file_sink_appends() {
        let tmp = TempDir::new().unwrap();
        let mut sink = FileSink::new(tmp.path().join("reports.jsonl"));
        emit(&mut sink, &SyncReport::new("a".into(), SyncAction::Pulled)).unwrap();
        emit(&mut sink, &SyncReport::new("b".into(), SyncAction::Deleted)).unwrap();

        let text = std::fs::read_to_string(sink.path()).unwrap();
        let actions: Vec<String> = text
            .lines()
            .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap()["action"].to_string())
            .collect();
        assert_eq!(actions, vec!["\"pulled\"", "\"deleted\""]);
    }

    #[test]
    fn diverged_reflects_comparison() {
        let plain = SyncReport::new("a".into(), SyncAction::Deleted);
        assert!(!plain.diverged());
        let diverged = plain.with_comparison(Comparison {
            diverged: true,
            ..Comparison::default()
        });
        assert!(diverged.diverged());
    }
}
