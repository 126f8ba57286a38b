//! # pipesync-sync
//!
//! Keeps a local pipeline artifact and the registry in step.
//!
//! [`Synchronizer`] offers Push, Pull, Clone and Delete. Each one that can
//! change state first compares both sides and, on divergence, leaves
//! `<name>.local.bak.json` / `<name>.remote.bak.json` next to the artifact.
//! Results come back as a [`SyncReport`] that can be written to any
//! [`ReportSink`].

pub mod artifacts;
pub mod backup;
pub mod compare;
pub mod error;
pub mod orchestrator;
pub mod report;

pub use artifacts::{ArtifactRequest, RunSelector, DEFAULT_ARTIFACT_PATH};
pub use backup::{backup_paths, load_backup, write_atomic, write_pipeline, BackupPaths};
pub use compare::{compare, unified_diff, Comparison};
pub use error::SyncError;
pub use orchestrator::{DiffReport, Synchronizer};
pub use report::{emit, FileSink, PrintSink, ReportSink, SyncAction, SyncReport};
