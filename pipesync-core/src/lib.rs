//! pipesync core library: pipeline document model, codec, server configuration.
//!
//! - [`types`]: newtypes, the pipeline envelope, environments, run history
//! - [`codec`]: lossless decode / encode of pipeline documents
//! - [`config`]: explicit [`ServerConfig`] passed to every client call
//! - [`error`]: [`CodecError`], [`ConfigError`]

pub mod codec;
pub mod config;
pub mod error;
pub mod types;

pub use config::ServerConfig;
pub use error::{CodecError, ConfigError};
pub use types::{
    ConcurrencyToken, Environment, EnvironmentList, EnvironmentName, EnvironmentVariable,
    GroupName, Pipeline, PipelineName, PipelineRef, RunCounters, RunEntry, RunHistory,
    StageCounter, StageRun,
};
