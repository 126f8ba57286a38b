//! # pipesync-client
//!
//! Synchronous client for a pipeline registry with ETag-based optimistic
//! concurrency.
//!
//! - [`transport`]: the [`Transport`] seam and its `ureq` implementation
//! - [`registry`]: fetch / create / conditional update / delete, environments
//! - [`history`]: latest run counters and artifact download
//!
//! ```no_run
//! use pipesync_client::RegistryClient;
//! use pipesync_core::{PipelineName, ServerConfig};
//!
//! let client = RegistryClient::new(ServerConfig::from_env()?);
//! match client.fetch(&PipelineName::from("build"))? {
//!     Some(fetched) => println!("remote version {}", fetched.token),
//!     None => println!("not on the server yet"),
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod history;
pub mod registry;
pub mod transport;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{ClientError, ConflictKind, Result, TransportError};
pub use history::{latest_counters, ArtifactLocator};
pub use registry::{find_environment_of, DeleteOutcome, Fetched, RegistryClient};
pub use transport::{HttpTransport, Method, Request, Response, Transport};
