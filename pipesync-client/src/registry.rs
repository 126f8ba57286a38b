//! Pipeline registry client.
//!
//! Pipeline config and environment endpoints, plus the delete protocol:
//!
//! ```text
//! Start -> list environments -> [member of E] remove from E -> delete -> Done
//!                            -> [no member]                 -> delete -> Done
//! ```
//!
//! Membership must be cleared first: the registry refuses to delete a
//! pipeline an environment still references. A failed removal aborts before
//! the delete is attempted.

use serde::Serialize;
use serde_json::json;

use pipesync_core::{
    codec, ConcurrencyToken, Environment, EnvironmentList, EnvironmentName, GroupName, Pipeline,
    PipelineName, ServerConfig,
};

use crate::error::{ClientError, ConflictKind, Result};
use crate::transport::{HttpTransport, Method, Request, Response, Transport};

pub const PIPELINE_MEDIA_TYPE: &str = "application/vnd.go.cd.v4+json";
pub const ENVIRONMENT_MEDIA_TYPE: &str = "application/vnd.go.cd.v2+json";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// A remote pipeline together with the token that authorises updating it.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub pipeline: Pipeline,
    pub token: ConcurrencyToken,
}

/// What [`RegistryClient::delete`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub pipeline: PipelineName,
    /// Environment the pipeline was detached from before deletion, if any.
    pub detached_from: Option<EnvironmentName>,
    /// Confirmation text returned by the registry.
    pub message: String,
}

#[derive(Serialize)]
struct CreateBody<'a> {
    group: &'a GroupName,
    pipeline: &'a Pipeline,
}

/// Client for the pipeline registry, generic over its [`Transport`].
#[derive(Debug, Clone)]
pub struct RegistryClient<T = HttpTransport> {
    config: ServerConfig,
    transport: T,
}

impl RegistryClient<HttpTransport> {
    /// Client over a real HTTP transport built from `config`.
    pub fn new(config: ServerConfig) -> Self {
        let transport = HttpTransport::new(&config);
        Self { config, transport }
    }
}

impl<T: Transport> RegistryClient<T> {
    pub fn with_transport(config: ServerConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // -----------------------------------------------------------------------
    // Pipelines
    // -----------------------------------------------------------------------

    /// Fetch a pipeline and its concurrency token.
    ///
    /// A missing pipeline is `Ok(None)`, not an error.
    pub fn fetch(&self, name: &PipelineName) -> Result<Option<Fetched>> {
        let request = Request::new(Method::Get, self.pipeline_path(name))
            .header("Accept", PIPELINE_MEDIA_TYPE);
        let response = self.send(request)?;

        match response.status {
            404 => {
                tracing::debug!("pipeline '{name}' does not exist remotely");
                Ok(None)
            }
            s if (200..300).contains(&s) => {
                let token = response
                    .header("ETag")
                    .map(ConcurrencyToken::from)
                    .unwrap_or_default();
                if token.is_empty() {
                    return Err(ClientError::MissingToken(name.clone()));
                }
                let pipeline = codec::decode(&response.body)?;
                Ok(Some(Fetched { pipeline, token }))
            }
            _ => Err(unexpected(Method::Get, self.pipeline_path(name), &response)),
        }
    }

    /// Create `pipeline` in `group`. Only valid when no token exists.
    pub fn create(&self, group: &GroupName, pipeline: &Pipeline) -> Result<Pipeline> {
        let body = serde_json::to_vec(&CreateBody { group, pipeline })
            .map_err(pipesync_core::CodecError::from)?;
        let path = self.config.api_path("admin/pipelines");
        let request = Request::new(Method::Post, path.clone())
            .header("Accept", PIPELINE_MEDIA_TYPE)
            .header("Content-Type", JSON_CONTENT_TYPE)
            .body(body);
        let response = self.send(request)?;

        match response.status {
            s if (200..300).contains(&s) => {
                tracing::info!("created pipeline '{}' in group '{group}'", pipeline.name);
                Ok(codec::decode(&response.body)?)
            }
            409 => Err(conflict(&pipeline.name, ConflictKind::NameTaken, &response)),
            _ => Err(unexpected(Method::Post, path, &response)),
        }
    }

    /// Replace the remote pipeline, provided `token` is still current.
    ///
    /// A stale token is [`ClientError::Conflict`]; the caller decides
    /// whether to re-fetch and reapply.
    pub fn update(&self, pipeline: &Pipeline, token: &ConcurrencyToken) -> Result<Pipeline> {
        if token.is_empty() {
            return Err(ClientError::MissingToken(pipeline.name.clone()));
        }
        let path = self.pipeline_path(&pipeline.name);
        let request = Request::new(Method::Put, path.clone())
            .header("Accept", PIPELINE_MEDIA_TYPE)
            .header("Content-Type", JSON_CONTENT_TYPE)
            .header("If-Match", token.as_str())
            .body(codec::encode(pipeline)?);
        let response = self.send(request)?;

        match response.status {
            s if (200..300).contains(&s) => {
                tracing::info!("updated pipeline '{}'", pipeline.name);
                Ok(codec::decode(&response.body)?)
            }
            412 => Err(conflict(&pipeline.name, ConflictKind::StaleToken, &response)),
            _ => Err(unexpected(Method::Put, path, &response)),
        }
    }

    /// Delete the pipeline only, without touching environment membership.
    pub fn delete_pipeline(&self, name: &PipelineName) -> Result<String> {
        let path = self.pipeline_path(name);
        let request = Request::new(Method::Delete, path.clone()).header("Accept", PIPELINE_MEDIA_TYPE);
        let response = self.send(request)?;

        match response.status {
            s if (200..300).contains(&s) => {
                tracing::info!("deleted pipeline '{name}'");
                Ok(response.message())
            }
            404 => Err(ClientError::NotFound(name.clone())),
            _ => Err(unexpected(Method::Delete, path, &response)),
        }
    }

    // -----------------------------------------------------------------------
    // Environments
    // -----------------------------------------------------------------------

    pub fn environments(&self) -> Result<Vec<Environment>> {
        let path = self.config.api_path("admin/environments");
        let request = Request::new(Method::Get, path.clone()).header("Accept", ENVIRONMENT_MEDIA_TYPE);
        let response = self.send(request)?;
        if !response.is_success() {
            return Err(unexpected(Method::Get, path, &response));
        }
        let list: EnvironmentList = codec::decode_json(&response.body)?;
        Ok(list.into_environments())
    }

    /// Patch `environment` so its membership no longer lists `name`.
    pub fn remove_from_environment(
        &self,
        name: &PipelineName,
        environment: &EnvironmentName,
    ) -> Result<()> {
        let path = self
            .config
            .api_path(&format!("admin/environments/{}", environment.0));
        let body = serde_json::to_vec(&json!({ "pipelines": { "remove": [name] } }))
            .map_err(pipesync_core::CodecError::from)?;
        let request = Request::new(Method::Patch, path.clone())
            .header("Accept", ENVIRONMENT_MEDIA_TYPE)
            .header("Content-Type", JSON_CONTENT_TYPE)
            .body(body);
        let response = self.send(request)?;
        if !response.is_success() {
            return Err(unexpected(Method::Patch, path, &response));
        }
        tracing::info!("removed pipeline '{name}' from environment '{environment}'");
        Ok(())
    }

    /// Run the full delete protocol (see module docs).
    pub fn delete(&self, name: &PipelineName) -> Result<DeleteOutcome> {
        let environments = self.environments()?;

        let detached_from = match find_environment_of(&environments, name) {
            Some(environment) => {
                tracing::info!(
                    "Pipeline found in environment, removing from environment: {environment}"
                );
                if let Err(source) = self.remove_from_environment(name, &environment) {
                    tracing::info!("Environment not patched");
                    return Err(ClientError::Integrity {
                        pipeline: name.clone(),
                        environment,
                        source: Box::new(source),
                    });
                }
                Some(environment)
            }
            None => None,
        };

        let message = self.delete_pipeline(name).map_err(|source| match &detached_from {
            Some(environment) => ClientError::PartialDelete {
                pipeline: name.clone(),
                environment: environment.clone(),
                source: Box::new(source),
            },
            None => source,
        })?;

        Ok(DeleteOutcome {
            pipeline: name.clone(),
            detached_from,
            message,
        })
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    pub(crate) fn send(&self, request: Request) -> Result<Response> {
        Ok(self.transport.send(request)?)
    }

    fn pipeline_path(&self, name: &PipelineName) -> String {
        self.config.api_path(&format!("admin/pipelines/{}", name.0))
    }
}

/// Name of the first environment whose membership lists `name`.
pub fn find_environment_of(
    environments: &[Environment],
    name: &PipelineName,
) -> Option<EnvironmentName> {
    environments
        .iter()
        .find(|env| env.contains(name))
        .map(|env| env.name.clone())
}

pub(crate) fn unexpected(method: Method, path: String, response: &Response) -> ClientError {
    ClientError::UnexpectedStatus {
        method,
        path,
        status: response.status,
        message: response.message(),
    }
}

fn conflict(name: &PipelineName, kind: ConflictKind, response: &Response) -> ClientError {
    tracing::warn!("registry reported a conflict on '{name}': {kind}");
    ClientError::Conflict {
        pipeline: name.clone(),
        kind,
        status: response.status,
        message: response.message(),
    }
}
