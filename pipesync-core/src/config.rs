//! Registry server configuration.
//!
//! A [`ServerConfig`] is built once by the caller and handed to every client
//! it constructs; nothing here is process-global.

use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_HOST: &str = "http://localhost";
pub const DEFAULT_PORT: u16 = 8153;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_API_PREFIX: &str = "/go";

/// Connection settings for the pipeline registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Scheme and host, e.g. `http://localhost`.
    pub host: String,
    pub port: u16,
    /// Basic-auth user; credentials are only sent when this is set.
    pub user: Option<String>,
    pub password: Option<String>,
    /// Upper bound on a single request, connect through body.
    pub timeout: Duration,
    /// Path prefix in front of `/api/...`, e.g. `/go`.
    pub api_prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            user: None,
            password: None,
            timeout: DEFAULT_TIMEOUT,
            api_prefix: DEFAULT_API_PREFIX.to_string(),
        }
    }
}

impl ServerConfig {
    /// Build a configuration from the process environment.
    ///
    /// Recognised variables:
    /// - `PIPESYNC_HOST` (default `http://localhost`)
    /// - `PIPESYNC_PORT` (default `8153`)
    /// - `PIPESYNC_USER`, `PIPESYNC_PASSWORD` (default: no credentials)
    /// - `PIPESYNC_TIMEOUT` (seconds, default `120`)
    /// - `PIPESYNC_API_PREFIX` (default `/go`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_env`] with an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(host) = get("PIPESYNC_HOST") {
            tracing::debug!("Retrieving value from PIPESYNC_HOST environment variable.");
            config = config.with_host(host)?;
        }

        if let Some(port) = get("PIPESYNC_PORT") {
            tracing::debug!("Retrieving value from PIPESYNC_PORT environment variable.");
            config.port = port.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "PIPESYNC_PORT",
                value: port.clone(),
                expected: "a TCP port number",
            })?;
        }

        config.user = get("PIPESYNC_USER");
        config.password = get("PIPESYNC_PASSWORD");

        if let Some(timeout) = get("PIPESYNC_TIMEOUT") {
            tracing::debug!("Retrieving value from PIPESYNC_TIMEOUT environment variable.");
            let secs: u64 = timeout.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "PIPESYNC_TIMEOUT",
                value: timeout.clone(),
                expected: "a whole number of seconds",
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        if let Some(prefix) = get("PIPESYNC_API_PREFIX") {
            config.api_prefix = normalize_prefix(&prefix);
        }

        Ok(config)
    }

    /// Override the host (scheme included).
    pub fn with_host(mut self, host: impl Into<String>) -> Result<Self, ConfigError> {
        let host = host.into();
        if !host.starts_with("http://") && !host.starts_with("https://") {
            return Err(ConfigError::InvalidHost(host));
        }
        self.host = host.trim_end_matches('/').to_string();
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    /// `host:port`, no trailing slash.
    pub fn base_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `<api_prefix>/api/<rest>`: the path part of a registry URL.
    pub fn api_path(&self, rest: &str) -> String {
        format!("{}/api/{}", self.api_prefix, rest.trim_start_matches('/'))
    }

    /// `<api_prefix>/<rest>`: for non-API resources such as artifact files.
    pub fn site_path(&self, rest: &str) -> String {
        format!("{}/{}", self.api_prefix, rest.trim_start_matches('/'))
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_environment_empty() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.base_url(), "http://localhost:8153");
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert!(config.user.is_none());
    }

    #[test]
    fn reads_all_variables() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("PIPESYNC_HOST", "https://ci.example.invalid/"),
            ("PIPESYNC_PORT", "8154"),
            ("PIPESYNC_USER", "admin"),
            ("PIPESYNC_PASSWORD", "secret"),
            ("PIPESYNC_TIMEOUT", "5"),
            ("PIPESYNC_API_PREFIX", "gocd/"),
        ]))
        .unwrap();
        assert_eq!(config.base_url(), "https://ci.example.invalid:8154");
        assert_eq!(config.user.as_deref(), Some("admin"));
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.api_path("admin/pipelines"), "/gocd/api/admin/pipelines");
    }

    #[test]
    fn invalid_port_is_rejected() {
        let err = ServerConfig::from_lookup(lookup(&[("PIPESYNC_PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "PIPESYNC_PORT", .. }));
    }

    #[test]
    fn invalid_timeout_is_rejected() {
        let err = ServerConfig::from_lookup(lookup(&[("PIPESYNC_TIMEOUT", "soon")])).unwrap_err();
        assert!(err.to_string().contains("PIPESYNC_TIMEOUT"));
    }

    #[test]
    fn host_without_scheme_is_rejected() {
        let err = ServerConfig::default().with_host("localhost").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidHost(_)));
    }

    #[test]
    fn paths_join_prefix() {
        let config = ServerConfig::default();
        assert_eq!(config.api_path("/pipelines/build/history"), "/go/api/pipelines/build/history");
        assert_eq!(config.site_path("files/build/1"), "/go/files/build/1");
    }
}
