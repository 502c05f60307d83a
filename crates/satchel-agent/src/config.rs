//! Agent configuration.

use satchel_cache::{PartitionKind, PartitionName};
use satchel_core::{Error, NotificationTemplate, Request, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Prefix of both partition names.
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// Version tag of both partitions. Bump on every incompatible change.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,
    /// Origin the application shell is served from.
    #[serde(default = "default_origin")]
    pub origin: Url,
    /// Origin of the backend REST API.
    #[serde(default = "default_api_origin")]
    pub api_origin: Url,
    /// Path prefix of backend API routes.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    /// Hosts treated as local development servers and never intercepted.
    #[serde(default = "default_dev_hosts")]
    pub dev_hosts: Vec<String>,
    /// Path prefix of bundled static assets.
    #[serde(default = "default_static_prefix")]
    pub static_prefix: String,
    /// App-shell paths cached at install, relative to `origin`.
    #[serde(default = "default_static_manifest")]
    pub static_manifest: Vec<String>,
    /// Backend path listing the caller's notifications, relative to `api_origin`.
    #[serde(default = "default_notifications_path")]
    pub notifications_path: String,
    /// Activate right after install instead of waiting for `SKIP_WAITING`.
    #[serde(default)]
    pub skip_waiting: bool,
    /// Template push payloads are merged over.
    #[serde(default)]
    pub notification: NotificationTemplate,
}

fn default_app_name() -> String {
    "satchel".to_string()
}

fn default_cache_version() -> String {
    "1.0.0".to_string()
}

fn default_origin() -> Url {
    Url::parse("https://app.example.org").expect("static URL is valid")
}

fn default_api_origin() -> Url {
    Url::parse("https://api.example.org").expect("static URL is valid")
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

fn default_dev_hosts() -> Vec<String> {
    vec!["localhost".to_string(), "127.0.0.1".to_string()]
}

fn default_static_prefix() -> String {
    "/static/".to_string()
}

fn default_static_manifest() -> Vec<String> {
    vec![
        "/".to_string(),
        "/index.html".to_string(),
        "/manifest.json".to_string(),
        "/favicon.ico".to_string(),
        "/android-chrome-192x192.png".to_string(),
    ]
}

fn default_notifications_path() -> String {
    "/api/events/my-notifications".to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            cache_version: default_cache_version(),
            origin: default_origin(),
            api_origin: default_api_origin(),
            api_prefix: default_api_prefix(),
            dev_hosts: default_dev_hosts(),
            static_prefix: default_static_prefix(),
            static_manifest: default_static_manifest(),
            notifications_path: default_notifications_path(),
            skip_waiting: false,
            notification: NotificationTemplate::default(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parse and validate YAML configuration.
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(contents)
            .map_err(|e| Error::Config(format!("Invalid agent configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        PartitionName::from_parts(&self.app_name, PartitionKind::Static, &self.cache_version)?;

        for (field, url) in [("origin", &self.origin), ("api_origin", &self.api_origin)] {
            if url.cannot_be_a_base() || url.host_str().is_none() {
                return Err(Error::Config(format!("{} must be an absolute http(s) URL", field)));
            }
        }
        for (field, prefix) in [
            ("api_prefix", &self.api_prefix),
            ("static_prefix", &self.static_prefix),
            ("notifications_path", &self.notifications_path),
        ] {
            if !prefix.starts_with('/') {
                return Err(Error::Config(format!("{} must start with '/'", field)));
            }
        }
        for path in &self.static_manifest {
            self.origin.join(path).map_err(|e| {
                Error::Config(format!("Invalid static manifest entry '{}': {}", path, e))
            })?;
        }
        Ok(())
    }

    pub fn static_cache_name(&self) -> String {
        format!("{}-static-v{}", self.app_name, self.cache_version)
    }

    pub fn dynamic_cache_name(&self) -> String {
        format!("{}-dynamic-v{}", self.app_name, self.cache_version)
    }

    /// GET requests for every static manifest entry.
    pub fn manifest_requests(&self) -> Result<Vec<Request>> {
        self.static_manifest
            .iter()
            .map(|path| -> Result<Request> { Ok(Request::get(self.origin.join(path)?)) })
            .collect()
    }

    /// The application root document.
    pub fn root_request(&self) -> Result<Request> {
        Ok(Request::get(self.origin.join("/")?))
    }

    pub fn notifications_url(&self) -> Result<Url> {
        Ok(self.api_origin.join(&self.notifications_path)?)
    }

    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.cache_version = version.into();
        self
    }

    pub fn with_origin(mut self, origin: Url) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_api(mut self, api_origin: Url, api_prefix: impl Into<String>) -> Self {
        self.api_origin = api_origin;
        self.api_prefix = api_prefix.into();
        self
    }

    pub fn with_manifest(mut self, paths: Vec<String>) -> Self {
        self.static_manifest = paths;
        self
    }

    pub fn with_skip_waiting(mut self, skip: bool) -> Self {
        self.skip_waiting = skip;
        self
    }
}
