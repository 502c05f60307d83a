//! CLI configuration management.

use satchel_agent::AgentConfig;
use satchel_net::HttpNetworkConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CliConfig {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub network: HttpNetworkConfig,
    /// Cache partition root. Defaults to the platform cache directory.
    pub store: Option<PathBuf>,
}

impl CliConfig {
    /// Load from `path`, or from the default location if it exists.
    pub fn load(path: Option<&Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = Self::config_path()?;
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let content = std::fs::read_to_string(&path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = serde_yaml::from_str(content)?;
        config.agent.validate()?;
        Ok(config)
    }

    /// Get the configuration file path.
    pub fn config_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        let dirs = directories::ProjectDirs::from("school", "satchel", "satchel")
            .ok_or("Could not determine config directory")?;
        Ok(dirs.config_dir().join("satchel.yaml"))
    }

    /// Cache root: the command-line override, then the file, then the platform default.
    pub fn store_dir(&self, flag: Option<PathBuf>) -> Result<PathBuf, Box<dyn std::error::Error>> {
        flag.or_else(|| self.store.clone())
            .or_else(satchel_cache::FilesystemCacheStorage::default_root)
            .ok_or_else(|| "Could not determine cache directory".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = CliConfig::from_yaml_str(
            r#"
agent:
  app_name: campus
  cache_version: "2.1.0"
network:
  timeout_secs: 10
"#,
        )
        .unwrap();
        assert_eq!(config.agent.static_cache_name(), "campus-static-v2.1.0");
        assert_eq!(config.agent.api_prefix, "/api");
        assert_eq!(config.network.timeout_secs, Some(10));
        assert!(config.store.is_none());
    }

    #[test]
    fn test_invalid_agent_section_is_rejected() {
        let result = CliConfig::from_yaml_str("agent:\n  cache_version: latest\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_store_dir_precedence() {
        let config = CliConfig {
            store: Some(PathBuf::from("/var/cache/satchel")),
            ..CliConfig::default()
        };
        assert_eq!(
            config.store_dir(Some(PathBuf::from("/tmp/override"))).unwrap(),
            PathBuf::from("/tmp/override")
        );
        assert_eq!(
            config.store_dir(None).unwrap(),
            PathBuf::from("/var/cache/satchel")
        );
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("satchel.yaml");
        std::fs::write(&path, "agent:\n  skip_waiting: true\nstore: /srv/satchel\n").unwrap();

        let config = CliConfig::load(Some(&path)).unwrap();
        assert!(config.agent.skip_waiting);
        assert_eq!(config.store, Some(PathBuf::from("/srv/satchel")));
    }
}
