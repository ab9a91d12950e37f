use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

use crate::agent::DEFAULT_ENDPOINT;

pub const ENDPOINT_ENV_VAR: &str = "SHOPCHAT_ENDPOINT";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub endpoint: Option<String>,
    pub last_store_url: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn save_last_store_url(store_url: &str) -> Result<()> {
        let mut config = Self::load().unwrap_or_else(|_| Self::new());
        config.last_store_url = Some(store_url.to_string());
        config.save()
    }

    /// Explicit override first, then the environment, then the config file.
    pub fn resolve_endpoint(&self, cli_endpoint: Option<&str>) -> String {
        cli_endpoint
            .map(str::to_string)
            .or_else(|| std::env::var(ENDPOINT_ENV_VAR).ok().filter(|v| !v.is_empty()))
            .or_else(|| self.endpoint.clone())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
    }

    pub fn resolve_store_url(&self, cli_store: Option<&str>) -> String {
        cli_store
            .map(str::to_string)
            .or_else(|| self.last_store_url.clone())
            .unwrap_or_default()
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("shopchat").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            endpoint: Some("http://agent.internal:8080/api/chat".to_string()),
            last_store_url: Some("shop.example.com".to_string()),
        };

        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_cli_endpoint_wins() {
        let config = Config {
            endpoint: Some("http://from-config/api/chat".to_string()),
            last_store_url: None,
        };
        assert_eq!(
            config.resolve_endpoint(Some("http://from-cli/api/chat")),
            "http://from-cli/api/chat"
        );
    }

    // The only test that touches the process environment
    #[test]
    fn test_env_endpoint_sits_between_cli_and_file() {
        let config = Config {
            endpoint: Some("http://from-config/api/chat".to_string()),
            last_store_url: None,
        };

        std::env::set_var(ENDPOINT_ENV_VAR, "http://from-env/api/chat");
        let from_env = config.resolve_endpoint(None);
        let from_cli = config.resolve_endpoint(Some("http://from-cli/api/chat"));
        let default_with_env = Config::new().resolve_endpoint(None);

        std::env::set_var(ENDPOINT_ENV_VAR, "");
        let empty_env = config.resolve_endpoint(None);
        let empty_env_default = Config::new().resolve_endpoint(None);
        std::env::remove_var(ENDPOINT_ENV_VAR);

        assert_eq!(from_env, "http://from-env/api/chat");
        assert_eq!(from_cli, "http://from-cli/api/chat");
        assert_eq!(default_with_env, "http://from-env/api/chat");
        assert_eq!(empty_env, "http://from-config/api/chat");
        assert_eq!(empty_env_default, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_store_url_falls_back_to_last_used() {
        let config = Config {
            endpoint: None,
            last_store_url: Some("remembered.example.com".to_string()),
        };
        assert_eq!(config.resolve_store_url(None), "remembered.example.com");
        assert_eq!(config.resolve_store_url(Some("given.example.com")), "given.example.com");
        assert_eq!(Config::new().resolve_store_url(None), "");
    }
}
