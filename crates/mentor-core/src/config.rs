use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result, anyhow};

use crate::transcript::DEFAULT_GREETING;

/// Overrides `base_url` when set
pub const BASE_URL_ENV: &str = "TECH_MENTOR_URL";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub chat_path: String,
    pub feedback_path: String,
    pub greeting: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            chat_path: "/api/chat".to_string(),
            feedback_path: "/api/feedback".to_string(),
            greeting: None,
        }
    }

    /// Load from the user config dir, writing the defaults there on first run,
    /// then apply the env override.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        let mut config = Self::load_or_create(&config_path)?;

        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                config.base_url = url;
            }
        }

        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        Ok(config)
    }

    /// Like `load_from`, but a missing file is created with the defaults so
    /// there is something to edit.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load_from(path);
        }

        let config = Self::new();
        config
            .save_to(path)
            .with_context(|| format!("Failed to write default config {:?}", path))?;
        tracing::info!(path = ?path, "wrote default config");
        Ok(config)
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

    pub fn greeting(&self) -> &str {
        self.greeting.as_deref().unwrap_or(DEFAULT_GREETING)
    }

    pub fn chat_url(&self) -> String {
        join_url(&self.base_url, &self.chat_path)
    }

    pub fn feedback_url(&self) -> String {
        join_url(&self.base_url, &self.feedback_path)
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("tech-mentor").join("config.json"))
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
        assert_eq!(config.greeting(), DEFAULT_GREETING);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            base_url: "https://mentor.example".to_string(),
            greeting: Some("Hello there".to_string()),
            ..Config::new()
        };

        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();

        assert_eq!(loaded, config);
        assert_eq!(loaded.greeting(), "Hello there");
    }

    #[test]
    fn test_load_or_create_writes_defaults_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tech-mentor").join("config.json");

        let created = Config::load_or_create(&path).unwrap();
        assert_eq!(created, Config::new());
        assert!(path.exists());
        assert_eq!(Config::load_from(&path).unwrap(), created);

        fs::write(&path, r#"{"base_url": "http://10.0.0.2:8080"}"#).unwrap();
        let edited = Config::load_or_create(&path).unwrap();
        assert_eq!(edited.base_url, "http://10.0.0.2:8080");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"base_url": "http://10.0.0.2:8080"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.chat_url(), "http://10.0.0.2:8080/api/chat");
        assert_eq!(config.feedback_url(), "http://10.0.0.2:8080/api/feedback");
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_join_url_handles_slashes() {
        assert_eq!(join_url("http://a/", "/api/chat"), "http://a/api/chat");
        assert_eq!(join_url("http://a", "api/chat"), "http://a/api/chat");
    }
}
