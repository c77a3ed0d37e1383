use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// User-configurable paths for document browsing and data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory the file browser opens in.
    /// Defaults to `~/Documents` (home directory when absent).
    #[serde(default = "default_browse_dir")]
    pub browse_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// How many prior turns are sent with each analysis query.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            browse_dir: default_browse_dir(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    300
}

fn default_browse_dir() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    let documents = home.join("Documents");
    if documents.is_dir() {
        documents
    } else {
        home
    }
}

fn default_history_window() -> usize {
    6
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            paths: PathsConfig::default(),
            analysis: AnalysisConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.backend.base_url.starts_with("http://"));
        assert_eq!(config.backend.request_timeout_secs, 300);
        assert_eq!(config.analysis.history_window, 6);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str("[backend]\nbase_url = \"http://10.0.0.2:9000\"\n")
            .unwrap();
        assert_eq!(config.backend.base_url, "http://10.0.0.2:9000");
        assert_eq!(config.analysis.history_window, 6);
    }
}
