use crate::core::models::{DataPath, validate_server_url};
use serde::{Deserialize, Serialize};
use std::io;
use std::time::Duration;

/// Configuration for the indexing service connection and polling loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub version: u32,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            polling: PollingConfig::default(),
            version: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000".to_string(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval(),
        }
    }
}

fn default_request_timeout() -> u64 {
    10
}

fn default_poll_interval() -> u64 {
    2
}

impl IndexerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.polling.interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    pub fn validate(&self) -> io::Result<()> {
        validate_server_url(&self.server.url)?;

        if self.polling.interval_secs == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "poll_interval_secs must be at least 1",
            ));
        }
        if self.server.request_timeout_secs == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "request_timeout_secs must be at least 1",
            ));
        }

        Ok(())
    }
}

/// Service for loading and saving the TOML configuration
pub struct ConfigService;

impl ConfigService {
    /// Load the configuration, writing the defaults on first use.
    pub fn load_config(data_path: &DataPath) -> io::Result<IndexerConfig> {
        let config_path = data_path.config_path();
        if !config_path.exists() {
            let config = IndexerConfig::default();
            Self::save_config(&config, data_path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: IndexerConfig = toml::from_str(&content).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid config format: {e}"),
            )
        })?;
        Ok(config)
    }

    pub fn save_config(config: &IndexerConfig, data_path: &DataPath) -> io::Result<()> {
        let config_path = data_path.config_path();
        let toml_content = toml::to_string_pretty(config).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Failed to serialize config: {e}"),
            )
        })?;

        data_path.ensure_exists()?;
        std::fs::write(&config_path, toml_content)?;
        log::info!("Saved configuration to {}", config_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_data_path(dir: &TempDir) -> DataPath {
        DataPath {
            root: dir.path().to_path_buf(),
        }
    }

    #[test]
    fn test_load_config_writes_defaults_on_first_use() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let data_path = temp_data_path(&dir);

        let config = ConfigService::load_config(&data_path).expect("Should create defaults");
        assert_eq!(config.server.url, "http://localhost:8000");
        assert_eq!(config.polling.interval_secs, 2);
        assert_eq!(config.server.request_timeout_secs, 10);
        assert!(data_path.config_path().exists());
    }

    #[test]
    fn test_config_round_trip() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let data_path = temp_data_path(&dir);

        let mut config = IndexerConfig::default();
        config.server.url = "http://indexer.internal:9200".to_string();
        config.polling.interval_secs = 5;
        ConfigService::save_config(&config, &data_path).expect("Should save");

        let loaded = ConfigService::load_config(&data_path).expect("Should load");
        assert_eq!(loaded.server.url, "http://indexer.internal:9200");
        assert_eq!(loaded.polling.interval_secs, 5);
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = IndexerConfig::default();
        config.polling.interval_secs = 0;
        assert!(config.validate().is_err());

        config.polling.interval_secs = 2;
        config.server.url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_config_rejects_malformed_toml() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let data_path = temp_data_path(&dir);
        data_path.ensure_exists().expect("Should create dir");
        std::fs::write(data_path.config_path(), "server = \"oops").expect("Should write");

        let result = ConfigService::load_config(&data_path);
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::InvalidData);
    }
}
