//! Configuration management for the anime-enrich project.
//!
//! Non-secret settings are loaded from a TOML file with sensible defaults
//! for everything. Secrets (database URI, API keys, FTP credentials) come
//! from environment variables, optionally via a `.env` file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory settings
    pub data: DataConfig,

    /// Database settings
    pub database: DatabaseConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// AniList enrichment settings
    #[serde(default)]
    pub anilist: AniListConfig,

    /// OpenAI enrichment settings
    #[serde(default)]
    pub openai: OpenAiConfig,
}

/// Data directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Root data directory path
    pub root_dir: String,
}

/// Database configuration (the connection URI is a secret, see [`Secrets`])
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database name
    pub name: String,

    /// Collection holding the anime documents
    pub collection: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log directory path (relative to data directory or absolute)
    pub log_dir: String,

    /// Default log level (trace, debug, info, warn, error)
    pub default_level: String,

    /// Enable console output
    pub console: bool,

    /// Enable file output
    pub file: bool,

    /// Enable JSON formatting for file logs
    pub json_format: bool,
}

/// AniList enrichment settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AniListConfig {
    /// AniList GraphQL endpoint
    pub base_url: String,

    /// Character page size requested per query
    pub per_page: u32,

    /// Hard cap on pages fetched per media, even if the service keeps
    /// reporting another page
    pub max_pages: u32,

    /// Fixed delay between AniList calls in milliseconds
    pub request_delay_ms: u64,

    /// Titles shorter than this are marked not-found instead of searched
    pub min_title_len: usize,

    /// Maximum number of anime records fetched per run
    pub list_limit: u32,

    /// Flush the image upload queue every N anime
    pub upload_batch: usize,

    /// Fixed delay between FTP uploads in milliseconds
    pub upload_delay_ms: u64,
}

/// OpenAI enrichment settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API base URL
    pub base_url: String,

    /// Model used for metadata generation
    pub model: String,

    /// Fixed delay between API calls in milliseconds
    pub request_delay_ms: u64,
}

impl Default for AniListConfig {
    fn default() -> Self {
        Self {
            base_url: "https://graphql.anilist.co".to_string(),
            per_page: 25,
            max_pages: 50,
            request_delay_ms: 3000,
            min_title_len: 5,
            list_limit: 1_000_000,
            upload_batch: 15,
            upload_delay_ms: 1000,
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4.1".to_string(),
            request_delay_ms: 3000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig {
                root_dir: "data".to_string(),
            },
            database: DatabaseConfig {
                name: "animeSearch".to_string(),
                collection: "animes".to_string(),
            },
            logging: LoggingConfig {
                log_dir: "logs".to_string(),
                default_level: "info".to_string(),
                console: true,
                file: true,
                json_format: false,
            },
            anilist: AniListConfig::default(),
            openai: OpenAiConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// If the file doesn't exist, returns the default configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Get the absolute path for the data directory
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data.root_dir)
    }

    /// Directory holding pretty-printed JSON snapshots of API responses
    pub fn snapshot_dir(&self) -> PathBuf {
        self.data_dir().join("snapshots")
    }

    /// Directory holding downloaded images awaiting upload
    pub fn image_dir(&self) -> PathBuf {
        self.data_dir().join("images")
    }

    /// Get the absolute path for the log directory
    pub fn log_dir(&self) -> PathBuf {
        let log_path = Path::new(&self.logging.log_dir);
        if log_path.is_absolute() {
            log_path.to_path_buf()
        } else {
            self.data_dir().join(log_path)
        }
    }
}

/// Secrets loaded from the environment (optionally via `.env`).
///
/// Only the database URI is required everywhere; the other entries are
/// validated by the binary that needs them.
#[derive(Debug, Clone)]
pub struct Secrets {
    /// MongoDB connection URI (`DB_URI`)
    pub db_uri: String,

    /// OpenAI API key (`OPENAI_API_KEY`)
    pub openai_api_key: Option<String>,

    /// FTP credentials (`FTP_ADDR`, `FTP_USER`, `FTP_PASSWORD`)
    pub ftp: Option<FtpSecrets>,
}

/// FTP control-channel endpoint and credentials
#[derive(Debug, Clone)]
pub struct FtpSecrets {
    /// host:port of the FTP control channel
    pub addr: String,
    pub user: String,
    pub password: String,
}

impl Secrets {
    /// Load secrets from the environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        // A missing .env file is fine; real environment variables win.
        let _ = dotenvy::dotenv();

        let db_uri = std::env::var("DB_URI").context("DB_URI is not set")?;
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();

        let ftp = match std::env::var("FTP_ADDR") {
            Ok(addr) => Some(FtpSecrets {
                addr,
                user: std::env::var("FTP_USER").context("FTP_ADDR is set but FTP_USER is not")?,
                password: std::env::var("FTP_PASSWORD")
                    .context("FTP_ADDR is set but FTP_PASSWORD is not")?,
            }),
            Err(_) => None,
        };

        Ok(Self {
            db_uri,
            openai_api_key,
            ftp,
        })
    }

    /// FTP credentials, or an error when they were not configured
    pub fn require_ftp(&self) -> Result<&FtpSecrets> {
        self.ftp
            .as_ref()
            .context("FTP_ADDR/FTP_USER/FTP_PASSWORD are not set")
    }

    /// OpenAI API key, or an error when it was not configured
    pub fn require_openai_key(&self) -> Result<&str> {
        self.openai_api_key
            .as_deref()
            .context("OPENAI_API_KEY is not set")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.database.name, "animeSearch");
        assert_eq!(config.database.collection, "animes");
        assert_eq!(config.anilist.per_page, 25);
        assert_eq!(config.anilist.max_pages, 50);
        assert_eq!(config.anilist.upload_batch, 15);
        assert_eq!(config.openai.model, "gpt-4.1");
    }

    #[test]
    fn test_save_and_load_config() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.toml");

        let original_config = Config::default();
        original_config.save(&config_path)?;

        assert!(config_path.exists());

        let loaded_config = Config::from_file(&config_path)?;
        assert_eq!(loaded_config.data.root_dir, original_config.data.root_dir);
        assert_eq!(
            loaded_config.anilist.base_url,
            original_config.anilist.base_url
        );
        assert_eq!(
            loaded_config.anilist.request_delay_ms,
            original_config.anilist.request_delay_ms
        );

        Ok(())
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        // Should return default config without error
        assert_eq!(config.data.root_dir, "data");
    }

    #[test]
    fn test_path_resolution() {
        let config = Config::default();

        assert!(config.snapshot_dir().ends_with("data/snapshots"));
        assert!(config.image_dir().ends_with("data/images"));
        assert!(config.log_dir().ends_with("data/logs"));
    }
}
