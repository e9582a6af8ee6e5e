//! Configuration management for PaperMind
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{APP_ENV}.toml, config/local.toml)
//! - Default values
//!
//! Every field has a default, so an empty environment yields a working
//! local setup (`papermind.db` next to the binary, `uploads/` for PDFs).

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// LLM provider configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Upload storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Study session tuning
    #[serde(default)]
    pub study: StudyConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// SQLite URL, e.g. `sqlite://papermind.db?mode=rwc` or `sqlite::memory:`
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Log every SQL statement at debug level
    #[serde(default)]
    pub sql_logging: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// LLM provider: openai (any OpenAI-compatible endpoint) or mock
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// API key; falls back to `OPENAI_API_KEY`
    pub api_key: Option<String>,

    /// API base URL (for custom or self-hosted endpoints)
    #[serde(default = "default_llm_api_base")]
    pub api_base: String,

    /// Model to use for extraction, chat and assessment
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Request timeout in seconds (document parsing is slow)
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Attempts for JSON-producing calls before surfacing the failure
    #[serde(default = "default_llm_attempts")]
    pub max_attempts: u32,

    /// Sampling temperature for extraction and assessment
    #[serde(default = "default_parse_temperature")]
    pub parse_temperature: f32,

    /// Sampling temperature for tutoring chat
    #[serde(default = "default_chat_temperature")]
    pub chat_temperature: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory where uploaded PDFs are kept
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StudyConfig {
    /// Examiner transcript length that triggers an automatic assessment
    #[serde(default = "default_assessment_threshold")]
    pub assessment_threshold: usize,

    /// Examiner transcript length required for a manual assessment
    #[serde(default = "default_manual_assessment_min")]
    pub manual_assessment_min: usize,

    /// Number of chats listed on overview screens
    #[serde(default = "default_recent_chats_limit")]
    pub recent_chats_limit: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logging: bool,

    /// Prometheus exporter port (0 to disable)
    #[serde(default)]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_database_url() -> String { "sqlite://papermind.db?mode=rwc".to_string() }
fn default_max_connections() -> u32 { 5 }
fn default_min_connections() -> u32 { 1 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_llm_provider() -> String { "openai".to_string() }
fn default_llm_api_base() -> String { "https://api.openai.com/v1".to_string() }
fn default_llm_model() -> String { crate::DEFAULT_LLM_MODEL.to_string() }
fn default_llm_timeout() -> u64 { 180 }
fn default_llm_attempts() -> u32 { 3 }
fn default_parse_temperature() -> f32 { 0.1 }
fn default_chat_temperature() -> f32 { 0.7 }
fn default_upload_dir() -> PathBuf { PathBuf::from("uploads") }
fn default_assessment_threshold() -> usize { 8 }
fn default_manual_assessment_min() -> usize { 2 }
fn default_recent_chats_limit() -> u64 { 20 }
fn default_log_level() -> String { "info".to_string() }
fn default_service_name() -> String { "papermind".to_string() }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__LLM__MODEL=gpt-4o
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }
}

impl DatabaseConfig {
    /// Private in-memory database, used by tests and dry runs
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Self::default()
        }
    }

    /// In-memory databases live inside a single connection
    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl LlmConfig {
    /// Configured key, or `OPENAI_API_KEY` from the environment
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl StorageConfig {
    /// Create the upload directory if needed
    pub fn ensure_upload_dir(&self) -> std::io::Result<&std::path::Path> {
        std::fs::create_dir_all(&self.upload_dir)?;
        Ok(&self.upload_dir)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            sql_logging: false,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            api_key: None,
            api_base: default_llm_api_base(),
            model: default_llm_model(),
            timeout_secs: default_llm_timeout(),
            max_attempts: default_llm_attempts(),
            parse_temperature: default_parse_temperature(),
            chat_temperature: default_chat_temperature(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
        }
    }
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            assessment_threshold: default_assessment_threshold(),
            manual_assessment_min: default_manual_assessment_min(),
            recent_chats_limit: default_recent_chats_limit(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: false,
            metrics_port: 0,
            service_name: default_service_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.max_attempts, 3);
        assert_eq!(config.study.assessment_threshold, 8);
        assert_eq!(config.study.manual_assessment_min, 2);
        assert_eq!(config.storage.upload_dir, PathBuf::from("uploads"));
    }

    #[test]
    fn test_in_memory_database() {
        let config = DatabaseConfig::in_memory();
        assert!(config.is_in_memory());
        assert_eq!(config.max_connections, 1);
        assert!(!DatabaseConfig::default().is_in_memory());
    }

    #[test]
    fn test_empty_sections_fall_back_to_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"llm": {"model": "gpt-4o"}}"#).unwrap();
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.database.url, "sqlite://papermind.db?mode=rwc");
    }

    #[test]
    fn test_blank_api_key_is_ignored() {
        let config = LlmConfig {
            api_key: Some("sk-test".to_string()),
            ..LlmConfig::default()
        };
        assert_eq!(config.resolved_api_key().as_deref(), Some("sk-test"));

        let blank = LlmConfig {
            api_key: Some("   ".to_string()),
            ..LlmConfig::default()
        };
        let from_env = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        assert_ne!(blank.resolved_api_key().as_deref(), Some("   "));
        assert_eq!(blank.resolved_api_key(), from_env);
    }
}
