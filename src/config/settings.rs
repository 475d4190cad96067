//! Application settings and configuration management

use crate::error::{AppError, Result};
use config::{Config, Environment, File, Map};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub storage: StorageConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    7860
}

/// Remote generative API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Rotating credentials; empty means fallback-URL mode
    #[serde(default)]
    pub api_keys: Vec<String>,
    /// Single endpoint used when no credentials are configured
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub bearer_token: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash-image-preview".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl UpstreamConfig {
    /// True when the dispatcher has no way to reach the remote service
    pub fn is_unconfigured(&self) -> bool {
        self.api_keys.is_empty() && self.api_url.is_none()
    }
}

/// Storage configuration for uploaded and generated images
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
    #[serde(default = "default_result_dir")]
    pub result_dir: String,
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,
}

fn default_upload_dir() -> String {
    "/tmp/uploads".to_string()
}

fn default_result_dir() -> String {
    "/tmp/results".to_string()
}

fn default_url_prefix() -> String {
    "/user_content".to_string()
}

/// Rate limiting configuration for the generate endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_rps")]
    pub requests_per_second: u32,
    #[serde(default = "default_burst")]
    pub burst_size: u32,
}

fn default_true() -> bool {
    true
}

fn default_rps() -> u32 {
    2
}

fn default_burst() -> u32 {
    10
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

/// Split a comma-separated credential list, dropping blank entries
pub fn parse_credential_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

impl Settings {
    /// Load settings from configuration files and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/default.toml")
    }

    /// Load settings from a specific configuration file path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut settings = Self::layered(path, None)?;
        settings.apply_overrides(|name| std::env::var(name).ok());
        Ok(settings)
    }

    /// Defaults, then the config file, then `GALLERY__*` variables.
    ///
    /// `env` replaces the process environment when given.
    fn layered<P: AsRef<Path>>(path: P, env: Option<Map<String, String>>) -> Result<Self> {
        let config = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", 7860)?
            .set_default("upstream.base_url", default_base_url())?
            .set_default("upstream.model", default_model())?
            .set_default("upstream.timeout_secs", 60)?
            .set_default("storage.upload_dir", default_upload_dir())?
            .set_default("storage.result_dir", default_result_dir())?
            .set_default("storage.url_prefix", default_url_prefix())?
            .set_default("rate_limit.enabled", true)?
            .set_default("rate_limit.requests_per_second", 2)?
            .set_default("rate_limit.burst_size", 10)?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", default_log_format())?
            .add_source(File::with_name(path.as_ref().to_str().unwrap_or("config/default")).required(false))
            // Override with environment variables (prefixed with GALLERY__)
            .add_source(
                Environment::with_prefix("GALLERY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("upstream.api_keys")
                    .source(env),
            )
            .build()?;

        let mut settings: Settings = config.try_deserialize()?;
        settings.upstream.api_keys = settings
            .upstream
            .api_keys
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(String::from)
            .collect();
        Ok(settings)
    }

    /// Apply the plain `API_KEY` / `API_URL` / `API_BEARER_TOKEN` variables
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(keys) = lookup("API_KEY") {
            self.upstream.api_keys = parse_credential_list(&keys);
        }
        if let Some(url) = lookup("API_URL").filter(|u| !u.trim().is_empty()) {
            self.upstream.api_url = Some(url.trim().to_string());
        }
        if let Some(token) = lookup("API_BEARER_TOKEN").filter(|t| !t.trim().is_empty()) {
            self.upstream.bearer_token = Some(token.trim().to_string());
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(AppError::Config(config::ConfigError::Message(
                "Server port cannot be 0".to_string(),
            )));
        }

        if self.upstream.timeout_secs == 0 {
            return Err(AppError::Config(config::ConfigError::Message(
                "Upstream timeout must be greater than 0".to_string(),
            )));
        }

        if self.upstream.model.trim().is_empty() {
            return Err(AppError::Config(config::ConfigError::Message(
                "Upstream model cannot be empty".to_string(),
            )));
        }

        let prefix = self.storage.url_prefix.trim_end_matches('/');
        if !prefix.starts_with('/') || prefix.is_empty() {
            return Err(AppError::Config(config::ConfigError::Message(format!(
                "Storage URL prefix '{}' must be a non-root absolute path",
                self.storage.url_prefix
            ))));
        }

        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
            },
            upstream: UpstreamConfig {
                api_keys: vec![],
                api_url: None,
                bearer_token: None,
                base_url: default_base_url(),
                model: default_model(),
                timeout_secs: default_timeout_secs(),
            },
            storage: StorageConfig {
                upload_dir: default_upload_dir(),
                result_dir: default_result_dir(),
                url_prefix: default_url_prefix(),
            },
            rate_limit: RateLimitConfig {
                enabled: true,
                requests_per_second: default_rps(),
                burst_size: default_burst(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
                format: default_log_format(),
            },
        }
    }
}
