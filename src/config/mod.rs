//! Configuration module

pub mod settings;

pub use settings::{
    LoggingConfig, RateLimitConfig, ServerConfig, Settings, StorageConfig, UpstreamConfig,
};
