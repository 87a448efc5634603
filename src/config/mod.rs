//! Configuration management for bulkfetch
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use bulkfetch::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Writing to: {}", config.download.dest_dir.display());
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `BULKFETCH__<section>__<key>`
//!
//! Examples:
//! - `BULKFETCH__WORKERS__COUNT=16`
//! - `BULKFETCH__DOWNLOAD__DEST_DIR=/var/lib/images`
//! - `BULKFETCH__DOWNLOAD__MAX_DOCUMENT_BYTES=10MB`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/bulkfetch.toml`.
//! This can be overridden using the `BULKFETCH_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{Config, DownloadConfig, InputConfig, QueueConfig, WorkerConfig};
pub use validation::ValidationError;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("Failed to render configuration: {0}")]
    RenderError(#[from] toml::ser::Error),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`BULKFETCH__*`)
    /// 2. TOML file (default: `config/bulkfetch.toml`)
    /// 3. Default values
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(None)
    }

    /// Same as [`Config::load`], with an optional explicit file path that
    /// takes precedence over `BULKFETCH_CONFIG`.
    pub fn load_with(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = sources::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Re-check invariants, e.g. after CLI overrides were applied
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate(self)
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
