// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # connectogen Configuration System
//!
//! Type-safe configuration loader for the connectivity engine with support for:
//! - TOML file parsing
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! ## Usage
//!
//! ```rust,no_run
//! use connectogen_config::{load_config, ConnectogenConfig};
//!
//! // Load configuration with automatic file discovery and overrides
//! let config = load_config(None, None).expect("Failed to load config");
//!
//! println!("Global seed: {}", config.generation.seed);
//! println!("Workers: {}", config.generation.workers);
//! ```
//!
//! Every engine default (seed, worker count, partition size, redraw budget)
//! lives in `connectogen.toml`; nothing is hardcoded at call sites.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(feature = "std")]
pub mod loader;

pub mod types;
pub mod validation;

#[cfg(feature = "std")]
pub use loader::{apply_cli_overrides, apply_environment_overrides, find_config_file, load_config};

pub use types::*;
pub use validation::{validate_config, ConfigValidationError};

/// Re-export for convenience
pub use serde;

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[cfg(feature = "std")]
    #[error("Config file not found. Searched: {0}")]
    FileNotFound(String),

    #[cfg(feature = "std")]
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[cfg(feature = "std")]
    #[error("Invalid TOML syntax: {0}")]
    ParseError(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

#[cfg(feature = "std")]
impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Anything able to hand the engine its process-wide global seed.
///
/// The seed's lifecycle is owned by the caller; the engine only reads it.
pub trait SeedSource {
    fn global_seed(&self) -> u64;
}

impl SeedSource for u64 {
    fn global_seed(&self) -> u64 {
        *self
    }
}

impl SeedSource for ConnectogenConfig {
    fn global_seed(&self) -> u64 {
        self.generation.seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_seed_source() {
        let mut config = ConnectogenConfig::default();
        config.generation.seed = 1234;
        assert_eq!(config.global_seed(), 1234);
        assert_eq!(99u64.global_seed(), 99);
    }
}
