//! Configuration validation
//!
//! Ensures configuration values are within the ranges the engine accepts.

use crate::{ConfigError, ConfigResult, ConnectogenConfig};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["text", "json"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone)]
pub enum ConfigValidationError {
    OutOfRange { field: String, value: u64, min: u64 },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange { field, value, min } => {
                write!(f, "{} = {} is below the minimum of {}", field, value, min)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every failed check
pub fn validate_config(config: &ConnectogenConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_generation(config, &mut errors);
    validate_sampling(config, &mut errors);
    validate_logging(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn validate_generation(config: &ConnectogenConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.generation.partition_size == 0 {
        errors.push(ConfigValidationError::OutOfRange {
            field: "generation.partition_size".to_string(),
            value: 0,
            min: 1,
        });
    }
}

fn validate_sampling(config: &ConnectogenConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.sampling.max_redraws == 0 {
        errors.push(ConfigValidationError::OutOfRange {
            field: "sampling.max_redraws".to_string(),
            value: 0,
            min: 1,
        });
    }
}

fn validate_logging(config: &ConnectogenConfig, errors: &mut Vec<ConfigValidationError>) {
    let level = config.logging.level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.level".to_string(),
            reason: format!("'{}' is not one of {}", config.logging.level, LOG_LEVELS.join(", ")),
        });
    }
    if !LOG_FORMATS.contains(&config.logging.format.as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.format".to_string(),
            reason: format!("'{}' is not one of {}", config.logging.format, LOG_FORMATS.join(", ")),
        });
    }
}
