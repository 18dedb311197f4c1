// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging settings resolved from the loaded configuration

use std::path::PathBuf;

use connectogen_config::LoggingConfig;

/// Log format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Resolved logging settings
#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: String,
    pub format: LogFormat,
    /// Rolling file output directory, if any
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings::from(&LoggingConfig::default())
    }
}

impl From<&LoggingConfig> for LoggingSettings {
    fn from(config: &LoggingConfig) -> Self {
        let log_dir = if config.log_dir.trim().is_empty() {
            None
        } else {
            Some(PathBuf::from(&config.log_dir))
        };
        LoggingSettings {
            level: config.level.to_lowercase(),
            format: LogFormat::parse(&config.format),
            log_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let config = LoggingConfig {
            level: "DEBUG".to_string(),
            format: "json".to_string(),
            log_dir: "  ".to_string(),
        };
        let settings = LoggingSettings::from(&config);
        assert_eq!(settings.level, "debug");
        assert_eq!(settings.format, LogFormat::Json);
        assert!(settings.log_dir.is_none());
    }
}
