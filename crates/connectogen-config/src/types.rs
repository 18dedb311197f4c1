// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `connectogen.toml`.

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectogenConfig {
    pub generation: GenerationConfig,
    pub sampling: SamplingConfig,
    pub logging: LoggingConfig,
}

/// Edge generation settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Global seed every substream is derived from
    pub seed: u64,
    /// Worker threads (0 = rayon default)
    pub workers: usize,
    /// Consecutive targets per partition for whole-network count splits
    pub partition_size: usize,
    /// Rows below which generation stays on the calling thread
    pub parallel_threshold: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            workers: 0,
            partition_size: 64,
            parallel_threshold: 256,
        }
    }
}

/// Parameter sampling settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Redraw budget for clipped distributions that do not set their own
    pub max_redraws: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self { max_redraws: 1000 }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `text` or `json`
    pub format: String,
    /// Directory for rolling log files (empty = console only)
    pub log_dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            log_dir: String::new(),
        }
    }
}
