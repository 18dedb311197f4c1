// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Unified logging initialization
//!
//! Console output is always installed; a rolling JSON file layer is added
//! when a log directory is configured and the `file-logging` feature is on.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;
use crate::config::{LogFormat, LoggingSettings};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Keeps background log writers alive; logs flush when it is dropped
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
    log_dir: Option<PathBuf>,
}

impl LoggingGuard {
    /// Directory receiving log files, if file logging is active
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

/// Initialize the global subscriber
///
/// # Arguments
/// * `settings` - Level, format and optional file directory
/// * `debug_flags` - Per-crate debug overrides layered on top of the level
///
/// # Errors
///
/// Fails on an unparseable filter, an unwritable log directory, or when a
/// global subscriber is already installed.
pub fn init_logging(settings: &LoggingSettings, debug_flags: &CrateDebugFlags) -> Result<LoggingGuard> {
    let filter = debug_flags.to_filter_string(&settings.level);
    let make_filter = || {
        EnvFilter::try_new(&filter).with_context(|| format!("Invalid log filter: {}", filter))
    };

    let mut layers: Vec<BoxedLayer> = Vec::new();

    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);
    match settings.format {
        LogFormat::Text => layers.push(console.with_filter(make_filter()?).boxed()),
        LogFormat::Json => layers.push(console.json().with_filter(make_filter()?).boxed()),
    }

    #[cfg(feature = "file-logging")]
    let file_guard = match &settings.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "connectogen.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .json()
                .with_filter(make_filter()?)
                .boxed();
            layers.push(file_layer);
            Some(guard)
        }
        None => None,
    };

    Registry::default()
        .with(layers)
        .try_init()
        .context("Failed to install global tracing subscriber")?;

    #[cfg(not(feature = "file-logging"))]
    {
        if let Some(dir) = &settings.log_dir {
            tracing::warn!(
                target: "connectogen",
                "log_dir {} ignored: built without the file-logging feature",
                dir.display()
            );
        }
    }

    Ok(LoggingGuard {
        #[cfg(feature = "file-logging")]
        _file_guard: file_guard,
        log_dir: settings.log_dir.clone(),
    })
}

/// Initialize logging with default settings
pub fn init_logging_default(debug_flags: &CrateDebugFlags) -> Result<LoggingGuard> {
    init_logging(&LoggingSettings::default(), debug_flags)
}
