// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # connectogen-observability
//!
//! Logging setup shared by every connectogen binary, with per-crate debug
//! flag support.
//!
//! ## Features
//! - `file-logging`: rolling JSON log files next to console output

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Tracing targets used across the workspace, one per crate
pub const KNOWN_CRATES: &[&str] = &[
    "connectogen",
    "connectogen-connectivity",
    "connectogen-config",
];
