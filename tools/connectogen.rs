// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Generate one connection from a network description and print a summary.
//!
//! ```text
//! connectogen --network net.json [--config connectogen.toml] [--seed N] [--workers N] [--debug-all]
//! ```
//!
//! The summary (edge counts, in/out-degree min/max/mean) goes to stdout as
//! JSON; logs go to stderr.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use tracing::{debug, info};

use connectogen::config::{
    apply_cli_overrides, apply_environment_overrides, find_config_file, load_config, validate_config,
    ConnectogenConfig,
};
use connectogen::connectivity::{Connection, Endpoints, GenerationOptions, RandomStream, RuleEngine};
use connectogen::network::{DegreeSummary, NetworkDescription};
use connectogen::observability::{debug_flags_help, init_logging, parse_debug_flags, LoggingSettings};

struct Args {
    network: PathBuf,
    config: Option<PathBuf>,
    overrides: HashMap<String, String>,
}

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: connectogen --network <file.json> [--config <file.toml>] [--seed N] [--workers N]\n\n\
         {}",
        debug_flags_help()
    );
    process::exit(2);
}

fn parse_args() -> Args {
    let mut network = None;
    let mut config = None;
    let mut overrides = HashMap::new();

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--network" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                network = Some(PathBuf::from(v));
            }
            "--config" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                config = Some(PathBuf::from(v));
            }
            "--seed" | "--workers" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                if v.parse::<u64>().is_err() {
                    eprintln!("{} expects a non-negative integer, got '{v}'", arg);
                    usage_and_exit();
                }
                overrides.insert(arg.trim_start_matches("--").to_string(), v);
            }
            "-h" | "--help" => usage_and_exit(),
            other if other.starts_with("--debug-") => {}
            other => {
                eprintln!("Unknown argument: {other}");
                usage_and_exit();
            }
        }
    }

    let network = network.unwrap_or_else(|| {
        eprintln!("--network is required");
        usage_and_exit()
    });
    Args {
        network,
        config,
        overrides,
    }
}

/// Explicit file, then the usual search path, then built-in defaults
fn resolve_config(args: &Args) -> Result<ConnectogenConfig> {
    let path = match &args.config {
        Some(path) => Some(path.clone()),
        None => find_config_file().ok(),
    };
    match path {
        Some(path) => load_config(Some(&path), Some(&args.overrides))
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => {
            let mut config = ConnectogenConfig::default();
            apply_environment_overrides(&mut config);
            apply_cli_overrides(&mut config, &args.overrides);
            validate_config(&config).context("Invalid configuration")?;
            Ok(config)
        }
    }
}

fn main() {
    let args = parse_args();

    let raw = fs::read_to_string(&args.network).unwrap_or_else(|e| {
        eprintln!("Failed to read network file {}: {e}", args.network.display());
        process::exit(2);
    });
    let description = NetworkDescription::from_json(&raw).unwrap_or_else(|e| {
        eprintln!("Failed to parse network file {}: {e}", args.network.display());
        process::exit(2);
    });
    let (conn, endpoints) = description.build().unwrap_or_else(|e| {
        eprintln!("Invalid network file {}: {e}", args.network.display());
        process::exit(2);
    });

    if let Err(e) = run(&args, &conn, &endpoints) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(args: &Args, conn: &Connection, endpoints: &Endpoints) -> Result<()> {
    let config = resolve_config(args)?;
    let _guard = init_logging(&LoggingSettings::from(&config.logging), &parse_debug_flags())?;
    debug!(target: "connectogen", "Configuration: {:?}", config);

    let engine = RuleEngine::new(GenerationOptions::from_config(&config))?;
    let mut rng = RandomStream::from_source(&config);

    info!(
        target: "connectogen",
        "Generating {} from {}",
        conn.rule,
        args.network.display()
    );
    let edges = engine.generate(conn, endpoints, &mut rng)?;

    let summary = DegreeSummary::from_edges(conn.rule.name(), &edges, endpoints);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
