// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Three tiers, later tiers win:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{validate_config, ConfigError, ConfigResult, ConnectogenConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "connectogen.toml";

/// Find the configuration file
///
/// Search order:
/// 1. `CONNECTOGEN_CONFIG_PATH` environment variable
/// 2. Current working directory: `./connectogen.toml`
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("CONNECTOGEN_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by CONNECTOGEN_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd.clone();
        for _ in 0..5 {
            if let Some(parent) = current.parent() {
                search_paths.push(parent.join(CONFIG_FILE_NAME));
                current = parent.to_path_buf();
            }
        }
    }

    if let Some(path) = search_paths.iter().find(|p| p.exists()) {
        return Ok(path.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet CONNECTOGEN_CONFIG_PATH to specify a custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if config file is not found, contains invalid TOML, or fails validation
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<ConnectogenConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: ConnectogenConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    validate_config(&config)?;
    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `CONNECTOGEN_SEED` -> `generation.seed`
/// - `CONNECTOGEN_WORKERS` -> `generation.workers`
/// - `CONNECTOGEN_PARTITION_SIZE` -> `generation.partition_size`
/// - `CONNECTOGEN_MAX_REDRAWS` -> `sampling.max_redraws`
/// - `CONNECTOGEN_LOG_LEVEL` -> `logging.level`
pub fn apply_environment_overrides(config: &mut ConnectogenConfig) {
    let vars: HashMap<String, String> = [
        ("seed", "CONNECTOGEN_SEED"),
        ("workers", "CONNECTOGEN_WORKERS"),
        ("partition_size", "CONNECTOGEN_PARTITION_SIZE"),
        ("max_redraws", "CONNECTOGEN_MAX_REDRAWS"),
        ("log_level", "CONNECTOGEN_LOG_LEVEL"),
    ]
    .into_iter()
    .filter_map(|(key, var)| env::var(var).ok().map(|value| (key.to_string(), value)))
    .collect();

    apply_cli_overrides(config, &vars);
}

/// Apply CLI argument overrides to configuration
///
/// Unparseable numeric values are ignored and the previous tier's value kept.
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - e.g. `{"seed": "42", "workers": "8"}`
pub fn apply_cli_overrides(config: &mut ConnectogenConfig, cli_args: &HashMap<String, String>) {
    if let Some(seed) = cli_args.get("seed").and_then(|v| v.parse::<u64>().ok()) {
        config.generation.seed = seed;
    }
    if let Some(workers) = cli_args.get("workers").and_then(|v| v.parse::<usize>().ok()) {
        config.generation.workers = workers;
    }
    if let Some(size) = cli_args
        .get("partition_size")
        .and_then(|v| v.parse::<usize>().ok())
    {
        config.generation.partition_size = size;
    }
    if let Some(redraws) = cli_args.get("max_redraws").and_then(|v| v.parse::<u32>().ok()) {
        config.sampling.max_redraws = redraws;
    }
    if let Some(level) = cli_args.get("log_level") {
        config.logging.level = level.to_lowercase();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_find_config_file_env_var() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("custom.toml");
        File::create(&config_path).unwrap();

        env::set_var("CONNECTOGEN_CONFIG_PATH", config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var("CONNECTOGEN_CONFIG_PATH");

        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    fn test_find_config_file_env_var_missing() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        env::set_var("CONNECTOGEN_CONFIG_PATH", "/definitely/not/here.toml");
        let result = find_config_file();
        env::remove_var("CONNECTOGEN_CONFIG_PATH");

        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_minimal_config() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        env::remove_var("CONNECTOGEN_SEED");
        env::remove_var("CONNECTOGEN_WORKERS");
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[generation]").unwrap();
        writeln!(file, "seed = 99").unwrap();
        writeln!(file, "workers = 4").unwrap();
        writeln!(file, "[sampling]").unwrap();
        writeln!(file, "max_redraws = 50").unwrap();

        let config = load_config(Some(&config_path), None).unwrap();

        assert_eq!(config.generation.seed, 99);
        assert_eq!(config.generation.workers, 4);
        assert_eq!(config.generation.partition_size, 64);
        assert_eq!(config.sampling.max_redraws, 50);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        env::remove_var("CONNECTOGEN_PARTITION_SIZE");
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[generation]").unwrap();
        writeln!(file, "partition_size = 0").unwrap();

        let result = load_config(Some(&config_path), None);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_environment_overrides() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let mut config = ConnectogenConfig::default();

        env::set_var("CONNECTOGEN_SEED", "31337");
        env::set_var("CONNECTOGEN_MAX_REDRAWS", "not-a-number");

        apply_environment_overrides(&mut config);

        env::remove_var("CONNECTOGEN_SEED");
        env::remove_var("CONNECTOGEN_MAX_REDRAWS");

        assert_eq!(config.generation.seed, 31337);
        assert_eq!(config.sampling.max_redraws, 1000);
    }

    #[test]
    fn test_override_precedence() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[generation]").unwrap();
        writeln!(file, "seed = 1").unwrap();
        writeln!(file, "workers = 1").unwrap();

        env::set_var("CONNECTOGEN_SEED", "2");
        env::set_var("CONNECTOGEN_WORKERS", "2");

        let mut cli_args = HashMap::new();
        cli_args.insert("seed".to_string(), "3".to_string());

        let config = load_config(Some(&config_path), Some(&cli_args)).unwrap();

        env::remove_var("CONNECTOGEN_SEED");
        env::remove_var("CONNECTOGEN_WORKERS");

        // CLI wins for seed, env wins for workers (no CLI override)
        assert_eq!(config.generation.seed, 3);
        assert_eq!(config.generation.workers, 2);
    }
}
