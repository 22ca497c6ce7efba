// Copyright 2025 Owl Platform Contributors
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base values; optional, defaults apply when absent)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{ConfigError, ConfigResult, SolverConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "owl_solver.toml";

/// Find the solver configuration file
///
/// Search order:
/// 1. `OWL_CONFIG_PATH` environment variable
/// 2. Current working directory: `./owl_solver.toml`
/// 3. Up to 5 parent directories
///
/// Returns `Ok(None)` when no file exists in any searched location.
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if `OWL_CONFIG_PATH` names a missing file
pub fn find_config_file() -> ConfigResult<Option<PathBuf>> {
    if let Ok(env_path) = env::var("OWL_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(Some(path));
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by OWL_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));

        let mut current = cwd;
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent.to_path_buf();
                }
                None => break,
            }
        }
    }

    Ok(search_paths.into_iter().find(|path| path.exists()))
}

/// Load configuration
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, the file is searched for
///   and defaults are used when none is found.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if an explicit file is missing, contains invalid TOML, or a CLI
/// override carries an unparseable value
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<SolverConfig> {
    let config_file = match config_path {
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file()?,
    };

    let mut config = match config_file {
        Some(path) => {
            let content = fs::read_to_string(&path)?;
            toml::from_str(&content)?
        }
        None => SolverConfig::default(),
    };

    apply_environment_overrides(&mut config);

    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli)?;
    }

    Ok(config)
}

/// Parse a TCP port, rejecting anything outside `1..=65535`
pub fn parse_port(value: &str) -> ConfigResult<u16> {
    match value.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(ConfigError::InvalidValue(format!(
            "Invalid port number: {}",
            value
        ))),
        Ok(port) => Ok(port),
    }
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `OWL_AGGREGATOR_HOST` -> `aggregator.host`
/// - `OWL_AGGREGATOR_PORT` -> `aggregator.port`
/// - `OWL_WORLD_MODEL_HOST` -> `world_model.host`
/// - `OWL_WORLD_MODEL_PORT` -> `world_model.port`
/// - `OWL_ORIGIN` -> `world_model.origin`
/// - `OWL_RSSI_THRESHOLD` -> `solver.rssi_threshold`
/// - `OWL_LOG_LEVEL` -> `logging.level`
///
/// Unparseable numeric values are ignored.
pub fn apply_environment_overrides(config: &mut SolverConfig) {
    if let Ok(value) = env::var("OWL_AGGREGATOR_HOST") {
        config.aggregator.host = value;
    }
    if let Ok(value) = env::var("OWL_AGGREGATOR_PORT") {
        if let Ok(port) = parse_port(&value) {
            config.aggregator.port = port;
        }
    }

    if let Ok(value) = env::var("OWL_WORLD_MODEL_HOST") {
        config.world_model.host = value;
    }
    if let Ok(value) = env::var("OWL_WORLD_MODEL_PORT") {
        if let Ok(port) = parse_port(&value) {
            config.world_model.port = port;
        }
    }
    if let Ok(value) = env::var("OWL_ORIGIN") {
        config.world_model.origin = value;
    }

    if let Ok(value) = env::var("OWL_RSSI_THRESHOLD") {
        if let Ok(threshold) = value.parse::<f32>() {
            config.solver.rssi_threshold = threshold;
        }
    }

    if let Ok(value) = env::var("OWL_LOG_LEVEL") {
        config.logging.level = value;
    }
}

/// Apply CLI argument overrides to configuration
///
/// Unlike environment overrides, a malformed port here is a startup error: the
/// operator typed it explicitly.
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - Map of CLI arguments (e.g., `{"aggregator_host": "10.0.0.1", "aggregator_port": "7008"}`)
pub fn apply_cli_overrides(
    config: &mut SolverConfig,
    cli_args: &HashMap<String, String>,
) -> ConfigResult<()> {
    if let Some(value) = cli_args.get("aggregator_host") {
        config.aggregator.host = value.clone();
    }
    if let Some(value) = cli_args.get("aggregator_port") {
        config.aggregator.port = parse_port(value)?;
    }

    if let Some(value) = cli_args.get("world_model_host") {
        config.world_model.host = value.clone();
    }
    if let Some(value) = cli_args.get("world_model_port") {
        config.world_model.port = parse_port(value)?;
    }
    if let Some(value) = cli_args.get("origin") {
        config.world_model.origin = value.clone();
    }

    if let Some(value) = cli_args.get("rssi_threshold") {
        config.solver.rssi_threshold = value.parse::<f32>().map_err(|_| {
            ConfigError::InvalidValue(format!("Invalid RSSI threshold: {}", value))
        })?;
    }
    if let Some(value) = cli_args.get("publish") {
        config.solver.publish = value.to_lowercase() == "true" || value == "1";
    }

    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.clone();
    }

    Ok(())
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
        let config_path = dir.path().join("custom_config.toml");
        File::create(&config_path).unwrap();

        env::set_var("OWL_CONFIG_PATH", config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var("OWL_CONFIG_PATH");

        assert_eq!(result.unwrap(), Some(config_path));
    }

    #[test]
    fn test_find_config_file_env_var_missing() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        env::set_var("OWL_CONFIG_PATH", "/definitely/not/here/owl_solver.toml");
        let result = find_config_file();
        env::remove_var("OWL_CONFIG_PATH");

        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_minimal_config() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        env::remove_var("OWL_AGGREGATOR_PORT");
        env::remove_var("OWL_RSSI_THRESHOLD");
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[aggregator]").unwrap();
        writeln!(file, "port = 9008").unwrap();
        writeln!(file, "[solver]").unwrap();
        writeln!(file, "rssi_threshold = -72.5").unwrap();

        let config = load_config(Some(&config_path), None).unwrap();

        assert_eq!(config.aggregator.port, 9008);
        assert_eq!(config.aggregator.host, "localhost");
        assert_eq!(config.solver.rssi_threshold, -72.5);
        assert_eq!(config.world_model.port, 7009);
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[aggregator").unwrap();

        let result = load_config(Some(&config_path), None);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_environment_overrides() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let mut config = SolverConfig::default();

        env::set_var("OWL_WORLD_MODEL_HOST", "192.168.1.100");
        env::set_var("OWL_WORLD_MODEL_PORT", "9999");
        env::set_var("OWL_AGGREGATOR_PORT", "not-a-port");

        apply_environment_overrides(&mut config);

        env::remove_var("OWL_WORLD_MODEL_HOST");
        env::remove_var("OWL_WORLD_MODEL_PORT");
        env::remove_var("OWL_AGGREGATOR_PORT");

        assert_eq!(config.world_model.host, "192.168.1.100");
        assert_eq!(config.world_model.port, 9999);
        assert_eq!(config.aggregator.port, 7008);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = SolverConfig::default();
        let mut cli_args = HashMap::new();
        cli_args.insert("aggregator_host".to_string(), "10.0.0.1".to_string());
        cli_args.insert("aggregator_port".to_string(), "7777".to_string());
        cli_args.insert("publish".to_string(), "false".to_string());

        apply_cli_overrides(&mut config, &cli_args).unwrap();

        assert_eq!(config.aggregator.host, "10.0.0.1");
        assert_eq!(config.aggregator.port, 7777);
        assert!(!config.solver.publish);
    }

    #[test]
    fn test_cli_override_rejects_malformed_port() {
        let mut config = SolverConfig::default();
        let mut cli_args = HashMap::new();
        cli_args.insert("world_model_port".to_string(), "70x9".to_string());

        let result = apply_cli_overrides(&mut config, &cli_args);
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_parse_port() {
        assert_eq!(parse_port("7008").unwrap(), 7008);
        assert_eq!(parse_port(" 65535 ").unwrap(), 65535);
        assert!(parse_port("0").is_err());
        assert!(parse_port("65536").is_err());
        assert!(parse_port("-1").is_err());
        assert!(parse_port("abc").is_err());
    }

    #[test]
    fn test_override_precedence() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        // CLI overrides take precedence over environment variables
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[aggregator]").unwrap();
        writeln!(file, "host = \"file-host\"").unwrap();
        writeln!(file, "port = 8000").unwrap();

        env::set_var("OWL_AGGREGATOR_HOST", "env-host");
        env::set_var("OWL_AGGREGATOR_PORT", "9000");

        let mut cli_args = HashMap::new();
        cli_args.insert("aggregator_host".to_string(), "cli-host".to_string());

        let config = load_config(Some(&config_path), Some(&cli_args)).unwrap();

        env::remove_var("OWL_AGGREGATOR_HOST");
        env::remove_var("OWL_AGGREGATOR_PORT");

        // CLI wins for host, env wins for port (no CLI override)
        assert_eq!(config.aggregator.host, "cli-host");
        assert_eq!(config.aggregator.port, 9000);
    }
}
