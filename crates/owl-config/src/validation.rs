// Copyright 2025 Owl Platform Contributors
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! This module provides validation logic to ensure configuration values are
//! present and within valid ranges.

use crate::{ConfigError, ConfigResult, SolverConfig};

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    InvalidPort { port_name: String, port: u16 },
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPort { port_name, port } => {
                write!(f, "Port {} = {} is not a usable TCP port", port_name, port)
            }
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// Checks for:
/// - Ports (0 is rejected)
/// - Required fields
/// - Valid value ranges and log level
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &SolverConfig) -> ConfigResult<()> {
    let errors = collect_errors(config);

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

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

fn collect_errors(config: &SolverConfig) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();
    validate_ports(config, &mut errors);
    validate_required_fields(config, &mut errors);
    validate_value_ranges(config, &mut errors);
    errors
}

fn validate_ports(config: &SolverConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.aggregator.port == 0 {
        errors.push(ConfigValidationError::InvalidPort {
            port_name: "aggregator.port".to_string(),
            port: 0,
        });
    }
    if config.world_model.port == 0 {
        errors.push(ConfigValidationError::InvalidPort {
            port_name: "world_model.port".to_string(),
            port: 0,
        });
    }
}

fn validate_required_fields(config: &SolverConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.aggregator.host.trim().is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "aggregator.host".to_string(),
        });
    }
    if config.world_model.host.trim().is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "world_model.host".to_string(),
        });
    }
    if config.solver.attribute_name.trim().is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "solver.attribute_name".to_string(),
        });
    }
}

fn validate_value_ranges(config: &SolverConfig, errors: &mut Vec<ConfigValidationError>) {
    if !config.solver.rssi_threshold.is_finite() {
        errors.push(ConfigValidationError::InvalidValue {
            field: "solver.rssi_threshold".to_string(),
            reason: "must be a finite number".to_string(),
        });
    }

    for (field, value) in [
        ("aggregator.connect_timeout_ms", config.aggregator.connect_timeout_ms),
        ("world_model.connect_timeout_ms", config.world_model.connect_timeout_ms),
        ("world_model.ready_timeout_ms", config.world_model.ready_timeout_ms),
        ("world_model.publish_timeout_ms", config.world_model.publish_timeout_ms),
    ] {
        if value == 0 {
            errors.push(ConfigValidationError::InvalidValue {
                field: field.to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
    }

    let level = config.logging.level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.level".to_string(),
            reason: format!("'{}' is not one of {}", config.logging.level, LOG_LEVELS.join(", ")),
        });
    }
}
