// Copyright 2025 Owl Platform Contributors
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `owl_solver.toml`.

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SolverConfig {
    pub aggregator: AggregatorConfig,
    pub world_model: WorldModelConfig,
    pub solver: DerivationConfig,
    pub logging: LoggingConfig,
}

/// Aggregator (sample source) connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AggregatorConfig {
    pub host: String,
    pub port: u16,
    /// Bound on a single connection attempt
    pub connect_timeout_ms: u64,
}

impl AggregatorConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 7008,
            connect_timeout_ms: 10_000,
        }
    }
}

/// World model (fact sink) connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorldModelConfig {
    pub host: String,
    pub port: u16,
    /// Bound on a single connection attempt
    pub connect_timeout_ms: u64,
    /// Bound on the post-connect handshake
    pub ready_timeout_ms: u64,
    /// Bound on a single attribute write
    pub publish_timeout_ms: u64,
    /// Origin string attached to every attribute written by this solver
    pub origin: String,
}

impl WorldModelConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for WorldModelConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 7009,
            connect_timeout_ms: 10_000,
            ready_timeout_ms: 5_000,
            publish_timeout_ms: 5_000,
            origin: "Example Solver".to_string(),
        }
    }
}

/// Attribute derivation settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DerivationConfig {
    pub attribute_name: String,
    /// Samples with RSSI strictly above this value are "nearby"
    pub rssi_threshold: f32,
    /// When false, derived attributes are logged instead of published
    pub publish: bool,
}

impl Default for DerivationConfig {
    fn default() -> Self {
        Self {
            attribute_name: "nearby".to_string(),
            rssi_threshold: -60.0,
            publish: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
