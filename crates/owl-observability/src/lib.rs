// Copyright 2025 Owl Platform Contributors
// SPDX-License-Identifier: Apache-2.0

//! # owl-observability
//!
//! Unified logging setup for Owl solver crates with per-crate debug flag support.
//!
//! ## Features
//! - `file-logging`: JSON log file per run, written through `tracing-appender`

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod init;

pub use cli::*;
pub use init::*;

/// Known crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &["owl-solver", "owl-config", "owl-observability"];

/// Map a crate name to the target `tracing` records it under (`owl-solver` -> `owl_solver`)
pub fn crate_target(crate_name: &str) -> String {
    crate_name.replace('-', "_")
}
