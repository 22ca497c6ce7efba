// Copyright 2025 Owl Platform Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Owl - solver toolkit for the Owl sensing platform
//!
//! A solver subscribes to physical-layer samples from an aggregator, derives
//! attributes from them, and publishes those attributes to a world model.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! owl = "0.1"  # Default: solver library + TCP collaborators
//! ```
//!
//! ## Feature Flags
//!
//! - **`solver`** (default): lifecycle core, `NearbyDeriver`, TCP clients
//! - **`file-logging`**: JSON log files via `tracing-appender`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use owl::prelude::*;
//!
//! let config = load_config(None, None)?;
//! validate_config(&config)?;
//!
//! let deriver = NearbyDeriver::new(
//!     config.solver.attribute_name.clone(),
//!     config.solver.rssi_threshold,
//!     config.world_model.origin.clone(),
//! );
//! let mut solver = SolverLifecycle::over_tcp(
//!     SolverSettings::from_config(&config),
//!     deriver,
//!     ShutdownSignal::new(),
//! )?;
//! solver.connect()?;
//! let summary = solver.run()?;
//! println!("published {} attributes", summary.attributes_published);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: owl-config, owl-observability              │
//! │  (TOML/env/CLI configuration, tracing setup)            │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Core: owl-solver                                       │
//! │  (lifecycle, deriver, collaborator contracts)           │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  I/O: owl-solver::transport                             │
//! │  (aggregator + world-model TCP clients)                 │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## License
//!
//! Apache-2.0

pub use owl_config as config;
pub use owl_observability as observability;

#[cfg(feature = "solver")]
pub use owl_solver as solver;

/// Convenient re-exports
pub mod prelude {
    pub use crate::config::{load_config, validate_config, SolverConfig};
    pub use crate::observability::{init_logging, parse_debug_flags, CrateDebugFlags};

    #[cfg(feature = "solver")]
    pub use crate::solver::{
        Attribute, AttributeDeriver, AttributeSchema, FactSink, NearbyDeriver, Sample,
        SampleSource, ShutdownSignal, SolverError, SolverLifecycle, SolverSettings,
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_facade_imports() {
        // Just test that re-exports work
        use crate::prelude::*;
        let config = SolverConfig::default();
        assert!(validate_config(&config).is_ok());

        #[cfg(feature = "solver")]
        {
            let deriver = NearbyDeriver::default();
            assert_eq!(deriver.threshold(), -60.0);
        }
    }

    fn rust_sources(dir: &std::path::Path, found: &mut Vec<std::path::PathBuf>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                rust_sources(&path, found);
            } else if path.extension().map_or(false, |ext| ext == "rs") {
                found.push(path);
            }
        }
    }

    #[test]
    fn test_sources_carry_project_copyright() {
        let root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
        let mut sources = Vec::new();
        rust_sources(&root.join("src"), &mut sources);
        rust_sources(&root.join("crates"), &mut sources);
        assert!(!sources.is_empty());

        for path in sources {
            let text = std::fs::read_to_string(&path).unwrap();
            assert!(
                text.starts_with("// Copyright 2025 Owl Platform Contributors\n"),
                "{} lacks the project copyright header",
                path.display()
            );
        }
    }
}
