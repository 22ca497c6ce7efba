// Copyright 2025 Owl Platform Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Owl Solver
//!
//! A solver node for the Owl sensing platform. It subscribes to physical-layer
//! samples from an aggregator, derives one attribute per sample, and publishes
//! the result to a world model.
//!
//! The bundled [`NearbyDeriver`] marks a device `nearby` when its RSSI is
//! strictly above -60 dBm.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use owl_solver::{NearbyDeriver, ShutdownSignal, SolverLifecycle, SolverSettings};
//!
//! # fn main() -> owl_solver::Result<()> {
//! let settings = SolverSettings::new("localhost", 7008, "localhost", 7009);
//! let mut solver =
//!     SolverLifecycle::over_tcp(settings, NearbyDeriver::default(), ShutdownSignal::new())?;
//!
//! solver.connect()?;
//! let handle = solver.start()?;
//! let summary = handle.join().expect("solver thread panicked")?;
//! println!("processed {} samples", summary.samples_processed);
//! # Ok(())
//! # }
//! ```
//!
//! Custom collaborators plug in through [`SampleSource`] and [`FactSink`];
//! custom derivations through [`AttributeDeriver`].

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod attribute;
pub mod collaborators;
pub mod connection;
pub mod deriver;
pub mod error;
pub mod lifecycle;
pub mod sample;
pub mod subscription;
pub mod transport;

pub use attribute::{decode_bool, encode_bool, Attribute, AttributeSchema, SchemaSet};
pub use collaborators::{Connection, FactSink, SampleSource};
pub use connection::{ConnectionHandle, ConnectionState};
pub use deriver::{AttributeDeriver, NearbyDeriver};
pub use error::{Collaborator, Result, SolverError};
pub use lifecycle::{PublishMode, RunSummary, SolverLifecycle, SolverSettings, StopReason};
pub use sample::{DeviceId, PhysicalLayer, Sample};
pub use subscription::SubscriptionRule;
pub use transport::{RuntimeHost, ShutdownSignal, TcpFactSink, TcpSampleSource};
