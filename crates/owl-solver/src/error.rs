// Copyright 2025 Owl Platform Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types for the Owl solver

use std::fmt;

/// Result type alias using SolverError
pub type Result<T> = std::result::Result<T, SolverError>;

/// Which external collaborator an error concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collaborator {
    Aggregator,
    WorldModel,
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collaborator::Aggregator => write!(f, "aggregator"),
            Collaborator::WorldModel => write!(f, "world model"),
        }
    }
}

/// Error types for the Owl solver
#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    /// A collaborator could not be reached within its bound
    #[error("Unable to connect to the {collaborator}: {reason}")]
    ConnectionFailed {
        collaborator: Collaborator,
        reason: String,
    },

    /// World model handshake did not complete in time
    #[error("World model was not ready after {0}ms")]
    ReadinessTimeout(u64),

    /// `connect()` was called on an already connected solver
    #[error("Solver already connected")]
    AlreadyConnected,

    /// `run()` was called before a successful `connect()`
    #[error("Solver not connected - call connect() first")]
    NotConnected,

    /// Publication of an attribute whose schema was never announced
    #[error("Attribute '{0}' was published without a prior schema announcement")]
    UnannouncedAttribute(String),

    /// Socket I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A write to the world model did not finish in time
    #[error("World model write did not complete within {0}ms")]
    WriteTimeout(u64),

    /// The shutdown signal fired while an operation was in flight
    #[error("Shutdown requested")]
    ShutdownRequested,

    /// Peer sent something that does not fit the message exchange
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Async runtime could not be created
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl SolverError {
    pub fn connection_failed(collaborator: Collaborator, reason: impl fmt::Display) -> Self {
        SolverError::ConnectionFailed {
            collaborator,
            reason: reason.to_string(),
        }
    }
}
