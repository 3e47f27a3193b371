// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::model::{AlgorithmKey, WindowTypeKey};

#[derive(Error, Debug)]
pub enum OrcaError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Processor unavailable: {0}")]
    ProcessorUnavailable(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Datalayer error: {0}")]
    Datalayer(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl OrcaError {
    /// Status label an RPC adapter reports for this error.
    pub fn status_code(&self) -> &'static str {
        match self {
            OrcaError::Validation(_) | OrcaError::ConfigError(_) | OrcaError::TomlError(_) => {
                "INVALID_ARGUMENT"
            }
            OrcaError::Conflict(_) => "ALREADY_EXISTS",
            OrcaError::Graph(_) => "FAILED_PRECONDITION",
            OrcaError::NotFound(_) => "NOT_FOUND",
            OrcaError::ProcessorUnavailable(_) | OrcaError::Transport(_) => "UNAVAILABLE",
            OrcaError::Datalayer(_) | OrcaError::IoError(_) | OrcaError::Other(_) => "INTERNAL",
        }
    }
}

/// Rejections produced while compiling the algorithm catalog.
///
/// Every variant names the offending edge so the caller can fix the
/// registration without guessing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("cycle detected in window type {window_type}: edge {from} -> {to} closes a cycle")]
    Cycle {
        window_type: WindowTypeKey,
        from: AlgorithmKey,
        to: AlgorithmKey,
    },

    #[error(
        "algorithm {algorithm} (window type {expected}) depends on {dependency} which is triggered by window type {found}"
    )]
    WindowTypeMismatch {
        algorithm: AlgorithmKey,
        dependency: AlgorithmKey,
        expected: WindowTypeKey,
        found: WindowTypeKey,
    },

    #[error("algorithm {algorithm} depends on {dependency} which processor '{processor}' does not provide")]
    UnresolvedDependency {
        algorithm: AlgorithmKey,
        dependency: AlgorithmKey,
        processor: String,
    },
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, OrcaError>;
