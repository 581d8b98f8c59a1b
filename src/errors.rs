// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GradflowError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unknown buffer: {0}")]
    UnknownBuffer(String),

    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    #[error("Cycle detected in operator graph: {0}")]
    DagCycle(String),

    /// An operator's declared inputs and outputs disagree on shape.
    ///
    /// This is a graph-construction bug on the caller side and is fatal for
    /// the pass that observes it.
    #[error("Shape mismatch in operator '{op}': {detail}")]
    ShapeMismatch { op: String, detail: String },

    #[error("Pass aborted: {0}")]
    PassAborted(String),

    #[error("Worker pool error: {0}")]
    Pool(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GradflowError {
    pub fn shape_mismatch(op: impl Into<String>, detail: impl Into<String>) -> Self {
        GradflowError::ShapeMismatch {
            op: op.into(),
            detail: detail.into(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, GradflowError>;
