//! Error types for codegraph-symex
//!
//! Every internal invariant violation surfaces as a [`SymexError`]. The engine
//! catches these once at the top of an analysis and reports the analysis as
//! failed; infeasible paths are verdicts, not errors.

use thiserror::Error;

use crate::config::ConfigError;

/// Main error type for symbolic-execution operations
#[derive(Debug, Error)]
pub enum SymexError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A node was expected to carry an execution state but does not
    #[error("Missing state: {0}")]
    MissingState(String),

    /// A value or local could not be resolved
    #[error("Resolution error: {0}")]
    Resolution(String),

    /// Construct the symbolic domain does not model
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Two expressions of incompatible sorts were combined
    #[error("Sort mismatch: {0}")]
    SortMismatch(String),

    /// Interprocedural / control-flow graph lookup failed
    #[error("Graph error: {0}")]
    Graph(String),

    /// Return with a single frame and no usable call-site metadata
    #[error("Unbalanced return: {0}")]
    UnbalancedReturn(String),

    /// Two execution states could not be merged
    #[error("Merge error: {0}")]
    Merge(String),

    /// Solver backend failure
    #[error("Solver error: {0}")]
    Solver(String),
}

impl SymexError {
    pub fn resolution(msg: impl Into<String>) -> Self {
        SymexError::Resolution(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        SymexError::Unsupported(msg.into())
    }

    pub fn sort_mismatch(msg: impl Into<String>) -> Self {
        SymexError::SortMismatch(msg.into())
    }

    pub fn graph(msg: impl Into<String>) -> Self {
        SymexError::Graph(msg.into())
    }

    pub fn merge(msg: impl Into<String>) -> Self {
        SymexError::Merge(msg.into())
    }

    pub fn solver(msg: impl Into<String>) -> Self {
        SymexError::Solver(msg.into())
    }
}

/// Result type alias for symbolic-execution operations
pub type Result<T> = std::result::Result<T, SymexError>;
