//! Error types for solver oracle operations.

use rt_core::RtError;
use thiserror::Error;

/// Errors reported by a solver oracle or its adapters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    #[error("Solver diverged at iteration {iteration}: {what}")]
    Diverged { iteration: u64, what: String },

    #[error("Unknown monitor: {name}")]
    UnknownMonitor { name: String },

    #[error("Unknown stopping criterion: {name}")]
    UnknownFlag { name: String },

    #[error("Unknown field function: {name}")]
    UnknownField { name: String },

    #[error("Actuation field '{field}' does not hold a numeric literal: {definition:?}")]
    StaleActuation { field: String, definition: String },

    #[error("Numeric error: {0}")]
    Numeric(#[from] RtError),
}

pub type OracleResult<T> = Result<T, OracleError>;
