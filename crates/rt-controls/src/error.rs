//! Error types for control operations.

use thiserror::Error;

/// Result type for control operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors raised when configuring control components.
///
/// Evaluating a configured law never fails for finite input.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    /// Invalid argument provided to a control function.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// Convergence criteria are inconsistent.
    #[error("Invalid convergence criteria: {what}")]
    InvalidCriteria { what: String },
}
