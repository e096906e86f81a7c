//! Error types for the control loop driver.

use rt_controls::ControlError;
use rt_oracle::OracleError;
use thiserror::Error;

/// Errors that abort a control run.
///
/// None of these are recoverable inside the loop: solver iterations are
/// expensive and the loop never retries.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Warm-start stage {index} ({stage}) failed: {source}")]
    WarmStart {
        index: usize,
        stage: String,
        source: OracleError,
    },

    #[error("Solver error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Control configuration error: {0}")]
    Control(#[from] ControlError),
}

pub type SimResult<T> = Result<T, SimError>;
