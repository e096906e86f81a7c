//! Error types for the rt-app service layer.

use std::path::PathBuf;

/// Application error type that wraps errors from the backend crates.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Case error: {0}")]
    Case(String),

    #[error("Failed to read case file: {path}")]
    CaseFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Case validation failed: {0}")]
    Validation(String),

    #[error("Solver error: {0}")]
    Solver(String),

    #[error("Control run failed: {0}")]
    Simulation(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for rt-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<rt_project::ProjectError> for AppError {
    fn from(err: rt_project::ProjectError) -> Self {
        match err {
            rt_project::ProjectError::Validation(e) => AppError::Validation(e.to_string()),
            other => AppError::Case(other.to_string()),
        }
    }
}

impl From<rt_project::ValidationError> for AppError {
    fn from(err: rt_project::ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<rt_oracle::OracleError> for AppError {
    fn from(err: rt_oracle::OracleError) -> Self {
        AppError::Solver(err.to_string())
    }
}

impl From<rt_sim::SimError> for AppError {
    fn from(err: rt_sim::SimError) -> Self {
        AppError::Simulation(err.to_string())
    }
}

impl From<rt_results::ResultsError> for AppError {
    fn from(err: rt_results::ResultsError) -> Self {
        match err {
            rt_results::ResultsError::RunNotFound { run_id } => AppError::RunNotFound(run_id),
            other => AppError::Results(other.to_string()),
        }
    }
}
