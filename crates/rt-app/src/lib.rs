//! Shared application service layer for rotortune.
//!
//! Centralizes case management, run execution with caching, and result
//! queries so that frontends only deal with paths and summaries.

pub mod error;
pub mod progress;
pub mod project_service;
pub mod query;
pub mod run_service;
pub mod runtime;

pub use error::{AppError, AppResult};
pub use progress::{ControlProgress, RunProgressEvent, RunStage};
pub use project_service::{CaseSummary, load_case, save_case, summarize_case, validate_case};
pub use query::{RunSummary, actuation_series, output_series, run_summary};
pub use run_service::{
    RunOptions, RunRequest, RunResponse, ensure_run, ensure_run_with_progress, list_runs, load_run,
};
pub use runtime::{build_loop_config, build_surrogate};
