//! Content-based hashing for run IDs.

use crate::ResultsResult;
use rt_project::schema::Case;
use sha2::{Digest, Sha256};

/// Run ID for a case and solver build. Any change to the case, including its
/// name, yields a new ID.
pub fn compute_run_id(case: &Case, solver_version: &str) -> ResultsResult<String> {
    let mut hasher = Sha256::new();

    let case_json = serde_json::to_string(case)?;
    hasher.update(case_json.as_bytes());

    hasher.update(solver_version.as_bytes());

    let result = hasher.finalize();
    Ok(format!("{:x}", result))
}
