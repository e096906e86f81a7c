//! Case loading, saving, and validation.

use std::path::Path;

use rt_project::schema::Case;

use crate::error::{AppError, AppResult};
use crate::runtime;

/// Short description of a case for listings.
#[derive(Debug, Clone)]
pub struct CaseSummary {
    pub name: String,
    pub target_pa: f64,
    pub max_steps: u64,
    pub residual_flags: usize,
    pub has_plant: bool,
}

/// Load a case from YAML or JSON, chosen by extension.
pub fn load_case(path: &Path) -> AppResult<Case> {
    if !path.exists() {
        return Err(AppError::CaseFileRead {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        });
    }
    Ok(rt_project::load_case(path)?)
}

/// Save a case; JSON for `.json` paths, YAML otherwise.
pub fn save_case(path: &Path, case: &Case) -> AppResult<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => rt_project::save_json(path, case)?,
        _ => rt_project::save_yaml(path, case)?,
    }
    Ok(())
}

/// Validate the case file and the runtime configuration built from it.
pub fn validate_case(case: &Case) -> AppResult<()> {
    rt_project::validate_case(case)?;
    let config = runtime::build_loop_config(case)?;
    config
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    Ok(())
}

pub fn summarize_case(case: &Case) -> CaseSummary {
    CaseSummary {
        name: case.name.clone(),
        target_pa: case.target.value_pa,
        max_steps: case.convergence.max_steps,
        residual_flags: case.convergence.residual_flags.len(),
        has_plant: case.plant.is_some(),
    }
}
