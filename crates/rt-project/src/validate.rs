//! Case validation logic.

use crate::schema::{
    ActuationDef, Case, ConvergenceDef, FluidDef, LATEST_VERSION, PlantDef, WarmStartDef,
};
use std::collections::HashSet;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate name: {name} in {context}")]
    DuplicateName { name: String, context: String },

    #[error("Missing value: {field}")]
    Missing { field: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

pub fn validate_case(case: &Case) -> Result<(), ValidationError> {
    if case.version == 0 || case.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: case.version,
        });
    }
    require_name("name", &case.name)?;
    require_name("target.monitor", &case.target.monitor)?;
    require_finite("target.value_pa", case.target.value_pa)?;

    validate_actuation(&case.actuation)?;
    validate_convergence(&case.convergence)?;
    validate_warm_start(&case.warm_start)?;
    validate_fluid(&case.fluid)?;
    if let Some(plant) = &case.plant {
        validate_plant(plant)?;
    }

    let mut seen = HashSet::new();
    for monitor in &case.monitors {
        require_name("monitors", monitor)?;
        if !seen.insert(monitor.as_str()) {
            return Err(ValidationError::DuplicateName {
                name: monitor.clone(),
                context: "monitors".to_string(),
            });
        }
    }
    Ok(())
}

fn validate_actuation(def: &ActuationDef) -> Result<(), ValidationError> {
    require_name("actuation.field", &def.field)?;
    if let Some(initial) = def.initial_rad_s {
        require_finite("actuation.initial_rad_s", initial)?;
    }
    require_positive("actuation.max_step_rad_s", def.max_step_rad_s)?;
    require_positive("actuation.damping", def.damping)?;
    if def.damping > 1.0 {
        return Err(invalid("actuation.damping", def.damping, "must not exceed 1"));
    }
    require_finite(
        "actuation.reverse_increment_rad_s",
        def.reverse_increment_rad_s,
    )?;
    require_count("actuation.responsive_steps", u64::from(def.responsive_steps))?;
    require_count("actuation.reverse_steps", u64::from(def.reverse_steps))?;
    Ok(())
}

fn validate_convergence(def: &ConvergenceDef) -> Result<(), ValidationError> {
    require_count("convergence.max_steps", def.max_steps)?;
    require_positive("convergence.tolerance_pa", def.tolerance_pa)?;
    let mut seen = HashSet::new();
    for flag in &def.residual_flags {
        require_name("convergence.residual_flags", flag)?;
        if !seen.insert(flag.as_str()) {
            return Err(ValidationError::DuplicateName {
                name: flag.clone(),
                context: "convergence.residual_flags".to_string(),
            });
        }
    }
    Ok(())
}

fn validate_warm_start(def: &WarmStartDef) -> Result<(), ValidationError> {
    require_name("warm_start.source_field", &def.source_field)?;
    require_name(
        "warm_start.negligible_definition",
        &def.negligible_definition,
    )?;
    require_count("warm_start.prime_steps", u64::from(def.prime_steps))?;
    require_count("warm_start.settle_steps", u64::from(def.settle_steps))?;
    Ok(())
}

fn validate_fluid(def: &FluidDef) -> Result<(), ValidationError> {
    require_positive("fluid.density_kg_m3", def.density_kg_m3)?;
    require_positive("fluid.mass_flow_kg_s", def.mass_flow_kg_s)?;
    if let Some(d) = def.rotor_diameter_m {
        require_positive("fluid.rotor_diameter_m", d)?;
    }
    Ok(())
}

fn validate_plant(def: &PlantDef) -> Result<(), ValidationError> {
    require_positive("plant.pressure_coeff", def.pressure_coeff)?;
    require_finite("plant.pressure_offset_pa", def.pressure_offset_pa)?;
    require_finite("plant.torque_coeff", def.torque_coeff)?;
    require_positive("plant.relaxation", def.relaxation)?;
    if def.relaxation > 1.0 {
        return Err(invalid("plant.relaxation", def.relaxation, "must not exceed 1"));
    }
    require_finite("plant.initial_rotation_rad_s", def.initial_rotation_rad_s)?;
    require_positive("plant.residual_decay", def.residual_decay)?;
    if def.residual_decay >= 1.0 {
        return Err(invalid(
            "plant.residual_decay",
            def.residual_decay,
            "must be below 1",
        ));
    }
    require_finite("plant.residual_kick", def.residual_kick)?;
    require_positive("plant.residual_threshold", def.residual_threshold)?;
    require_finite("plant.hemolysis_coeff", def.hemolysis_coeff)?;
    require_positive("plant.max_rotation_rad_s", def.max_rotation_rad_s)?;
    Ok(())
}

fn require_name(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Missing {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn require_finite(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(invalid(field, value, "must be finite"));
    }
    Ok(())
}

fn require_positive(field: &str, value: f64) -> Result<(), ValidationError> {
    require_finite(field, value)?;
    if value <= 0.0 {
        return Err(invalid(field, value, "must be positive"));
    }
    Ok(())
}

fn require_count(field: &str, value: u64) -> Result<(), ValidationError> {
    if value == 0 {
        return Err(invalid(field, value, "must be positive"));
    }
    Ok(())
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
