//! Translation from the case schema to runtime configuration.

use rt_controls::{ActuationLaw, ConvergenceCriteria};
use rt_core::format_literal;
use rt_oracle::SurrogateConfig;
use rt_project::schema::Case;
use rt_sim::{ControlLoopConfig, WarmStartPlan};

use crate::error::{AppError, AppResult};

/// Control loop configuration for a case.
pub fn build_loop_config(case: &Case) -> AppResult<ControlLoopConfig> {
    let law = ActuationLaw::new(case.actuation.max_step_rad_s)
        .map_err(|e| AppError::Validation(e.to_string()))?
        .with_damping(case.actuation.damping)
        .with_reverse_increment(case.actuation.reverse_increment_rad_s)
        .with_step_hints(case.actuation.responsive_steps, case.actuation.reverse_steps);

    let criteria = ConvergenceCriteria::new(
        case.convergence.max_steps,
        case.convergence.tolerance_pa,
        case.convergence.residual_flags.clone(),
    )
    .map_err(|e| AppError::Validation(e.to_string()))?;

    let warm_start = WarmStartPlan::standard(
        case.warm_start.prime_steps,
        case.warm_start.settle_steps,
    )
    .with_source(
        case.warm_start.source_field.clone(),
        case.warm_start.negligible_definition.clone(),
    );

    Ok(ControlLoopConfig {
        output_monitor: case.target.monitor.clone(),
        target_output: case.target.value_pa,
        actuation_field: case.actuation.field.clone(),
        initial_actuation: case.actuation.initial_rad_s,
        law,
        criteria,
        warm_start,
        settle_steps: case.settle_steps,
        recorded_monitors: case.monitors.clone(),
    })
}

/// Surrogate plant for a dry run of a case.
///
/// The surrogate reports every residual flag the case tracks in addition to
/// its own.
pub fn build_surrogate(case: &Case) -> SurrogateConfig {
    let mut config = SurrogateConfig::default();
    if let Some(plant) = &case.plant {
        config.pressure_coeff = plant.pressure_coeff;
        config.pressure_offset = plant.pressure_offset_pa;
        config.torque_coeff = plant.torque_coeff;
        config.relaxation = plant.relaxation;
        config.initial_rotation = plant.initial_rotation_rad_s;
        config.initial_rotation_definition = format_literal(plant.initial_rotation_rad_s);
        config.residual_decay = plant.residual_decay;
        config.residual_kick = plant.residual_kick;
        config.residual_threshold = plant.residual_threshold;
        config.hemolysis_coeff = plant.hemolysis_coeff;
        config.max_rotation = plant.max_rotation_rad_s;
    }
    for flag in &case.convergence.residual_flags {
        if !config.residual_flags.contains(flag) {
            config.residual_flags.push(flag.clone());
        }
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use rt_project::schema::PlantDef;

    #[test]
    fn default_case_maps_to_default_loop() {
        let case = Case::new("pump", 13_332.23);
        let config = build_loop_config(&case).unwrap();
        let expected = ControlLoopConfig::new(13_332.23);
        assert_eq!(config, expected);
    }

    #[test]
    fn plant_parameters_reach_surrogate() {
        let mut case = Case::new("pump", 13_332.23);
        case.plant = Some(PlantDef {
            pressure_coeff: 0.2,
            initial_rotation_rad_s: 150.0,
            ..PlantDef::default()
        });
        case.convergence.residual_flags.push("Energy Criterion".to_string());

        let surrogate = build_surrogate(&case);
        assert_eq!(surrogate.pressure_coeff, 0.2);
        assert_eq!(surrogate.initial_rotation_definition, "150");
        assert!(surrogate.residual_flags.iter().any(|f| f == "Energy Criterion"));
    }

    #[test]
    fn invalid_law_is_a_validation_error() {
        let mut case = Case::new("pump", 13_332.23);
        case.actuation.max_step_rad_s = -1.0;
        assert!(matches!(
            build_loop_config(&case),
            Err(AppError::Validation(_))
        ));
    }
}
