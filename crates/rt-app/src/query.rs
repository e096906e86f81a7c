//! Query helpers for stored runs.

use rt_core::names::TORQUE_MONITOR;
use rt_core::{OperatingPoint, kg_per_m3, kgps, m, nm, pa, rad_per_s, to_rpm};
use rt_project::schema::Case;
use rt_results::{IterationRecord, RunManifest};

/// Operating point reached by a run, with derived pump metrics.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: String,
    pub termination: String,
    pub provisional: bool,
    pub control_iterations: usize,
    pub total_iterations: u64,
    pub rotation_rad_s: f64,
    pub rotation_rpm: f64,
    pub pressure_rise_pa: f64,
    pub target_error_pa: f64,
    pub head_m: f64,
    pub specific_speed: Option<f64>,
    pub specific_diameter: Option<f64>,
    /// Present when the torque monitor was recorded and the rotor pumps.
    pub efficiency: Option<f64>,
}

/// Summarize a run of `case`.
pub fn run_summary(manifest: &RunManifest, case: &Case) -> RunSummary {
    let torque = manifest
        .settled_monitors
        .iter()
        .find(|m| m.name == TORQUE_MONITOR)
        .map(|m| m.value);
    let point = OperatingPoint {
        pressure_rise: pa(manifest.settled_output_pa),
        torque: nm(torque.unwrap_or(0.0)),
        rotation_rate: rad_per_s(manifest.final_actuation_rad_s),
        mass_flow: kgps(case.fluid.mass_flow_kg_s),
        density: kg_per_m3(case.fluid.density_kg_m3),
    };

    RunSummary {
        run_id: manifest.run_id.clone(),
        termination: match manifest.termination {
            rt_results::TerminationKind::Converged => "converged".to_string(),
            rt_results::TerminationKind::StepCapExhausted => "step cap exhausted".to_string(),
        },
        provisional: manifest.is_provisional(),
        control_iterations: manifest.control_iterations,
        total_iterations: manifest.total_iterations,
        rotation_rad_s: manifest.final_actuation_rad_s,
        rotation_rpm: to_rpm(point.rotation_rate),
        pressure_rise_pa: manifest.settled_output_pa,
        target_error_pa: manifest.settled_output_pa - manifest.target_pa,
        head_m: point.head().value,
        specific_speed: point.specific_speed(),
        specific_diameter: case
            .fluid
            .rotor_diameter_m
            .and_then(|d| point.specific_diameter(m(d))),
        efficiency: torque
            .and_then(|_| point.hydraulic_efficiency())
            .map(|e| e.value),
    }
}

/// Actuation after each control decision, against solver iteration.
pub fn actuation_series(records: &[IterationRecord]) -> Vec<(u64, f64)> {
    records
        .iter()
        .map(|r| (r.solver_iteration, r.actuation_after_rad_s))
        .collect()
}

/// Output after each control decision, against solver iteration.
pub fn output_series(records: &[IterationRecord]) -> Vec<(u64, f64)> {
    records
        .iter()
        .map(|r| (r.solver_iteration, r.output_after_pa))
        .collect()
}
