//! Affinity-law surrogate of a rotor flow case.
//!
//! A lumped model that behaves like the flow solver from the control loop's
//! point of view, without any field solution:
//!
//! ```text
//! Δp_ss(ω) = k ω|ω| - Δp_0          (affinity law with a loss offset)
//! Δp[n+1]  = Δp[n] + r (Δp_ss - Δp[n])
//! τ        = -c ω|ω|                (fluid moment on the rotor)
//! ```
//!
//! Below `sqrt(Δp_0 / k)` the pressure rise is not positive, which reproduces
//! the turbine regime at low speed. Residuals are a single disturbance level
//! that decays geometrically every iteration and is kicked by every change of
//! the applied rotation rate; each criterion scales it by its own weight.
//!
//! Field definitions that are not numeric literals are treated as symbolic
//! expressions: the rotor keeps turning at its previous rate.

use std::collections::BTreeMap;

use rt_core::names::{
    HEMOLYSIS_MONITOR, NEGLIGIBLE_SOURCE_DEFINITION, PRESSURE_RISE_MONITOR, ROTATION_FIELD,
    ROTATION_MONITOR, SOURCE_FIELD, STANDARD_RESIDUAL_FLAGS, TORQUE_MONITOR,
    TRANSITION_RESIDUAL_FLAGS,
};
use rt_core::parse_literal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{OracleError, OracleResult};
use crate::oracle::{SolverOracle, SubSolver};

/// Definition the source field holds until the priming sequence replaces it.
pub const COUPLED_SOURCE_DEFINITION: &str = "alternateValue(max(1e-15,abs(interpolatePositionTable(@Table(\"HemolysisPreviousStep\"),\"Hemolysis Source Term\"))), 1e-13)";

/// Surrogate plant parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurrogateConfig {
    /// Affinity coefficient k (Pa·s²/rad²).
    pub pressure_coeff: f64,
    /// Loss offset Δp_0 (Pa).
    pub pressure_offset: f64,
    /// Moment coefficient c (N·m·s²/rad²).
    pub torque_coeff: f64,
    /// Relaxation factor r per iteration, in (0, 1].
    pub relaxation: f64,
    /// Rotation rate the solver starts with (rad/s).
    pub initial_rotation: f64,
    /// Text the rotation field holds initially.
    pub initial_rotation_definition: String,
    /// Disturbance decay factor per iteration, in (0, 1).
    pub residual_decay: f64,
    /// Disturbance added per unit relative change of rotation rate.
    pub residual_kick: f64,
    /// Criterion threshold on the weighted disturbance.
    pub residual_threshold: f64,
    /// Stopping criteria the surrogate reports.
    pub residual_flags: Vec<String>,
    /// Steady hemolysis index per (rad/s)² with the coupled source.
    pub hemolysis_coeff: f64,
    /// Largest rotation rate before the solution is declared diverged (rad/s).
    pub max_rotation: f64,
    /// Fail with a divergence once this iteration is reached.
    pub diverge_at: Option<u64>,
    /// Whether `step` stops at an enabled step cap.
    pub honor_step_cap: bool,
}

impl Default for SurrogateConfig {
    fn default() -> Self {
        Self {
            pressure_coeff: 0.15,
            pressure_offset: 1500.0,
            torque_coeff: 2.0e-8,
            relaxation: 0.05,
            initial_rotation: 100.0,
            initial_rotation_definition: "100".to_string(),
            residual_decay: 0.97,
            residual_kick: 1.0,
            residual_threshold: 1.0e-3,
            residual_flags: STANDARD_RESIDUAL_FLAGS
                .iter()
                .chain(TRANSITION_RESIDUAL_FLAGS.iter())
                .map(|s| s.to_string())
                .collect(),
            hemolysis_coeff: 1.0e-11,
            max_rotation: 10_000.0,
            diverge_at: None,
            honor_step_cap: true,
        }
    }
}

/// A call made on the surrogate, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum OracleEvent {
    Step { requested: u32, executed: u32 },
    /// A `step` that failed; the plant kept its state from before the call.
    StepFailed { requested: u32 },
    SetField { field: String, definition: String },
    SetFrozen { solver: SubSolver, frozen: bool },
    SetAutoSnapshot(bool),
    Snapshot,
    SetMaxSteps(u64),
    SetStepCap(bool),
}

/// Evolving plant quantities. A `step` advances a copy and commits it on success.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PlantState {
    iteration: u64,
    omega: f64,
    pressure_rise: f64,
    disturbance: f64,
    hemolysis: f64,
    snapshots: u64,
}

/// In-process surrogate implementing [`SolverOracle`].
#[derive(Debug, Clone)]
pub struct AffinityPumpOracle {
    config: SurrogateConfig,
    state: PlantState,
    fields: BTreeMap<String, String>,
    passive_scalar_frozen: bool,
    wall_distance_frozen: bool,
    auto_snapshot: bool,
    max_steps: u64,
    step_cap_enabled: bool,
    events: Vec<OracleEvent>,
}

impl AffinityPumpOracle {
    pub fn new(config: SurrogateConfig) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(
            ROTATION_FIELD.to_string(),
            config.initial_rotation_definition.clone(),
        );
        fields.insert(
            SOURCE_FIELD.to_string(),
            COUPLED_SOURCE_DEFINITION.to_string(),
        );
        let omega = parse_literal(&config.initial_rotation_definition)
            .unwrap_or(config.initial_rotation);
        Self {
            config,
            state: PlantState {
                iteration: 0,
                omega,
                pressure_rise: 0.0,
                disturbance: 1.0,
                hemolysis: 1.0e-15,
                snapshots: 0,
            },
            fields,
            passive_scalar_frozen: false,
            wall_distance_frozen: false,
            auto_snapshot: true,
            max_steps: u64::MAX,
            step_cap_enabled: false,
            events: Vec::new(),
        }
    }

    /// Calls made so far, oldest first.
    pub fn events(&self) -> &[OracleEvent] {
        &self.events
    }

    pub fn is_frozen(&self, solver: SubSolver) -> bool {
        match solver {
            SubSolver::PassiveScalar => self.passive_scalar_frozen,
            SubSolver::WallDistance => self.wall_distance_frozen,
        }
    }

    pub fn auto_snapshot(&self) -> bool {
        self.auto_snapshot
    }

    /// Feedback table extractions so far, manual and automatic.
    pub fn snapshot_count(&self) -> u64 {
        self.state.snapshots
    }

    /// Rotation rate the plant is currently turning at.
    pub fn applied_rotation(&self) -> f64 {
        self.state.omega
    }

    /// Steady pressure rise at rotation rate `omega`.
    pub fn steady_pressure_rise(&self, omega: f64) -> f64 {
        self.config.pressure_coeff * omega * omega.abs() - self.config.pressure_offset
    }

    fn torque(&self) -> f64 {
        let omega = self.state.omega;
        -self.config.torque_coeff * omega * omega.abs()
    }

    fn flag_weight(&self, index: usize) -> f64 {
        1.0 + 0.1 * index as f64
    }

    fn apply_rotation_field(&self, state: &mut PlantState) {
        let Some(definition) = self.fields.get(ROTATION_FIELD) else {
            return;
        };
        let Ok(omega) = parse_literal(definition) else {
            return;
        };
        if omega != state.omega {
            let relative = (omega - state.omega).abs() / state.omega.abs().max(1.0);
            state.disturbance += self.config.residual_kick * relative;
            state.omega = omega;
        }
    }

    fn iterate_once(&self, state: &mut PlantState) -> OracleResult<()> {
        if let Some(at) = self.config.diverge_at {
            if state.iteration >= at {
                return Err(OracleError::Diverged {
                    iteration: state.iteration,
                    what: "injected divergence".to_string(),
                });
            }
        }
        if state.omega.abs() > self.config.max_rotation {
            return Err(OracleError::Diverged {
                iteration: state.iteration,
                what: format!("rotation rate {} exceeds {}", state.omega, self.config.max_rotation),
            });
        }

        let target = self.steady_pressure_rise(state.omega);
        state.pressure_rise += self.config.relaxation * (target - state.pressure_rise);
        state.disturbance *= self.config.residual_decay;

        if !self.passive_scalar_frozen {
            let coupled = self
                .fields
                .get(SOURCE_FIELD)
                .is_some_and(|d| d != NEGLIGIBLE_SOURCE_DEFINITION);
            let steady = if coupled {
                self.config.hemolysis_coeff * state.omega * state.omega
            } else {
                1.0e-15
            };
            state.hemolysis += self.config.relaxation * (steady - state.hemolysis);
        }
        if self.auto_snapshot {
            state.snapshots += 1;
        }

        if !state.pressure_rise.is_finite() {
            return Err(OracleError::Diverged {
                iteration: state.iteration,
                what: "non-finite pressure rise".to_string(),
            });
        }
        state.iteration += 1;
        Ok(())
    }

    fn advance(&self, iterations: u32) -> OracleResult<PlantState> {
        let mut next = self.state;
        self.apply_rotation_field(&mut next);

        let mut budget = u64::from(iterations);
        if self.config.honor_step_cap && self.step_cap_enabled {
            budget = budget.min(self.max_steps.saturating_sub(next.iteration));
        }
        for _ in 0..budget {
            self.iterate_once(&mut next)?;
        }
        Ok(next)
    }
}

impl SolverOracle for AffinityPumpOracle {
    fn step(&mut self, iterations: u32) -> OracleResult<()> {
        let next = match self.advance(iterations) {
            Ok(next) => next,
            Err(err) => {
                self.events.push(OracleEvent::StepFailed {
                    requested: iterations,
                });
                return Err(err);
            }
        };
        let executed = (next.iteration - self.state.iteration) as u32;
        self.state = next;
        if executed < iterations {
            debug!(
                requested = iterations,
                executed,
                iteration = self.state.iteration,
                "Step cap ended solver run early"
            );
        }
        self.events.push(OracleEvent::Step {
            requested: iterations,
            executed,
        });
        Ok(())
    }

    fn iteration(&self) -> u64 {
        self.state.iteration
    }

    fn read_monitor(&self, name: &str) -> OracleResult<f64> {
        match name {
            PRESSURE_RISE_MONITOR => Ok(self.state.pressure_rise),
            TORQUE_MONITOR => Ok(self.torque()),
            HEMOLYSIS_MONITOR => Ok(self.state.hemolysis),
            ROTATION_MONITOR => Ok(self.state.omega),
            _ => Err(OracleError::UnknownMonitor {
                name: name.to_string(),
            }),
        }
    }

    fn read_flag(&self, name: &str) -> OracleResult<bool> {
        let index = self
            .config
            .residual_flags
            .iter()
            .position(|f| f == name)
            .ok_or_else(|| OracleError::UnknownFlag {
                name: name.to_string(),
            })?;
        Ok(self.state.disturbance * self.flag_weight(index) < self.config.residual_threshold)
    }

    fn field_definition(&self, field: &str) -> OracleResult<String> {
        self.fields
            .get(field)
            .cloned()
            .ok_or_else(|| OracleError::UnknownField {
                name: field.to_string(),
            })
    }

    fn set_field_definition(&mut self, field: &str, definition: &str) -> OracleResult<()> {
        let slot = self
            .fields
            .get_mut(field)
            .ok_or_else(|| OracleError::UnknownField {
                name: field.to_string(),
            })?;
        *slot = definition.to_string();
        self.events.push(OracleEvent::SetField {
            field: field.to_string(),
            definition: definition.to_string(),
        });
        Ok(())
    }

    fn set_frozen(&mut self, solver: SubSolver, frozen: bool) -> OracleResult<()> {
        match solver {
            SubSolver::PassiveScalar => self.passive_scalar_frozen = frozen,
            SubSolver::WallDistance => self.wall_distance_frozen = frozen,
        }
        self.events.push(OracleEvent::SetFrozen { solver, frozen });
        Ok(())
    }

    fn set_auto_snapshot(&mut self, enabled: bool) -> OracleResult<()> {
        self.auto_snapshot = enabled;
        self.events.push(OracleEvent::SetAutoSnapshot(enabled));
        Ok(())
    }

    fn snapshot(&mut self) -> OracleResult<()> {
        self.state.snapshots += 1;
        self.events.push(OracleEvent::Snapshot);
        Ok(())
    }

    fn set_max_steps(&mut self, max_steps: u64) -> OracleResult<()> {
        self.max_steps = max_steps;
        self.events.push(OracleEvent::SetMaxSteps(max_steps));
        Ok(())
    }

    fn set_step_cap_enabled(&mut self, enabled: bool) -> OracleResult<()> {
        self.step_cap_enabled = enabled;
        self.events.push(OracleEvent::SetStepCap(enabled));
        Ok(())
    }

    fn is_step_cap_satisfied(&self) -> OracleResult<bool> {
        Ok(self.step_cap_enabled && self.state.iteration >= self.max_steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_speed_is_turbine_regime() {
        let oracle = AffinityPumpOracle::new(SurrogateConfig::default());
        assert!(oracle.steady_pressure_rise(100.0) <= 0.0);
        assert!(oracle.steady_pressure_rise(320.0) > 13_332.23);
    }

    #[test]
    fn pressure_relaxes_towards_steady_value() {
        let mut oracle = AffinityPumpOracle::new(SurrogateConfig::default());
        oracle.set_field_definition(ROTATION_FIELD, "300").unwrap();
        oracle.step(400).unwrap();
        let dp = oracle.read_monitor(PRESSURE_RISE_MONITOR).unwrap();
        let steady = oracle.steady_pressure_rise(300.0);
        assert!((dp - steady).abs() < 1e-3 * steady);
        assert_eq!(oracle.iteration(), 400);
        assert!(oracle.read_monitor(TORQUE_MONITOR).unwrap() < 0.0);
        assert_eq!(oracle.read_monitor(ROTATION_MONITOR).unwrap(), 300.0);
    }

    #[test]
    fn residual_flags_settle_after_quiet_iterations() {
        let mut oracle = AffinityPumpOracle::new(SurrogateConfig::default());
        assert!(!oracle.read_flag("Continuity Criterion").unwrap());
        oracle.step(400).unwrap();
        assert!(oracle.read_flag("Continuity Criterion").unwrap());

        oracle.set_field_definition(ROTATION_FIELD, "150").unwrap();
        oracle.step(1).unwrap();
        assert!(!oracle.read_flag("Continuity Criterion").unwrap());
    }

    #[test]
    fn step_cap_ends_run_early() {
        let mut oracle = AffinityPumpOracle::new(SurrogateConfig::default());
        oracle.set_max_steps(150).unwrap();
        oracle.set_step_cap_enabled(true).unwrap();
        oracle.step(100).unwrap();
        assert!(!oracle.is_step_cap_satisfied().unwrap());
        oracle.step(100).unwrap();
        assert_eq!(oracle.iteration(), 150);
        assert!(oracle.is_step_cap_satisfied().unwrap());
        assert_eq!(
            oracle.events().last(),
            Some(&OracleEvent::Step {
                requested: 100,
                executed: 50
            })
        );

        oracle.set_step_cap_enabled(false).unwrap();
        assert!(!oracle.is_step_cap_satisfied().unwrap());
        oracle.step(100).unwrap();
        assert_eq!(oracle.iteration(), 250);
    }

    #[test]
    fn frozen_scalar_does_not_transport() {
        let mut oracle = AffinityPumpOracle::new(SurrogateConfig::default());
        oracle.set_field_definition(ROTATION_FIELD, "300").unwrap();
        oracle.set_frozen(SubSolver::PassiveScalar, true).unwrap();
        oracle.step(50).unwrap();
        assert_eq!(oracle.read_monitor(HEMOLYSIS_MONITOR).unwrap(), 1.0e-15);

        oracle.set_frozen(SubSolver::PassiveScalar, false).unwrap();
        oracle.step(50).unwrap();
        assert!(oracle.read_monitor(HEMOLYSIS_MONITOR).unwrap() > 1.0e-15);
    }

    #[test]
    fn injected_divergence_fails_step() {
        let config = SurrogateConfig {
            diverge_at: Some(5),
            ..SurrogateConfig::default()
        };
        let mut oracle = AffinityPumpOracle::new(config);
        let err = oracle.step(10).unwrap_err();
        assert_eq!(
            err,
            OracleError::Diverged {
                iteration: 5,
                what: "injected divergence".to_string()
            }
        );
    }

    #[test]
    fn failed_step_leaves_plant_untouched() {
        let config = SurrogateConfig {
            diverge_at: Some(5),
            ..SurrogateConfig::default()
        };
        let mut oracle = AffinityPumpOracle::new(config);
        oracle.set_field_definition(ROTATION_FIELD, "300").unwrap();
        let dp = oracle.read_monitor(PRESSURE_RISE_MONITOR).unwrap();
        let hi = oracle.read_monitor(HEMOLYSIS_MONITOR).unwrap();
        let continuity = oracle.read_flag("Continuity Criterion").unwrap();

        assert!(oracle.step(10).is_err());
        assert_eq!(oracle.iteration(), 0);
        assert_eq!(oracle.read_monitor(PRESSURE_RISE_MONITOR).unwrap(), dp);
        assert_eq!(oracle.read_monitor(HEMOLYSIS_MONITOR).unwrap(), hi);
        assert_eq!(oracle.read_monitor(ROTATION_MONITOR).unwrap(), 100.0);
        assert_eq!(oracle.read_flag("Continuity Criterion").unwrap(), continuity);
        assert_eq!(oracle.snapshot_count(), 0);
        assert_eq!(
            oracle.events().last(),
            Some(&OracleEvent::StepFailed { requested: 10 })
        );

        oracle.step(5).unwrap();
        assert_eq!(oracle.iteration(), 5);
        assert_eq!(oracle.read_monitor(ROTATION_MONITOR).unwrap(), 300.0);
    }

    #[test]
    fn unknown_names_are_errors() {
        let mut oracle = AffinityPumpOracle::new(SurrogateConfig::default());
        assert!(oracle.read_monitor("Efficiency").is_err());
        assert!(oracle.read_flag("Energy Criterion").is_err());
        assert!(oracle.set_field_definition("massFlow", "1").is_err());
    }
}
