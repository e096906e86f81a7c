//! Square-root actuation law for rotor speed control.
//!
//! The pressure rise of a rotodynamic pump scales roughly with the square of
//! its rotation rate (affinity law), so the speed that would hit the target
//! pressure from the current operating point is
//!
//! ```text
//! ω* = sqrt(Δp_target / Δp) * ω
//! ```
//!
//! The law moves towards `ω*` in one of three ways:
//! - **Bounded**: the jump `ω* - ω` exceeds `max_step` in magnitude, so the
//!   rotor moves exactly `max_step` in the direction of the jump
//! - **Damped**: the jump is small, so only `damping * jump` is applied
//! - **Reversed**: the measured pressure rise is not positive (the rotor acts
//!   as a turbine), so the square root is meaningless and the speed is ramped
//!   by a fixed increment
//!
//! There is no integral or derivative action and no memory between calls.

use crate::error::{ControlError, ControlResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_STEP: f64 = 50.0;
pub const DEFAULT_DAMPING: f64 = 0.05;
pub const DEFAULT_REVERSE_INCREMENT: f64 = 10.0;
pub const DEFAULT_RESPONSIVE_STEPS: u32 = 100;
pub const DEFAULT_REVERSE_STEPS: u32 = 100;

/// Branch taken by the actuation law.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Regime {
    Bounded,
    Damped,
    Reversed,
}

impl Regime {
    pub fn label(&self) -> &'static str {
        match self {
            Regime::Bounded => "bounded",
            Regime::Damped => "damped",
            Regime::Reversed => "reversed",
        }
    }

    /// True when the process responded with a positive output.
    pub fn is_responsive(&self) -> bool {
        !matches!(self, Regime::Reversed)
    }
}

/// Result of one evaluation of the actuation law.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuationStep {
    /// New actuation value to apply.
    pub actuation: f64,
    /// Number of solver iterations to run before the next decision.
    pub step_count: u32,
    pub regime: Regime,
    /// Unbounded jump `ω* - ω`; `None` in the reversed regime.
    pub jump: Option<f64>,
}

/// Actuation law configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuationLaw {
    /// Largest actuation change per decision (rad/s).
    pub max_step: f64,
    /// Fraction of a small jump that is applied.
    pub damping: f64,
    /// Fixed actuation change while the output is not positive (rad/s).
    pub reverse_increment: f64,
    /// Solver iterations to run after a responsive decision.
    pub responsive_steps: u32,
    /// Solver iterations to run after a reversed decision.
    pub reverse_steps: u32,
}

impl Default for ActuationLaw {
    fn default() -> Self {
        Self {
            max_step: DEFAULT_MAX_STEP,
            damping: DEFAULT_DAMPING,
            reverse_increment: DEFAULT_REVERSE_INCREMENT,
            responsive_steps: DEFAULT_RESPONSIVE_STEPS,
            reverse_steps: DEFAULT_REVERSE_STEPS,
        }
    }
}

impl ActuationLaw {
    /// Create a law with the given step bound and default constants.
    pub fn new(max_step: f64) -> ControlResult<Self> {
        let law = Self {
            max_step,
            ..Self::default()
        };
        law.validate()?;
        Ok(law)
    }

    /// Set the damping factor for small jumps.
    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    /// Set the fixed increment used in the reversed regime.
    pub fn with_reverse_increment(mut self, increment: f64) -> Self {
        self.reverse_increment = increment;
        self
    }

    /// Set the solver iteration hints for both regimes.
    pub fn with_step_hints(mut self, responsive: u32, reverse: u32) -> Self {
        self.responsive_steps = responsive;
        self.reverse_steps = reverse;
        self
    }

    /// Check that every parameter is usable.
    pub fn validate(&self) -> ControlResult<()> {
        if !self.max_step.is_finite() || self.max_step <= 0.0 {
            return Err(ControlError::InvalidArg {
                what: "max_step must be positive and finite",
            });
        }
        if !self.damping.is_finite() || self.damping <= 0.0 || self.damping > 1.0 {
            return Err(ControlError::InvalidArg {
                what: "damping must be in (0, 1]",
            });
        }
        if !self.reverse_increment.is_finite() {
            return Err(ControlError::InvalidArg {
                what: "reverse_increment must be finite",
            });
        }
        if self.responsive_steps == 0 || self.reverse_steps == 0 {
            return Err(ControlError::InvalidArg {
                what: "step hints must be positive",
            });
        }
        Ok(())
    }

    /// Compute the next actuation value.
    ///
    /// # Arguments
    ///
    /// * `current_output` - Measured process output (pressure rise, Pa)
    /// * `current_actuation` - Actuation currently applied (rad/s)
    /// * `target` - Desired process output (Pa)
    pub fn next(&self, current_output: f64, current_actuation: f64, target: f64) -> ActuationStep {
        if current_output > 0.0 {
            let jump = (target / current_output).sqrt() * current_actuation - current_actuation;
            if jump * jump > self.max_step * self.max_step {
                ActuationStep {
                    actuation: current_actuation + self.max_step.copysign(jump),
                    step_count: self.responsive_steps,
                    regime: Regime::Bounded,
                    jump: Some(jump),
                }
            } else {
                ActuationStep {
                    actuation: current_actuation + jump * self.damping,
                    step_count: self.responsive_steps,
                    regime: Regime::Damped,
                    jump: Some(jump),
                }
            }
        } else {
            ActuationStep {
                actuation: current_actuation + self.reverse_increment,
                step_count: self.reverse_steps,
                regime: Regime::Reversed,
                jump: None,
            }
        }
    }
}

/// Evaluate the actuation law with default constants and the given step bound.
pub fn next_actuation(
    current_output: f64,
    current_actuation: f64,
    target: f64,
    max_step: f64,
) -> ActuationStep {
    ActuationLaw {
        max_step,
        ..ActuationLaw::default()
    }
    .next(current_output, current_actuation, target)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: f64 = 13_332.23;

    #[test]
    fn far_from_target_takes_bounded_step() {
        let step = next_actuation(20_000.0, 2000.0, TARGET, 50.0);
        let jump = step.jump.unwrap();
        assert!((jump - ((TARGET / 20_000.0f64).sqrt() * 2000.0 - 2000.0)).abs() < 1e-9);
        assert!((jump + 367.0).abs() < 5.0);
        assert_eq!(step.regime, Regime::Bounded);
        assert_eq!(step.actuation, 1950.0);
        assert_eq!(step.step_count, 100);
    }

    #[test]
    fn bounded_step_follows_sign_of_jump() {
        let step = next_actuation(5_000.0, 2000.0, TARGET, 50.0);
        assert_eq!(step.regime, Regime::Bounded);
        assert_eq!(step.actuation, 2050.0);
    }

    #[test]
    fn near_target_takes_damped_step() {
        let step = next_actuation(13_335.0, 2000.0, TARGET, 50.0);
        let jump = step.jump.unwrap();
        assert!(jump < 0.0 && jump > -0.25);
        assert_eq!(step.regime, Regime::Damped);
        assert!((step.actuation - (2000.0 + jump * 0.05)).abs() < 1e-12);
        assert!((step.actuation - 1999.99).abs() < 0.01);
    }

    #[test]
    fn non_positive_output_ramps_speed() {
        for output in [-5.0, 0.0, -1.0e6] {
            let step = next_actuation(output, 1234.5, TARGET, 50.0);
            assert_eq!(step.regime, Regime::Reversed);
            assert_eq!(step.actuation, 1234.5 + 10.0);
            assert_eq!(step.step_count, 100);
            assert!(step.jump.is_none());
        }
    }

    #[test]
    fn jump_equal_to_bound_is_damped() {
        // sqrt(4) * 50 - 50 = 50 exactly
        let step = next_actuation(1.0, 50.0, 4.0, 50.0);
        assert_eq!(step.jump, Some(50.0));
        assert_eq!(step.regime, Regime::Damped);
        assert!((step.actuation - 52.5).abs() < 1e-12);
    }

    #[test]
    fn custom_constants_are_used() {
        let law = ActuationLaw::new(20.0)
            .unwrap()
            .with_damping(0.5)
            .with_reverse_increment(-3.0)
            .with_step_hints(40, 7);
        law.validate().unwrap();

        let reversed = law.next(-1.0, 100.0, TARGET);
        assert_eq!(reversed.actuation, 97.0);
        assert_eq!(reversed.step_count, 7);

        let damped = law.next(TARGET * 1.01, 100.0, TARGET);
        assert_eq!(damped.regime, Regime::Damped);
        assert_eq!(damped.step_count, 40);
        assert!((damped.actuation - (100.0 + damped.jump.unwrap() * 0.5)).abs() < 1e-12);
    }

    #[test]
    fn invalid_law_params() {
        assert!(ActuationLaw::new(0.0).is_err());
        assert!(ActuationLaw::new(-1.0).is_err());
        assert!(ActuationLaw::new(f64::NAN).is_err());
        assert!(ActuationLaw::default().with_damping(0.0).validate().is_err());
        assert!(ActuationLaw::default().with_damping(1.5).validate().is_err());
        assert!(
            ActuationLaw::default()
                .with_reverse_increment(f64::INFINITY)
                .validate()
                .is_err()
        );
        assert!(ActuationLaw::default().with_step_hints(0, 10).validate().is_err());
    }
}
