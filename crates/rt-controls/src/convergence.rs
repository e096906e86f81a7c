//! Multi-criteria convergence evaluation.
//!
//! The loop may stop when either
//! - the solver's step cap is satisfied (a safety ceiling, reported as a
//!   distinct, provisional outcome), or
//! - the process output sits inside the tolerance window around the target
//!   **and** every tracked residual flag reports satisfied.
//!
//! Residual flags are thresholded by the solver itself; this module only
//! combines them.

use crate::error::{ControlError, ControlResult};
use rt_core::names::{STANDARD_RESIDUAL_FLAGS, TRANSITION_RESIDUAL_FLAGS};
use rt_core::strictly_within;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DEFAULT_MAX_STEPS: u64 = 10_000;
pub const DEFAULT_OUTPUT_TOLERANCE: f64 = 10.0;

/// How residual flags are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FlagCombination {
    /// Every flag must be satisfied.
    #[default]
    Conjunction,
}

/// Stop criteria for the control loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceCriteria {
    /// Hard ceiling on total solver iterations.
    pub max_steps: u64,
    /// Half width of the window around the target output.
    pub output_tolerance: f64,
    /// Names of the solver criteria that must all be satisfied.
    pub residual_flags: Vec<String>,
    #[serde(default)]
    pub combination: FlagCombination,
}

impl Default for ConvergenceCriteria {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            output_tolerance: DEFAULT_OUTPUT_TOLERANCE,
            residual_flags: STANDARD_RESIDUAL_FLAGS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            combination: FlagCombination::Conjunction,
        }
    }
}

impl ConvergenceCriteria {
    pub fn new(
        max_steps: u64,
        output_tolerance: f64,
        residual_flags: Vec<String>,
    ) -> ControlResult<Self> {
        let criteria = Self {
            max_steps,
            output_tolerance,
            residual_flags,
            combination: FlagCombination::Conjunction,
        };
        criteria.validate()?;
        Ok(criteria)
    }

    /// Also track the transition-model residuals.
    pub fn with_transition_flags(mut self) -> Self {
        for name in TRANSITION_RESIDUAL_FLAGS {
            if !self.residual_flags.iter().any(|f| f == name) {
                self.residual_flags.push(name.to_string());
            }
        }
        self
    }

    pub fn validate(&self) -> ControlResult<()> {
        if self.max_steps == 0 {
            return Err(ControlError::InvalidArg {
                what: "max_steps must be positive",
            });
        }
        if !self.output_tolerance.is_finite() || self.output_tolerance <= 0.0 {
            return Err(ControlError::InvalidArg {
                what: "output_tolerance must be positive and finite",
            });
        }
        let mut seen = HashSet::new();
        for name in &self.residual_flags {
            if name.trim().is_empty() {
                return Err(ControlError::InvalidCriteria {
                    what: "residual flag names must not be empty".to_string(),
                });
            }
            if !seen.insert(name.as_str()) {
                return Err(ControlError::InvalidCriteria {
                    what: format!("residual flag '{}' is listed twice", name),
                });
            }
        }
        Ok(())
    }

    /// Evaluate the stop predicate for one loop iteration.
    pub fn evaluate(
        &self,
        output: f64,
        target: f64,
        flags: &[FlagReading],
        step_cap_satisfied: bool,
    ) -> Evaluation {
        Evaluation {
            within_target: within_target(output, target, self.output_tolerance),
            residuals_ok: match self.combination {
                FlagCombination::Conjunction => residuals_ok(flags),
            },
            step_cap_satisfied,
        }
    }
}

/// One residual flag as read from the solver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagReading {
    pub name: String,
    pub satisfied: bool,
}

impl FlagReading {
    pub fn new(name: impl Into<String>, satisfied: bool) -> Self {
        Self {
            name: name.into(),
            satisfied,
        }
    }
}

/// Outcome of the stop predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopDecision {
    Continue,
    Converged,
    StepCapExhausted,
}

impl StopDecision {
    pub fn is_stop(&self) -> bool {
        !matches!(self, StopDecision::Continue)
    }
}

/// Individual terms of one stop-predicate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub within_target: bool,
    pub residuals_ok: bool,
    pub step_cap_satisfied: bool,
}

impl Evaluation {
    pub fn converged(&self) -> bool {
        self.within_target && self.residuals_ok
    }

    /// The step cap alone forces a stop.
    pub fn must_stop(&self) -> bool {
        self.step_cap_satisfied
    }

    pub fn decision(&self) -> StopDecision {
        stop_decision(self.converged(), self.must_stop())
    }
}

/// Combine the two stop conditions. Convergence wins when it coincides with
/// the cap.
pub fn stop_decision(converged: bool, step_cap_satisfied: bool) -> StopDecision {
    if converged {
        StopDecision::Converged
    } else if step_cap_satisfied {
        StopDecision::StepCapExhausted
    } else {
        StopDecision::Continue
    }
}

/// Strict two-sided tolerance window around the target.
pub fn within_target(output: f64, target: f64, tolerance: f64) -> bool {
    strictly_within(output, target, tolerance)
}

/// Conjunction over all residual flags.
pub fn residuals_ok(flags: &[FlagReading]) -> bool {
    flags.iter().all(|f| f.satisfied)
}

/// True iff the output is inside the window and every flag is satisfied.
pub fn is_converged(output: f64, target: f64, tolerance: f64, flags: &[FlagReading]) -> bool {
    within_target(output, target, tolerance) && residuals_ok(flags)
}
