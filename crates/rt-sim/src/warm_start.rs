//! Staged warm-start of auxiliary solver fields.
//!
//! The hemolysis source term feeds on a table extracted from its own previous
//! solution. Coupling it from the first iteration lets the unconverged scalar
//! run away, so the scalar is brought online in stages: first with a
//! negligible source, then with its real definition, each stage followed by a
//! few iterations. The wall distance is frozen afterwards since it no longer
//! changes.
//!
//! The sequence is a list of [`WarmStartStage`] values executed in order by
//! [`run_warm_start`].

use std::fmt;

use rt_core::names::{NEGLIGIBLE_SOURCE_DEFINITION, SOURCE_FIELD};
use rt_oracle::{OracleError, SolverOracle, SubSolver};
use tracing::{debug, info};

use crate::error::{SimError, SimResult};

pub const DEFAULT_PRIME_STEPS: u32 = 10;
pub const DEFAULT_WARM_SETTLE_STEPS: u32 = 10;

/// One step of the warm-start sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarmStartStage {
    /// Suspend or resume a sub-solver.
    SetFrozen { solver: SubSolver, frozen: bool },
    /// Remember the real source definition and replace it by the negligible one.
    NeutralizeSource,
    /// Put the remembered source definition back.
    RestoreSource,
    /// Toggle per-iteration extraction of the feedback table.
    SetAutoSnapshot(bool),
    /// Extract the feedback table once.
    Snapshot,
    /// Run solver iterations.
    Step(u32),
}

impl fmt::Display for WarmStartStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarmStartStage::SetFrozen { solver, frozen } => {
                let verb = if *frozen { "freeze" } else { "unfreeze" };
                write!(f, "{} {}", verb, solver.label())
            }
            WarmStartStage::NeutralizeSource => write!(f, "neutralize source"),
            WarmStartStage::RestoreSource => write!(f, "restore source"),
            WarmStartStage::SetAutoSnapshot(on) => {
                write!(f, "auto snapshot {}", if *on { "on" } else { "off" })
            }
            WarmStartStage::Snapshot => write!(f, "snapshot"),
            WarmStartStage::Step(n) => write!(f, "step {}", n),
        }
    }
}

/// Ordered warm-start sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarmStartPlan {
    /// Field function holding the scalar source definition.
    pub source_field: String,
    /// Definition used while the source is neutralized.
    pub negligible_definition: String,
    pub stages: Vec<WarmStartStage>,
}

impl Default for WarmStartPlan {
    fn default() -> Self {
        Self::standard(DEFAULT_PRIME_STEPS, DEFAULT_WARM_SETTLE_STEPS)
    }
}

impl WarmStartPlan {
    /// The standard priming sequence.
    ///
    /// `prime_steps` iterations follow each priming stage; `settle_steps`
    /// iterations close the sequence after the wall distance is frozen.
    pub fn standard(prime_steps: u32, settle_steps: u32) -> Self {
        use WarmStartStage::*;
        Self {
            source_field: SOURCE_FIELD.to_string(),
            negligible_definition: NEGLIGIBLE_SOURCE_DEFINITION.to_string(),
            stages: vec![
                SetFrozen {
                    solver: SubSolver::PassiveScalar,
                    frozen: true,
                },
                NeutralizeSource,
                SetAutoSnapshot(false),
                Snapshot,
                Step(prime_steps),
                SetFrozen {
                    solver: SubSolver::PassiveScalar,
                    frozen: false,
                },
                Step(prime_steps),
                Snapshot,
                RestoreSource,
                Step(prime_steps),
                Snapshot,
                SetAutoSnapshot(true),
                Step(prime_steps),
                SetFrozen {
                    solver: SubSolver::WallDistance,
                    frozen: true,
                },
                Step(settle_steps),
            ],
        }
    }

    /// Use a different source field and stand-in definition.
    pub fn with_source(
        mut self,
        field: impl Into<String>,
        negligible_definition: impl Into<String>,
    ) -> Self {
        self.source_field = field.into();
        self.negligible_definition = negligible_definition.into();
        self
    }

    /// Solver iterations requested by the whole sequence.
    pub fn total_steps(&self) -> u64 {
        self.stages
            .iter()
            .map(|s| match s {
                WarmStartStage::Step(n) => u64::from(*n),
                _ => 0,
            })
            .sum()
    }

    /// Iteration count of the final `Step` stage.
    pub fn last_step_count(&self) -> Option<u32> {
        self.stages.iter().rev().find_map(|s| match s {
            WarmStartStage::Step(n) => Some(*n),
            _ => None,
        })
    }

    /// Check stage ordering before anything touches the solver.
    pub fn validate(&self) -> SimResult<()> {
        if self.source_field.trim().is_empty() {
            return Err(SimError::InvalidArg {
                what: "warm-start source field must not be empty",
            });
        }
        let mut neutralized = false;
        for stage in &self.stages {
            match stage {
                WarmStartStage::NeutralizeSource => {
                    if neutralized {
                        return Err(SimError::InvalidArg {
                            what: "source neutralized twice without restore",
                        });
                    }
                    neutralized = true;
                }
                WarmStartStage::RestoreSource => {
                    if !neutralized {
                        return Err(SimError::InvalidArg {
                            what: "source restored before it was neutralized",
                        });
                    }
                    neutralized = false;
                }
                WarmStartStage::Step(0) => {
                    return Err(SimError::InvalidArg {
                        what: "warm-start step counts must be positive",
                    });
                }
                _ => {}
            }
        }
        if neutralized {
            return Err(SimError::InvalidArg {
                what: "source left neutralized at the end of warm-start",
            });
        }
        Ok(())
    }
}

/// Summary of an executed warm-start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WarmStartReport {
    pub stages_run: usize,
    /// Solver iteration counter after the last stage.
    pub iteration: u64,
}

/// Execute every stage of `plan` in order.
///
/// # Errors
///
/// The first failing stage aborts the sequence with [`SimError::WarmStart`];
/// the solver is then in an unknown state and the run cannot continue.
pub fn run_warm_start<O: SolverOracle + ?Sized>(
    oracle: &mut O,
    plan: &WarmStartPlan,
) -> SimResult<WarmStartReport> {
    plan.validate()?;

    let mut saved_source: Option<String> = None;
    for (index, stage) in plan.stages.iter().enumerate() {
        debug!(index, stage = %stage, "Warm-start stage");
        run_stage(oracle, plan, stage, &mut saved_source).map_err(|source| {
            SimError::WarmStart {
                index,
                stage: stage.to_string(),
                source,
            }
        })?;
    }

    let report = WarmStartReport {
        stages_run: plan.stages.len(),
        iteration: oracle.iteration(),
    };
    info!(
        stages = report.stages_run,
        iteration = report.iteration,
        "Warm-start complete"
    );
    Ok(report)
}

fn run_stage<O: SolverOracle + ?Sized>(
    oracle: &mut O,
    plan: &WarmStartPlan,
    stage: &WarmStartStage,
    saved_source: &mut Option<String>,
) -> Result<(), OracleError> {
    match stage {
        WarmStartStage::SetFrozen { solver, frozen } => oracle.set_frozen(*solver, *frozen),
        WarmStartStage::NeutralizeSource => {
            *saved_source = Some(oracle.field_definition(&plan.source_field)?);
            oracle.set_field_definition(&plan.source_field, &plan.negligible_definition)
        }
        WarmStartStage::RestoreSource => match saved_source.take() {
            Some(definition) => oracle.set_field_definition(&plan.source_field, &definition),
            None => Ok(()),
        },
        WarmStartStage::SetAutoSnapshot(enabled) => oracle.set_auto_snapshot(*enabled),
        WarmStartStage::Snapshot => oracle.snapshot(),
        WarmStartStage::Step(n) => oracle.step(*n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_plan_shape() {
        let plan = WarmStartPlan::default();
        assert_eq!(plan.stages.len(), 15);
        assert_eq!(plan.total_steps(), 50);
        assert_eq!(plan.last_step_count(), Some(10));
        plan.validate().unwrap();

        let custom = WarmStartPlan::standard(5, 25);
        assert_eq!(custom.total_steps(), 45);
        assert_eq!(custom.last_step_count(), Some(25));
    }

    #[test]
    fn invalid_stage_orders() {
        let mut plan = WarmStartPlan::default();
        plan.stages.retain(|s| *s != WarmStartStage::RestoreSource);
        assert!(plan.validate().is_err());

        let plan = WarmStartPlan {
            stages: vec![WarmStartStage::RestoreSource],
            ..WarmStartPlan::default()
        };
        assert!(plan.validate().is_err());

        let plan = WarmStartPlan {
            stages: vec![WarmStartStage::Step(0)],
            ..WarmStartPlan::default()
        };
        assert!(plan.validate().is_err());
    }

    #[test]
    fn stage_labels() {
        assert_eq!(WarmStartStage::Step(10).to_string(), "step 10");
        assert_eq!(
            WarmStartStage::SetFrozen {
                solver: SubSolver::WallDistance,
                frozen: true
            }
            .to_string(),
            "freeze wall distance"
        );
    }
}
