//! The solver oracle trait.

use crate::error::OracleResult;
use serde::{Deserialize, Serialize};

/// Sub-solvers whose updates can be suspended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubSolver {
    /// Transport of the passive scalar (hemolysis index).
    PassiveScalar,
    /// Wall-distance computation used by the turbulence model.
    WallDistance,
}

impl SubSolver {
    pub fn label(&self) -> &'static str {
        match self {
            SubSolver::PassiveScalar => "passive scalar",
            SubSolver::WallDistance => "wall distance",
        }
    }
}

/// Blocking, synchronous handle to an iterative flow solver.
///
/// Every call completes before it returns; a failed `step` leaves no partial
/// state that the caller can observe. Readings always reflect the state after
/// the most recent `step`.
pub trait SolverOracle {
    /// Advance the solver by `iterations` internal iterations.
    ///
    /// An enabled step cap may end the call early.
    fn step(&mut self, iterations: u32) -> OracleResult<()>;

    /// Total iterations taken since the solver was initialised.
    fn iteration(&self) -> u64;

    /// Current value of a named scalar monitor.
    fn read_monitor(&self, name: &str) -> OracleResult<f64>;

    /// Whether a named stopping criterion is currently satisfied.
    fn read_flag(&self, name: &str) -> OracleResult<bool>;

    /// Text definition of a field function.
    fn field_definition(&self, field: &str) -> OracleResult<String>;

    /// Replace the text definition of a field function.
    fn set_field_definition(&mut self, field: &str, definition: &str) -> OracleResult<()>;

    /// Suspend or resume updates of a sub-solver.
    fn set_frozen(&mut self, solver: SubSolver, frozen: bool) -> OracleResult<()>;

    /// Toggle per-iteration extraction of the feedback table.
    fn set_auto_snapshot(&mut self, enabled: bool) -> OracleResult<()>;

    /// Extract the feedback table once, now.
    fn snapshot(&mut self) -> OracleResult<()>;

    /// Configure the total-iteration ceiling.
    fn set_max_steps(&mut self, max_steps: u64) -> OracleResult<()>;

    /// Enable or disable the total-iteration ceiling.
    fn set_step_cap_enabled(&mut self, enabled: bool) -> OracleResult<()>;

    /// Whether the enabled ceiling has been reached.
    fn is_step_cap_satisfied(&self) -> OracleResult<bool>;
}
