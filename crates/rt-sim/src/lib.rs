//! Control loop driver for rotortune.
//!
//! Provides:
//! - Staged warm-start of auxiliary solver fields, described as data
//! - The feedback loop that steers the rotor speed towards a target pressure
//!   rise while tracking residual convergence
//! - Unconditioned settling after the loop ends
//!
//! The solver is borrowed for the whole run; everything here is synchronous
//! and single-threaded.

pub mod driver;
pub mod error;
pub mod warm_start;

pub use driver::{
    ControlLoopConfig, ControlOutcome, DEFAULT_SETTLE_STEPS, IterationTrace, LoopPhase,
    LoopProgress, ProcessState, Termination, run_control_loop, run_control_loop_with_progress,
};
pub use error::{SimError, SimResult};
pub use warm_start::{WarmStartPlan, WarmStartReport, WarmStartStage, run_warm_start};
