//! Actuation control and convergence logic for rotortune.
//!
//! This crate holds the two pure decision components of the control loop:
//! the actuation law that turns a measured pressure rise into the next rotor
//! rotation rate, and the convergence evaluator that decides when the loop
//! may stop.
//!
//! # Architecture
//!
//! - Both components are pure functions of their inputs; neither touches the
//!   solver. The loop driver in `rt-sim` reads the solver, calls into this
//!   crate, and applies the result.
//! - Tunable constants (damping, reverse-regime increment, step hints,
//!   tolerances) are plain configuration fields with the empirically proven
//!   values as defaults.

pub mod actuation;
pub mod convergence;
pub mod error;

pub use actuation::{ActuationLaw, ActuationStep, Regime, next_actuation};
pub use convergence::{
    ConvergenceCriteria, Evaluation, FlagCombination, FlagReading, StopDecision, is_converged,
    residuals_ok, stop_decision, within_target,
};
pub use error::{ControlError, ControlResult};
