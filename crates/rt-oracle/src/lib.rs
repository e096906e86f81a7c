//! Solver oracle interface for rotortune.
//!
//! The flow solver is an opaque iterative engine. This crate describes the
//! small surface the control loop needs from it ([`SolverOracle`]), the typed
//! adapter for the actuation value that the solver stores as text
//! ([`ActuationStore`]), and an in-process affinity-law surrogate
//! ([`AffinityPumpOracle`]) used for dry runs and tests.

pub mod error;
pub mod oracle;
pub mod store;
pub mod surrogate;

pub use error::{OracleError, OracleResult};
pub use oracle::{SolverOracle, SubSolver};
pub use store::ActuationStore;
pub use surrogate::{AffinityPumpOracle, OracleEvent, SurrogateConfig};
