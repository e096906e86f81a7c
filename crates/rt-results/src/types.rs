//! Result data types.

use serde::{Deserialize, Serialize};

pub type RunId = String;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunManifest {
    pub run_id: RunId,
    pub case_name: String,
    pub timestamp: String,
    pub solver_version: String,
    pub termination: TerminationKind,
    pub target_pa: f64,
    pub control_iterations: usize,
    /// Solver iteration counter when the control loop stopped.
    pub controlling_end_iteration: u64,
    /// Solver iteration counter after settling.
    pub total_iterations: u64,
    pub final_actuation_rad_s: f64,
    pub final_output_pa: f64,
    pub settled_output_pa: f64,
    /// Values of the recorded monitors after settling.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub settled_monitors: Vec<MonitorValue>,
}

impl RunManifest {
    /// Ended on the step cap; the operating point is not converged.
    pub fn is_provisional(&self) -> bool {
        self.termination == TerminationKind::StepCapExhausted
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TerminationKind {
    Converged,
    StepCapExhausted,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IterationRecord {
    pub index: usize,
    pub solver_iteration: u64,
    pub actuation_before_rad_s: f64,
    pub actuation_after_rad_s: f64,
    pub output_before_pa: f64,
    pub output_after_pa: f64,
    pub step_count: u32,
    /// Branch of the actuation law that produced this step.
    pub regime: String,
    pub within_target: bool,
    pub residuals_ok: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub monitors: Vec<MonitorValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorValue {
    pub name: String,
    pub value: f64,
}

impl MonitorValue {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Current time as an RFC 3339 timestamp.
pub fn timestamp_now() -> String {
    chrono::Utc::now().to_rfc3339()
}
