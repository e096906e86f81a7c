//! Case schema definitions.
//!
//! Quantities are SI with the unit in the field name. Every section except
//! the target has defaults matching the production tuning.

use serde::{Deserialize, Serialize};

pub const LATEST_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Case {
    pub version: u32,
    pub name: String,
    pub target: TargetDef,
    #[serde(default)]
    pub actuation: ActuationDef,
    #[serde(default)]
    pub convergence: ConvergenceDef,
    #[serde(default)]
    pub warm_start: WarmStartDef,
    /// Iterations run with the step cap disabled after the loop stops.
    #[serde(default = "default_settle_steps")]
    pub settle_steps: u32,
    /// Extra monitors recorded after every control iteration.
    #[serde(default)]
    pub monitors: Vec<String>,
    #[serde(default)]
    pub fluid: FluidDef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plant: Option<PlantDef>,
}

impl Case {
    /// Case with default tuning for the given target pressure rise.
    pub fn new(name: impl Into<String>, target_pa: f64) -> Self {
        Self {
            version: LATEST_VERSION,
            name: name.into(),
            target: TargetDef {
                monitor: default_output_monitor(),
                value_pa: target_pa,
            },
            actuation: ActuationDef::default(),
            convergence: ConvergenceDef::default(),
            warm_start: WarmStartDef::default(),
            settle_steps: default_settle_steps(),
            monitors: Vec::new(),
            fluid: FluidDef::default(),
            plant: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetDef {
    /// Monitor holding the controlled pressure rise.
    #[serde(default = "default_output_monitor")]
    pub monitor: String,
    pub value_pa: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ActuationDef {
    /// Field function holding the rotation rate.
    pub field: String,
    /// Rotation rate written before the first decision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_rad_s: Option<f64>,
    pub max_step_rad_s: f64,
    pub damping: f64,
    pub reverse_increment_rad_s: f64,
    pub responsive_steps: u32,
    pub reverse_steps: u32,
}

impl Default for ActuationDef {
    fn default() -> Self {
        Self {
            field: "rotationSpeed".to_string(),
            initial_rad_s: None,
            max_step_rad_s: 50.0,
            damping: 0.05,
            reverse_increment_rad_s: 10.0,
            responsive_steps: 100,
            reverse_steps: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConvergenceDef {
    pub max_steps: u64,
    pub tolerance_pa: f64,
    pub residual_flags: Vec<String>,
}

impl Default for ConvergenceDef {
    fn default() -> Self {
        Self {
            max_steps: 10_000,
            tolerance_pa: 10.0,
            residual_flags: [
                "Continuity Criterion",
                "X-momentum Criterion",
                "Y-momentum Criterion",
                "Z-momentum Criterion",
                "Tke Criterion",
                "Sdr Criterion",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WarmStartDef {
    /// Field function holding the scalar source term.
    pub source_field: String,
    /// Stand-in source definition while the scalar is primed.
    pub negligible_definition: String,
    pub prime_steps: u32,
    pub settle_steps: u32,
}

impl Default for WarmStartDef {
    fn default() -> Self {
        Self {
            source_field: "previousHemolysis".to_string(),
            negligible_definition: "$thresholdss*1e-15".to_string(),
            prime_steps: 10,
            settle_steps: 10,
        }
    }
}

/// Working fluid and operating point data used for derived metrics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FluidDef {
    pub density_kg_m3: f64,
    pub mass_flow_kg_s: f64,
    /// Impeller outer diameter, for the specific diameter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotor_diameter_m: Option<f64>,
}

impl Default for FluidDef {
    fn default() -> Self {
        Self {
            density_kg_m3: 1059.0,
            mass_flow_kg_s: 0.01065,
            rotor_diameter_m: None,
        }
    }
}

/// Surrogate plant parameters for dry runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlantDef {
    pub pressure_coeff: f64,
    pub pressure_offset_pa: f64,
    pub torque_coeff: f64,
    pub relaxation: f64,
    pub initial_rotation_rad_s: f64,
    pub residual_decay: f64,
    pub residual_kick: f64,
    pub residual_threshold: f64,
    pub hemolysis_coeff: f64,
    pub max_rotation_rad_s: f64,
}

impl Default for PlantDef {
    fn default() -> Self {
        Self {
            pressure_coeff: 0.15,
            pressure_offset_pa: 1500.0,
            torque_coeff: 2.0e-8,
            relaxation: 0.05,
            initial_rotation_rad_s: 100.0,
            residual_decay: 0.97,
            residual_kick: 1.0,
            residual_threshold: 1.0e-3,
            hemolysis_coeff: 1.0e-11,
            max_rotation_rad_s: 10_000.0,
        }
    }
}

fn default_output_monitor() -> String {
    "presDrop".to_string()
}

fn default_settle_steps() -> u32 {
    2000
}
