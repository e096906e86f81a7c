//! Names of the monitors, criteria and field functions of a rotor case.
//!
//! These match the objects the case setup creates in the flow solver, so the
//! control loop and the solver adapters agree on them without configuration.

/// Outlet-minus-inlet pressure report.
pub const PRESSURE_RISE_MONITOR: &str = "presDrop";
/// Rotor moment about the rotation axis.
pub const TORQUE_MONITOR: &str = "Torque";
/// Mass-flow averaged hemolysis index at the outlet.
pub const HEMOLYSIS_MONITOR: &str = "HIOutlet";
/// Expression report echoing the applied rotation rate.
pub const ROTATION_MONITOR: &str = "rotationSpeed";

/// Field function holding the rotor rotation rate as a literal.
pub const ROTATION_FIELD: &str = "rotationSpeed";
/// Field function feeding the previous-step hemolysis source back.
pub const SOURCE_FIELD: &str = "previousHemolysis";
/// Stand-in source definition used while the scalar field is primed.
pub const NEGLIGIBLE_SOURCE_DEFINITION: &str = "$thresholdss*1e-15";

/// Residual criteria that enter the stop predicate by default.
pub const STANDARD_RESIDUAL_FLAGS: [&str; 6] = [
    "Continuity Criterion",
    "X-momentum Criterion",
    "Y-momentum Criterion",
    "Z-momentum Criterion",
    "Tke Criterion",
    "Sdr Criterion",
];

/// Residual criteria of the gamma-ReTheta transition model.
pub const TRANSITION_RESIDUAL_FLAGS: [&str; 2] = ["ReTheta_t Criterion", "Intermittency Criterion"];
