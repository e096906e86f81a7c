//! Derived operating-point metrics for a rotary pump.
//!
//! All quantities are evaluated from monitor readings taken at the same
//! solver iteration. The torque follows the moment-monitor convention: it is
//! the moment the fluid exerts on the rotor, so it is negative while the
//! rotor does work on the fluid.

use crate::units::constants::G0_MPS2;
use crate::units::{
    AngularVelocity, Density, Length, MassRate, Power, Pressure, Ratio, Torque, VolumeRate, m,
    m3ps, unitless, watt,
};

/// Pump operating point assembled from monitor readings.
#[derive(Clone, Copy, Debug)]
pub struct OperatingPoint {
    /// Outlet minus inlet static pressure.
    pub pressure_rise: Pressure,
    /// Moment of the fluid on the rotor about the rotation axis.
    pub torque: Torque,
    pub rotation_rate: AngularVelocity,
    pub mass_flow: MassRate,
    pub density: Density,
}

impl OperatingPoint {
    pub fn volume_flow(&self) -> VolumeRate {
        m3ps(self.mass_flow.value / self.density.value)
    }

    /// Power delivered to the fluid, `Δp · Q`.
    pub fn hydraulic_power(&self) -> Power {
        watt(self.pressure_rise.value * self.volume_flow().value)
    }

    /// Power drawn from the shaft, `-τ · ω`.
    pub fn shaft_power(&self) -> Power {
        watt(-self.torque.value * self.rotation_rate.value)
    }

    /// Hydraulic efficiency `Δp Q / (-τ ω)`.
    ///
    /// Returns `None` when the shaft delivers no power (turbine operation or
    /// a stalled rotor), where the ratio has no meaning.
    pub fn hydraulic_efficiency(&self) -> Option<Ratio> {
        let shaft = self.shaft_power().value;
        if !shaft.is_finite() || shaft <= 0.0 {
            return None;
        }
        Some(unitless(self.hydraulic_power().value / shaft))
    }

    /// Pressure head `Δp / (ρ g)`.
    pub fn head(&self) -> Length {
        m(self.pressure_rise.value / (self.density.value * G0_MPS2))
    }

    /// Specific work `g H` in J/kg.
    pub fn specific_work(&self) -> f64 {
        G0_MPS2 * self.head().value
    }

    /// Balje specific speed `ω √Q / (g H)^{3/4}`.
    pub fn specific_speed(&self) -> Option<f64> {
        let y = self.specific_work();
        if y.is_nan() || y <= 0.0 {
            return None;
        }
        Some(self.rotation_rate.value * self.volume_flow().value.sqrt() / y.powf(0.75))
    }

    /// Balje specific diameter `D (g H)^{1/4} / √Q` for rotor diameter `D`.
    pub fn specific_diameter(&self, diameter: Length) -> Option<f64> {
        let y = self.specific_work();
        let q = self.volume_flow().value;
        if y.is_nan() || y <= 0.0 || q.is_nan() || q <= 0.0 {
            return None;
        }
        Some(diameter.value * y.powf(0.25) / q.sqrt())
    }
}
