//! rt-core: shared foundation for rotortune.
//!
//! Contains:
//! - units (uom SI types + constructors for rotor and pressure quantities)
//! - numeric (finite checks, tolerance bands, literal parsing)
//! - performance (derived pump operating-point metrics)
//! - names (monitor, criterion and field-function names of a rotor case)
//! - error (shared error types)

pub mod error;
pub mod names;
pub mod numeric;
pub mod performance;
pub mod units;

pub use error::{RtError, RtResult};
pub use numeric::*;
pub use performance::OperatingPoint;
pub use units::*;
