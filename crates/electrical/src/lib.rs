//! Battery electrical models: lookup curves, the equivalent-circuit model with
//! capacity fade, and the Randles-cell impedance model.

pub mod analysis;
pub mod battery;
pub mod curve;
pub mod impedance;

pub use battery::{BatteryConfiguration, EquivalentCircuit, ModelError};
pub use curve::{Curve, CurvePoint};
pub use impedance::{ImpedanceConstants, ImpedanceModel, ImpedanceParameters};
