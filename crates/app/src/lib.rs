//! Headless battery-management simulation: a synthetic environment drives the
//! Kalman SoC estimator tick by tick while fault diagnostics watch the
//! estimated state.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod runner;

pub use config::SimulationConfig;
pub use diagnostics::{Fault, FaultKind, FaultThresholds, PackReadings, check_faults};
pub use error::{AppError, Result};
pub use runner::{RunSummary, Simulation, StopReason, TickRecord};
