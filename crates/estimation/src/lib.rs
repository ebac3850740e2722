//! Battery state estimation.
//!
//! [`SocEstimator`] fuses coulomb counting with a voltage-derived state of
//! charge through a scalar Kalman filter. One estimator tracks one pack and is
//! not meant to be shared between threads without external serialisation;
//! independent packs get independent estimators.

pub mod soc;

pub use soc::{EstimatorError, EstimatorState, EstimatorTuning, SocEstimator, UpdateReport};
