use serde::{Deserialize, Serialize};

/// One set of pack measurements taken at a single time step.
///
/// Current sign convention: positive = discharge, negative = charge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    pub current: f64,
    pub voltage: f64,
    pub temperature: f64,
    pub cycle_count: u32,
}

impl Default for SensorSample {
    fn default() -> Self {
        SensorSample {
            current: 0.0,
            voltage: 0.0,
            temperature: 25.0,
            cycle_count: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimContext {
    pub dt: f64,
    pub t: f64,
}

impl SimContext {
    /// Context for the tick that follows this one.
    pub fn advance(self) -> Self {
        SimContext {
            dt: self.dt,
            t: self.t + self.dt,
        }
    }
}

pub trait Model {
    fn reset(&mut self);
}

/// A source of current/temperature readings and voltage measurements.
///
/// Implemented by synthetic generators as well as real sensor front-ends.
/// `sample_current` is called first in every tick; implementations may use it
/// to advance their notion of time.
pub trait SensorModel: Model {
    fn sample_current(&mut self, ctx: SimContext) -> f64;
    fn sample_temperature(&mut self, ctx: SimContext) -> f64;
    fn measure_voltage(&mut self, ctx: SimContext, ideal_voltage: f64) -> f64;
}
