//! State-of-charge estimation with a scalar Kalman filter.
//!
//! Coulomb counting predicts the SoC from the integrated current; the measured
//! terminal voltage, corrected for the IR drop and mapped back through the OCV
//! curve, provides the measurement. The gain blends the two by their relative
//! uncertainty: right after a reset the covariance is large and the voltage
//! dominates, as it shrinks the prediction takes over.

use electrical::{BatteryConfiguration, EquivalentCircuit, ModelError};
use serde::{Deserialize, Serialize};
use simcore::{SensorSample, SimContext};
use thiserror::Error;

const SECONDS_PER_HOUR: f64 = 3600.0;
/// Temperature assumed after a reset (°C).
const RESET_TEMPERATURE: f64 = 25.0;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EstimatorError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("noise covariances must be non-negative and finite (Q = {process}, R = {measurement})")]
    InvalidTuning { process: f64, measurement: f64 },
    #[error("time step must be positive and finite, got {0} s")]
    InvalidTimeStep(f64),
    #[error("non-finite {0} input")]
    NonFiniteInput(&'static str),
}

/// Filter tuning constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorTuning {
    /// Q, added to the covariance every prediction (%²)
    pub process_noise: f64,
    /// R, variance of the voltage-derived SoC (%²)
    pub measurement_noise: f64,
    /// P after a reset
    pub initial_covariance: f64,
}

impl Default for EstimatorTuning {
    fn default() -> Self {
        EstimatorTuning {
            process_noise: 0.01,
            measurement_noise: 0.1,
            initial_covariance: 1.0,
        }
    }
}

impl EstimatorTuning {
    pub fn validate(&self) -> Result<(), EstimatorError> {
        let ok = |v: f64| v.is_finite() && v >= 0.0;
        // With R = 0 and Q = 0 the covariance collapses and the gain becomes 0/0.
        let degenerate = self.measurement_noise == 0.0 && self.process_noise == 0.0;
        if !(ok(self.process_noise) && ok(self.measurement_noise) && ok(self.initial_covariance)) || degenerate {
            return Err(EstimatorError::InvalidTuning {
                process: self.process_noise,
                measurement: self.measurement_noise,
            });
        }
        Ok(())
    }
}

/// Mutable filter state, owned by the estimator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EstimatorState {
    /// %
    pub soc: f64,
    pub covariance: f64,
    /// V
    pub terminal_voltage: f64,
    /// °C
    pub last_temperature: f64,
    pub last_cycle_count: u32,
}

/// Intermediate values of one filter step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateReport {
    pub predicted_soc: f64,
    pub voltage_soc: f64,
    pub kalman_gain: f64,
}

#[derive(Debug, Clone)]
pub struct SocEstimator {
    model: EquivalentCircuit,
    tuning: EstimatorTuning,
    state: EstimatorState,
}

impl SocEstimator {
    /// Estimator for a pack of the given capacity with stock Li-ion
    /// parameters, starting full.
    pub fn new(capacity_ah: f64) -> Result<Self, EstimatorError> {
        Self::with_config(BatteryConfiguration::with_capacity(capacity_ah), EstimatorTuning::default())
    }

    pub fn with_config(config: BatteryConfiguration, tuning: EstimatorTuning) -> Result<Self, EstimatorError> {
        Self::with_model(EquivalentCircuit::new(config)?, tuning)
    }

    pub fn with_model(model: EquivalentCircuit, tuning: EstimatorTuning) -> Result<Self, EstimatorError> {
        tuning.validate()?;
        log::debug!(
            "SoC estimator for {} Ah pack (Q = {}, R = {})",
            model.config().capacity_ah,
            tuning.process_noise,
            tuning.measurement_noise
        );

        let mut estimator = SocEstimator {
            model,
            tuning,
            state: EstimatorState {
                soc: 100.0,
                covariance: tuning.initial_covariance,
                terminal_voltage: 0.0,
                last_temperature: RESET_TEMPERATURE,
                last_cycle_count: 0,
            },
        };
        estimator.reset(100.0);
        Ok(estimator)
    }

    /// Reinitialise the filter at `initial_soc` (clamped to [0, 100]) with no
    /// load, room temperature and a fresh cell.
    pub fn reset(&mut self, initial_soc: f64) {
        let soc = initial_soc.clamp(0.0, 100.0);
        self.state = EstimatorState {
            soc,
            covariance: self.tuning.initial_covariance,
            terminal_voltage: self.model.terminal_voltage(soc, 0.0, RESET_TEMPERATURE, 0),
            last_temperature: RESET_TEMPERATURE,
            last_cycle_count: 0,
        };
        log::debug!("SoC estimator reset to {:.2} %", soc);
    }

    /// Advance the filter by one time step.
    ///
    /// `current` is positive for discharge. On error the state is untouched.
    pub fn update_soc(
        &mut self,
        current: f64,
        measured_voltage: f64,
        temperature: f64,
        cycle_count: u32,
        dt: f64,
    ) -> Result<UpdateReport, EstimatorError> {
        if !(dt.is_finite() && dt > 0.0) {
            log::warn!("rejected SoC update with time step {dt} s");
            return Err(EstimatorError::InvalidTimeStep(dt));
        }
        for (name, value) in [("current", current), ("voltage", measured_voltage), ("temperature", temperature)] {
            if !value.is_finite() {
                log::warn!("rejected SoC update with {name} = {value}");
                return Err(EstimatorError::NonFiniteInput(name));
            }
        }

        // Predict: coulomb counting against the aged capacity.
        let efficiency = self.model.temperature_efficiency(temperature);
        let capacity = self.model.effective_capacity(cycle_count);
        let delta_ah = current * dt / SECONDS_PER_HOUR * efficiency;
        let predicted_soc = (self.state.soc - delta_ah / capacity * 100.0).clamp(0.0, 100.0);

        let mut covariance = self.state.covariance + self.tuning.process_noise;

        // Measure: undo the IR drop and invert the OCV curve.
        let resistance = self.model.internal_resistance(predicted_soc, temperature, cycle_count);
        let estimated_ocv = measured_voltage + current * resistance;
        let voltage_soc = self.model.soc_from_open_circuit_voltage(estimated_ocv);

        // Correct.
        let kalman_gain = covariance / (covariance + self.tuning.measurement_noise);
        let soc = (predicted_soc + kalman_gain * (voltage_soc - predicted_soc)).clamp(0.0, 100.0);
        covariance *= 1.0 - kalman_gain;

        self.state = EstimatorState {
            soc,
            covariance: covariance.max(0.0),
            terminal_voltage: self.model.terminal_voltage(soc, current, temperature, cycle_count),
            last_temperature: temperature,
            last_cycle_count: cycle_count,
        };

        log::trace!(
            "SoC predict {:.4} % measure {:.4} % gain {:.4} -> {:.4} % ({:.3} V)",
            predicted_soc,
            voltage_soc,
            kalman_gain,
            soc,
            self.state.terminal_voltage
        );

        Ok(UpdateReport {
            predicted_soc,
            voltage_soc,
            kalman_gain,
        })
    }

    /// [`Self::update_soc`] driven by a sensor sample and the tick context.
    pub fn update(&mut self, ctx: SimContext, sample: &SensorSample) -> Result<UpdateReport, EstimatorError> {
        self.update_soc(
            sample.current,
            sample.voltage,
            sample.temperature,
            sample.cycle_count,
            ctx.dt,
        )
    }

    pub fn soc(&self) -> f64 {
        self.state.soc
    }

    pub fn terminal_voltage(&self) -> f64 {
        self.state.terminal_voltage
    }

    pub fn covariance(&self) -> f64 {
        self.state.covariance
    }

    /// Internal resistance at the current estimate and the last observed
    /// temperature and cycle count.
    pub fn internal_resistance(&self) -> f64 {
        self.model.internal_resistance(
            self.state.soc,
            self.state.last_temperature,
            self.state.last_cycle_count,
        )
    }

    pub fn effective_capacity(&self, cycle_count: u32) -> f64 {
        self.model.effective_capacity(cycle_count)
    }

    pub fn state_of_health(&self, cycle_count: u32) -> f64 {
        self.model.state_of_health(cycle_count)
    }

    pub fn state(&self) -> &EstimatorState {
        &self.state
    }

    pub fn model(&self) -> &EquivalentCircuit {
        &self.model
    }

    pub fn configuration(&self) -> &BatteryConfiguration {
        self.model.config()
    }

    pub fn tuning(&self) -> &EstimatorTuning {
        &self.tuning
    }
}
