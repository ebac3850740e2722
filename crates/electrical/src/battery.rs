//! Equivalent-circuit battery model: open-circuit voltage, ohmic resistance and
//! capacity fade.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::curve::{Curve, soc_ocv_curve, temperature_efficiency_curve};

/// Fraction of rated capacity lost per full cycle.
pub const CAPACITY_FADE_PER_CYCLE: f64 = 0.0002;
/// Retained capacity never drops below this fraction of rated capacity.
pub const MIN_RETAINED_CAPACITY: f64 = 0.6;
/// Resistance multiplier reached at 0 % state of health.
pub const AGED_RESISTANCE_GAIN: f64 = 0.5;
/// Margin around the rated voltage window used to clamp terminal voltage.
pub const VOLTAGE_MARGIN: f64 = 0.5;

/// Inverse-lookup fallback used when the OCV curve is empty.
const FALLBACK_SOC: f64 = 50.0;
/// Efficiency fallback used when the efficiency curve is empty.
const FALLBACK_EFFICIENCY: f64 = 1.0;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("capacity must be positive and finite, got {0} Ah")]
    InvalidCapacity(f64),
    #[error("base resistance must be positive and finite, got {0} ohm")]
    InvalidResistance(f64),
    #[error("voltage window is empty: min {min} V, max {max} V")]
    InvalidVoltageWindow { min: f64, max: f64 },
    #[error("open-circuit voltage curve must not decrease with state of charge")]
    NonMonotonicOcv,
}

/// Static pack parameters, fixed for the lifetime of a model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatteryConfiguration {
    pub capacity_ah: f64,
    pub nominal_voltage: f64,
    pub max_voltage: f64,
    pub min_voltage: f64,
    pub base_resistance: f64,
}

impl Default for BatteryConfiguration {
    fn default() -> Self {
        BatteryConfiguration {
            capacity_ah: 100.0,
            nominal_voltage: 3.7,
            max_voltage: 4.2,
            min_voltage: 2.8,
            base_resistance: 0.05,
        }
    }
}

impl BatteryConfiguration {
    /// Default Li-ion parameters scaled to the given capacity.
    pub fn with_capacity(capacity_ah: f64) -> Self {
        BatteryConfiguration {
            capacity_ah,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if !(self.capacity_ah.is_finite() && self.capacity_ah > 0.0) {
            return Err(ModelError::InvalidCapacity(self.capacity_ah));
        }
        if !(self.base_resistance.is_finite() && self.base_resistance > 0.0) {
            return Err(ModelError::InvalidResistance(self.base_resistance));
        }
        if !(self.min_voltage.is_finite() && self.max_voltage.is_finite())
            || self.min_voltage >= self.max_voltage
        {
            return Err(ModelError::InvalidVoltageWindow {
                min: self.min_voltage,
                max: self.max_voltage,
            });
        }
        Ok(())
    }
}

/// Resistance multiplier for the state of charge; the cell is stiffest
/// mid-range and climbs steeply near empty and full.
pub fn soc_resistance_factor(soc: f64) -> f64 {
    if soc < 10.0 || soc > 95.0 {
        1.8
    } else if soc < 20.0 || soc > 80.0 {
        1.3
    } else {
        1.0
    }
}

/// Resistance multiplier for ambient temperature; 10–40 °C is nominal.
pub fn temperature_resistance_factor(temperature: f64) -> f64 {
    if temperature < 0.0 {
        1.7
    } else if temperature < 10.0 {
        1.4
    } else if temperature > 50.0 {
        1.6
    } else if temperature > 40.0 {
        1.2
    } else {
        1.0
    }
}

/// Fraction of rated capacity still available after `cycle_count` cycles.
pub fn retained_capacity_fraction(cycle_count: u32) -> f64 {
    (1.0 - f64::from(cycle_count) * CAPACITY_FADE_PER_CYCLE).max(MIN_RETAINED_CAPACITY)
}

/// Equivalent-circuit model of one pack: OCV source in series with an
/// SoC-, temperature- and age-dependent ohmic resistance.
#[derive(Debug, Clone)]
pub struct EquivalentCircuit {
    config: BatteryConfiguration,
    ocv_curve: Curve,
    efficiency_curve: Curve,
}

impl EquivalentCircuit {
    pub fn new(config: BatteryConfiguration) -> Result<Self, ModelError> {
        Self::with_curves(config, soc_ocv_curve(), temperature_efficiency_curve())
    }

    pub fn with_curves(
        config: BatteryConfiguration,
        ocv_curve: Curve,
        efficiency_curve: Curve,
    ) -> Result<Self, ModelError> {
        config.validate()?;
        if !ocv_curve.is_non_decreasing() {
            return Err(ModelError::NonMonotonicOcv);
        }
        if ocv_curve.is_empty() {
            log::warn!(
                "empty OCV curve, falling back to nominal {} V",
                config.nominal_voltage
            );
        }
        Ok(EquivalentCircuit {
            config,
            ocv_curve,
            efficiency_curve,
        })
    }

    pub fn config(&self) -> &BatteryConfiguration {
        &self.config
    }

    pub fn ocv_curve(&self) -> &Curve {
        &self.ocv_curve
    }

    pub fn open_circuit_voltage(&self, soc: f64) -> f64 {
        self.ocv_curve
            .interpolate(soc)
            .unwrap_or(self.config.nominal_voltage)
    }

    /// Inverse of [`Self::open_circuit_voltage`].
    pub fn soc_from_open_circuit_voltage(&self, ocv: f64) -> f64 {
        self.ocv_curve.inverse_interpolate(ocv).unwrap_or(FALLBACK_SOC)
    }

    pub fn temperature_efficiency(&self, temperature: f64) -> f64 {
        self.efficiency_curve
            .interpolate(temperature)
            .unwrap_or(FALLBACK_EFFICIENCY)
    }

    pub fn effective_capacity(&self, cycle_count: u32) -> f64 {
        self.config.capacity_ah * retained_capacity_fraction(cycle_count)
    }

    /// State of health in percent of rated capacity.
    pub fn state_of_health(&self, cycle_count: u32) -> f64 {
        self.effective_capacity(cycle_count) / self.config.capacity_ah * 100.0
    }

    pub fn internal_resistance(&self, soc: f64, temperature: f64, cycle_count: u32) -> f64 {
        let soh = self.state_of_health(cycle_count).max(0.0);
        let soh_factor = 1.0 + (100.0 - soh) / 100.0 * AGED_RESISTANCE_GAIN;

        self.config.base_resistance
            * soc_resistance_factor(soc)
            * temperature_resistance_factor(temperature)
            * soh_factor
    }

    /// Terminal voltage under load, clamped to the practical envelope around
    /// the rated voltage window.
    pub fn terminal_voltage(&self, soc: f64, current: f64, temperature: f64, cycle_count: u32) -> f64 {
        let drop = current * self.internal_resistance(soc, temperature, cycle_count);
        self.clamp_voltage(self.open_circuit_voltage(soc) - drop)
    }

    pub fn clamp_voltage(&self, voltage: f64) -> f64 {
        voltage.clamp(
            self.config.min_voltage - VOLTAGE_MARGIN,
            self.config.max_voltage + VOLTAGE_MARGIN,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use proptest::prelude::*;

    fn model() -> EquivalentCircuit {
        EquivalentCircuit::new(BatteryConfiguration::with_capacity(100.0)).unwrap()
    }

    #[test]
    fn test_rejects_non_positive_capacity() {
        for capacity in [0.0, -5.0, f64::NAN] {
            let err = EquivalentCircuit::new(BatteryConfiguration::with_capacity(capacity)).unwrap_err();
            assert!(matches!(err, ModelError::InvalidCapacity(_)));
        }
    }

    #[test]
    fn test_rejects_inverted_voltage_window() {
        let config = BatteryConfiguration {
            min_voltage: 4.2,
            max_voltage: 2.8,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ModelError::InvalidVoltageWindow { .. })
        ));
    }

    #[test]
    fn test_rejects_decreasing_ocv_curve() {
        let falling = Curve::new([(0.0, 4.2), (100.0, 2.8)]);
        let err = EquivalentCircuit::with_curves(
            BatteryConfiguration::default(),
            falling,
            temperature_efficiency_curve(),
        )
        .unwrap_err();
        assert_eq!(err, ModelError::NonMonotonicOcv);
    }

    #[test]
    fn test_empty_curves_fall_back() {
        let config = BatteryConfiguration::default();
        let model = EquivalentCircuit::with_curves(
            config,
            Curve::new(Vec::<(f64, f64)>::new()),
            Curve::new(Vec::<(f64, f64)>::new()),
        )
        .unwrap();
        assert_abs_diff_eq!(model.open_circuit_voltage(42.0), config.nominal_voltage);
        assert_abs_diff_eq!(model.temperature_efficiency(-10.0), 1.0);
        assert_abs_diff_eq!(model.soc_from_open_circuit_voltage(3.9), 50.0);
    }

    #[test]
    fn test_soc_factor_bands() {
        assert_abs_diff_eq!(soc_resistance_factor(5.0), 1.8);
        assert_abs_diff_eq!(soc_resistance_factor(96.0), 1.8);
        assert_abs_diff_eq!(soc_resistance_factor(15.0), 1.3);
        assert_abs_diff_eq!(soc_resistance_factor(85.0), 1.3);
        assert_abs_diff_eq!(soc_resistance_factor(50.0), 1.0);
        assert_abs_diff_eq!(soc_resistance_factor(20.0), 1.0);
        assert_abs_diff_eq!(soc_resistance_factor(80.0), 1.0);
    }

    #[test]
    fn test_temperature_factor_bands() {
        assert_abs_diff_eq!(temperature_resistance_factor(-5.0), 1.7);
        assert_abs_diff_eq!(temperature_resistance_factor(5.0), 1.4);
        assert_abs_diff_eq!(temperature_resistance_factor(25.0), 1.0);
        assert_abs_diff_eq!(temperature_resistance_factor(45.0), 1.2);
        assert_abs_diff_eq!(temperature_resistance_factor(55.0), 1.6);
        assert_abs_diff_eq!(temperature_resistance_factor(40.0), 1.0);
        assert_abs_diff_eq!(temperature_resistance_factor(10.0), 1.0);
    }

    #[test]
    fn test_fresh_cell_resistance_is_base() {
        let model = model();
        assert_relative_eq!(model.internal_resistance(50.0, 25.0, 0), 0.05);
    }

    #[test]
    fn test_resistance_compounds_factors() {
        let model = model();
        // 1000 cycles: SoH 80 %, soh factor 1.1
        let expected = 0.05 * 1.8 * 1.7 * 1.1;
        assert_relative_eq!(model.internal_resistance(5.0, -10.0, 1000), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_capacity_fade_and_floor() {
        let model = model();
        assert_relative_eq!(model.effective_capacity(0), 100.0);
        assert_relative_eq!(model.effective_capacity(1000), 80.0, epsilon = 1e-9);
        assert_relative_eq!(model.effective_capacity(2000), 60.0, epsilon = 1e-9);
        assert_relative_eq!(model.effective_capacity(u32::MAX), 60.0, epsilon = 1e-9);
        assert_relative_eq!(model.state_of_health(u32::MAX), 60.0, epsilon = 1e-9);
    }

    #[test]
    fn test_terminal_voltage_at_rest_is_ocv() {
        let model = model();
        assert_abs_diff_eq!(model.terminal_voltage(50.0, 0.0, 25.0, 0), 3.80, epsilon = 1e-12);
    }

    #[test]
    fn test_terminal_voltage_clamped() {
        let model = model();
        // Absurd discharge current pins to min - 0.5
        assert_abs_diff_eq!(model.terminal_voltage(50.0, 1.0e4, 25.0, 0), 2.3, epsilon = 1e-12);
        // Absurd charge current pins to max + 0.5
        assert_abs_diff_eq!(model.terminal_voltage(50.0, -1.0e4, 25.0, 0), 4.7, epsilon = 1e-12);
    }

    #[test]
    fn test_configuration_from_partial_json() {
        let config: BatteryConfiguration = serde_json::from_str(r#"{"capacity_ah": 2.5}"#).unwrap();
        assert_abs_diff_eq!(config.capacity_ah, 2.5);
        assert_abs_diff_eq!(config.base_resistance, 0.05);
        assert!(config.validate().is_ok());
    }

    proptest! {
        #[test]
        fn prop_state_of_health_non_increasing(c1 in 0u32..100_000, c2 in 0u32..100_000) {
            let model = model();
            let (lo, hi) = if c1 <= c2 { (c1, c2) } else { (c2, c1) };
            prop_assert!(model.state_of_health(lo) >= model.state_of_health(hi));
            prop_assert!(model.state_of_health(hi) >= 60.0 - 1e-9);
        }

        #[test]
        fn prop_resistance_positive(soc in -10.0f64..110.0, temp in -40.0f64..80.0, cycles in 0u32..10_000) {
            prop_assert!(model().internal_resistance(soc, temp, cycles) > 0.0);
        }
    }
}
