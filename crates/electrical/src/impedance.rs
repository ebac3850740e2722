//! Electrochemical impedance spectroscopy (EIS) model.
//!
//! Parameters of a Randles cell, `Rs + (Rct || Cdl) + Zw`, derived from
//! state of charge, temperature and cycle count. The Warburg element is taken
//! as `W / sqrt(omega) * (1 - j)`, contributing equally to the real and
//! (negative) imaginary parts.
//!
//! The model is an approximation: all elements are lumped at pack level and
//! the Warburg term is added in series rather than nested with `Rct`.

use std::f64::consts::PI;

use nalgebra::Complex;
use serde::{Deserialize, Serialize};

/// Reference temperature for the Arrhenius factors (25 °C) in kelvin.
const REFERENCE_TEMPERATURE_K: f64 = 298.15;
const CELSIUS_TO_KELVIN: f64 = 273.15;

/// Pack-level base values and scaling constants for the impedance model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpedanceConstants {
    pub series_resistance: f64,
    pub charge_transfer_resistance: f64,
    pub double_layer_capacitance: f64,
    pub warburg_coefficient: f64,
    /// Frequency reported with each parameter set (Hz).
    pub reference_frequency: f64,
    /// Arrhenius constant applied to resistances (K).
    pub resistance_activation: f64,
    /// Arrhenius constant applied to capacitance (K); negative so capacitance
    /// drops in the cold.
    pub capacitance_activation: f64,
    /// Per-cycle degradation rate.
    pub degradation_per_cycle: f64,
    /// Resistances age this many times faster than capacitance fades.
    pub resistance_aging_gain: f64,
    /// Capacitance never fades below this fraction.
    pub min_capacitance_fraction: f64,
}

impl Default for ImpedanceConstants {
    fn default() -> Self {
        ImpedanceConstants {
            series_resistance: 0.005,
            charge_transfer_resistance: 0.02,
            double_layer_capacitance: 1500.0,
            warburg_coefficient: 0.005,
            reference_frequency: 1000.0,
            resistance_activation: 2000.0,
            capacitance_activation: -500.0,
            degradation_per_cycle: 0.0002,
            resistance_aging_gain: 1.5,
            min_capacitance_fraction: 0.5,
        }
    }
}

/// Randles-cell parameters at one operating point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpedanceParameters {
    /// Rs (ohm)
    pub series_resistance: f64,
    /// Rct (ohm)
    pub charge_transfer_resistance: f64,
    /// Cdl (F)
    pub double_layer_capacitance: f64,
    /// W (ohm / sqrt(s))
    pub warburg_coefficient: f64,
    /// Hz
    pub frequency: f64,
}

impl ImpedanceParameters {
    /// Complex impedance at `frequency` (Hz).
    ///
    /// Falls back to a purely resistive `Rs + Rct` when the capacitance or the
    /// frequency is not positive.
    pub fn complex_impedance(&self, frequency: f64) -> Complex<f64> {
        let rs = self.series_resistance;
        let rct = self.charge_transfer_resistance;
        let cdl = self.double_layer_capacitance;

        if cdl <= 0.0 || frequency <= 0.0 {
            return Complex::new(rs + rct, 0.0);
        }

        let omega = 2.0 * PI * frequency;

        // Rct in parallel with Cdl: Rct / (1 + j*omega*Rct*Cdl)
        let parallel = Complex::new(rct, 0.0) / Complex::new(1.0, omega * rct * cdl);
        let warburg = self.warburg_coefficient / omega.sqrt();

        Complex::new(rs, 0.0) + parallel + Complex::new(warburg, -warburg)
    }

    /// Impedance magnitude `|Z|` at `frequency` (Hz).
    pub fn total_impedance_magnitude(&self, frequency: f64) -> f64 {
        if self.double_layer_capacitance <= 0.0 || frequency <= 0.0 {
            return self.series_resistance + self.charge_transfer_resistance;
        }
        self.complex_impedance(frequency).norm()
    }
}

/// Charge-transfer resistance multiplier; U-shaped, lowest mid-range.
pub fn charge_transfer_soc_factor(soc: f64) -> f64 {
    if soc < 10.0 {
        2.5
    } else if soc < 20.0 {
        1.8
    } else if soc > 90.0 {
        1.5
    } else if soc > 80.0 {
        1.2
    } else {
        1.0
    }
}

/// Double-layer capacitance multiplier; slightly lower at the extremes.
pub fn double_layer_soc_factor(soc: f64) -> f64 {
    if soc < 20.0 || soc > 80.0 { 0.8 } else { 1.0 }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ImpedanceModel {
    pub constants: ImpedanceConstants,
}

impl ImpedanceModel {
    pub fn new(constants: ImpedanceConstants) -> Self {
        ImpedanceModel { constants }
    }

    fn arrhenius(&self, activation: f64, temperature: f64) -> f64 {
        (activation * (1.0 / (temperature + CELSIUS_TO_KELVIN) - 1.0 / REFERENCE_TEMPERATURE_K)).exp()
    }

    pub fn compute_parameters(&self, soc: f64, temperature: f64, cycle_count: u32) -> ImpedanceParameters {
        let c = &self.constants;

        let temp_resistance = self.arrhenius(c.resistance_activation, temperature);
        let temp_capacitance = self.arrhenius(c.capacitance_activation, temperature);

        let cycles = f64::from(cycle_count);
        let aging_resistance = 1.0 + cycles * c.degradation_per_cycle * c.resistance_aging_gain;
        let aging_capacitance = (1.0 - cycles * c.degradation_per_cycle).max(c.min_capacitance_fraction);

        ImpedanceParameters {
            series_resistance: c.series_resistance * temp_resistance * aging_resistance,
            charge_transfer_resistance: c.charge_transfer_resistance
                * charge_transfer_soc_factor(soc)
                * temp_resistance
                * aging_resistance,
            double_layer_capacitance: c.double_layer_capacitance
                * double_layer_soc_factor(soc)
                * temp_capacitance
                * aging_capacitance,
            warburg_coefficient: c.warburg_coefficient * (temp_resistance * aging_resistance).sqrt(),
            frequency: c.reference_frequency,
        }
    }
}
