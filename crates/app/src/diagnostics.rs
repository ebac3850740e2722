//! Fault detection on the estimated pack state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Alarm limits. A reading strictly beyond a limit raises the fault.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaultThresholds {
    /// %
    pub low_soc: f64,
    /// %
    pub critical_soc: f64,
    /// SoC alarms are silent at or below this level; protection handles it.
    pub depleted_soc: f64,
    /// V
    pub overvoltage: f64,
    /// V
    pub undervoltage: f64,
    /// %
    pub min_state_of_health: f64,
    /// °C
    pub max_temperature: f64,
    /// °C
    pub min_temperature: f64,
    /// Ω, EIS magnitude at the diagnostic frequency
    pub max_impedance: f64,
    /// Ω
    pub max_internal_resistance: f64,
}

impl Default for FaultThresholds {
    fn default() -> Self {
        FaultThresholds {
            low_soc: 10.0,
            critical_soc: 5.0,
            depleted_soc: 0.1,
            overvoltage: 4.25,
            undervoltage: 2.8,
            min_state_of_health: 80.0,
            max_temperature: 50.0,
            min_temperature: -5.0,
            max_impedance: 0.15,
            max_internal_resistance: 0.1,
        }
    }
}

/// Estimated state the checks run against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackReadings {
    pub soc: f64,
    pub voltage: f64,
    pub temperature: f64,
    pub state_of_health: f64,
    pub eis_impedance: f64,
    pub internal_resistance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FaultKind {
    LowSoc,
    CriticalSoc,
    Overvoltage,
    Undervoltage,
    LowStateOfHealth,
    HighTemperature,
    LowTemperature,
    HighImpedance,
    HighInternalResistance,
}

/// A raised fault with the reading that tripped it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fault {
    pub kind: FaultKind,
    pub value: f64,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FaultKind::LowSoc => write!(f, "low SoC: {:.1} %", self.value),
            FaultKind::CriticalSoc => write!(f, "critical SoC: {:.1} %, charge immediately", self.value),
            FaultKind::Overvoltage => write!(f, "overvoltage: {:.3} V", self.value),
            FaultKind::Undervoltage => write!(f, "undervoltage: {:.3} V", self.value),
            FaultKind::LowStateOfHealth => write!(f, "capacity fade: SoH {:.1} %", self.value),
            FaultKind::HighTemperature => write!(f, "high temperature: {:.1} °C", self.value),
            FaultKind::LowTemperature => write!(f, "low temperature: {:.1} °C", self.value),
            FaultKind::HighImpedance => write!(f, "EIS impedance {:.1} mΩ", self.value * 1000.0),
            FaultKind::HighInternalResistance => write!(f, "internal resistance {:.1} mΩ", self.value * 1000.0),
        }
    }
}

pub fn check_faults(readings: &PackReadings, thresholds: &FaultThresholds) -> Vec<Fault> {
    let mut faults = Vec::new();
    let mut raise = |kind, value| faults.push(Fault { kind, value });

    let soc = readings.soc;
    if soc < thresholds.low_soc && soc > thresholds.depleted_soc {
        raise(FaultKind::LowSoc, soc);
    }
    if soc < thresholds.critical_soc && soc > thresholds.depleted_soc {
        raise(FaultKind::CriticalSoc, soc);
    }

    if readings.voltage > thresholds.overvoltage {
        raise(FaultKind::Overvoltage, readings.voltage);
    }
    if readings.voltage < thresholds.undervoltage {
        raise(FaultKind::Undervoltage, readings.voltage);
    }

    if readings.state_of_health < thresholds.min_state_of_health {
        raise(FaultKind::LowStateOfHealth, readings.state_of_health);
    }

    if readings.temperature > thresholds.max_temperature {
        raise(FaultKind::HighTemperature, readings.temperature);
    } else if readings.temperature < thresholds.min_temperature {
        raise(FaultKind::LowTemperature, readings.temperature);
    }

    if readings.eis_impedance > thresholds.max_impedance {
        raise(FaultKind::HighImpedance, readings.eis_impedance);
    }
    if readings.internal_resistance > thresholds.max_internal_resistance {
        raise(FaultKind::HighInternalResistance, readings.internal_resistance);
    }

    faults
}
