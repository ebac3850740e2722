//! Run configuration, read from JSON.
//!
//! Every field has a default, so a config file only needs to name what it
//! changes:
//!
//! ```json
//! { "profile": "Drone Flight", "battery": { "capacity_ah": 5.0 }, "seed": 7 }
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

use electrical::{BatteryConfiguration, ImpedanceConstants};
use environment::SynthesizerConfig;
use estimation::EstimatorTuning;
use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::diagnostics::FaultThresholds;
use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub battery: BatteryConfiguration,
    pub tuning: EstimatorTuning,
    pub impedance: ImpedanceConstants,
    pub synthesizer: SynthesizerConfig,
    pub thresholds: FaultThresholds,
    pub seed: u64,
    /// Load profile name, see `environment::PROFILES`
    pub profile: String,
    pub current_multiplier: f64,
    /// °C
    pub base_temperature: f64,
    /// Estimator starting SoC (%)
    pub initial_soc: f64,
    /// SoC of a reference pack the sensor reads from (%). Without one the
    /// sensor reads the model at the estimate itself.
    pub true_initial_soc: Option<f64>,
    /// s
    pub dt: f64,
    /// Upper bound on the run length
    pub max_ticks: u64,
    /// One charge cycle is added every this many ticks.
    pub cycle_interval_ticks: u64,
    /// Battery protection stops the run at or below this SoC (%).
    pub cutoff_soc: f64,
    pub fault_check_interval_ticks: u64,
    /// Hz
    pub eis_frequency: f64,
    /// `off`, `error`, `warn`, `info`, `debug` or `trace`
    pub log_level: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            battery: BatteryConfiguration::default(),
            tuning: EstimatorTuning::default(),
            impedance: ImpedanceConstants::default(),
            synthesizer: SynthesizerConfig::default(),
            thresholds: FaultThresholds::default(),
            seed: 42,
            profile: "EV City Driving".to_string(),
            current_multiplier: 1.0,
            base_temperature: 25.0,
            initial_soc: 100.0,
            true_initial_soc: None,
            dt: 1.0,
            max_ticks: 86_400,
            cycle_interval_ticks: 30,
            cutoff_soc: 0.1,
            fault_check_interval_ticks: 30,
            eis_frequency: 1000.0,
            log_level: "info".to_string(),
        }
    }
}

impl SimulationConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let config: SimulationConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        log::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SimulationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the driver's own settings. Battery, tuning and synthesizer
    /// settings are checked by the components that own them.
    pub fn validate(&self) -> Result<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(AppError::InvalidConfig(format!("dt must be positive, got {}", self.dt)));
        }
        if self.cycle_interval_ticks == 0 || self.fault_check_interval_ticks == 0 {
            return Err(AppError::InvalidConfig("tick intervals must be at least 1".to_string()));
        }
        if !(self.eis_frequency.is_finite() && self.eis_frequency > 0.0) {
            return Err(AppError::InvalidConfig(format!(
                "EIS frequency must be positive, got {} Hz",
                self.eis_frequency
            )));
        }
        if !self.current_multiplier.is_finite()
            || !self.base_temperature.is_finite()
            || !self.initial_soc.is_finite()
            || self.true_initial_soc.is_some_and(|soc| !soc.is_finite())
        {
            return Err(AppError::InvalidConfig("non-finite run setting".to_string()));
        }
        self.log_level()?;
        Ok(())
    }

    pub fn log_level(&self) -> Result<LevelFilter> {
        LevelFilter::from_str(&self.log_level)
            .map_err(|_| AppError::InvalidConfig(format!("unknown log level {:?}", self.log_level)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cycle_interval_ticks, 30);
        assert_eq!(config.cutoff_soc, 0.1);
        assert_eq!(config.log_level().unwrap(), LevelFilter::Info);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = SimulationConfig::from_json_str(
            r#"{ "profile": "Drone Flight", "battery": { "capacity_ah": 5.0 }, "seed": 7, "log_level": "debug" }"#,
        )
        .unwrap();
        assert_eq!(config.profile, "Drone Flight");
        assert_eq!(config.battery.capacity_ah, 5.0);
        assert_eq!(config.battery.max_voltage, 4.2);
        assert_eq!(config.seed, 7);
        assert_eq!(config.tuning, EstimatorTuning::default());
        assert_eq!(config.true_initial_soc, None);
        assert_eq!(config.log_level().unwrap(), LevelFilter::Debug);
    }

    #[test]
    fn test_rejects_bad_settings() {
        assert!(matches!(
            SimulationConfig::from_json_str(r#"{ "dt": 0.0 }"#),
            Err(AppError::InvalidConfig(_))
        ));
        assert!(matches!(
            SimulationConfig::from_json_str(r#"{ "cycle_interval_ticks": 0 }"#),
            Err(AppError::InvalidConfig(_))
        ));
        assert!(matches!(
            SimulationConfig::from_json_str(r#"{ "log_level": "loud" }"#),
            Err(AppError::InvalidConfig(_))
        ));
        assert!(matches!(SimulationConfig::from_json_str("{ dt: 1 }"), Err(AppError::Json(_))));
        let bad_reference = SimulationConfig {
            true_initial_soc: Some(f64::NAN),
            ..Default::default()
        };
        assert!(matches!(bad_reference.validate(), Err(AppError::InvalidConfig(_))));
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("bms-sim-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "max_ticks": 120, "initial_soc": 80.0 }"#).unwrap();
        let config = SimulationConfig::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.max_ticks, 120);
        assert_eq!(config.initial_soc, 80.0);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            SimulationConfig::from_json_file("/nonexistent/bms-sim.json"),
            Err(AppError::Io(_))
        ));
    }
}
