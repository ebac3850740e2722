//! Closed-loop simulation: synthetic sensors feed the SoC estimator at a fixed
//! period, the estimated state is run through the fault checks, and battery
//! protection ends the run when the pack is empty.

use std::collections::BTreeMap;

use electrical::{EquivalentCircuit, ImpedanceModel};
use environment::{ProfileSensor, Synthesizer, profiles};
use estimation::SocEstimator;
use serde::{Deserialize, Serialize};
use simcore::{SensorModel, SensorSample, SimContext};

use crate::config::SimulationConfig;
use crate::diagnostics::{Fault, FaultKind, PackReadings, check_faults};
use crate::error::{AppError, Result};

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Everything observed and estimated in one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickRecord {
    pub tick: u64,
    /// s since the start of the run
    pub elapsed: f64,
    pub sample: SensorSample,
    /// SoC of the reference pack, when one is simulated (%)
    pub true_soc: Option<f64>,
    pub soc: f64,
    /// Estimated terminal voltage after the update (V)
    pub voltage: f64,
    /// W
    pub power: f64,
    pub state_of_health: f64,
    pub internal_resistance: f64,
    pub eis_impedance: f64,
    pub kalman_gain: f64,
    pub faults: Vec<Fault>,
}

/// Pack whose true SoC is tracked beside the estimate. It drains by exact
/// coulomb counting and its terminal voltage is what the sensor measures.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ReferencePack {
    soc: f64,
}

impl ReferencePack {
    /// Drain by one tick and return the terminal voltage under that load.
    fn step(&mut self, model: &EquivalentCircuit, sample: &SensorSample, dt: f64) -> f64 {
        let efficiency = model.temperature_efficiency(sample.temperature);
        let capacity = model.effective_capacity(sample.cycle_count);
        let delta_ah = sample.current * dt / SECONDS_PER_HOUR * efficiency;
        self.soc = (self.soc - delta_ah / capacity * 100.0).clamp(0.0, 100.0);
        model.terminal_voltage(self.soc, sample.current, sample.temperature, sample.cycle_count)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// SoC reached the cut-off level.
    BatteryProtection,
    TickBudget,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub elapsed: f64,
    pub final_soc: f64,
    pub final_voltage: f64,
    pub final_state_of_health: f64,
    pub cycle_count: u32,
    pub min_voltage: f64,
    pub peak_current: f64,
    /// Energy delivered by the pack (Wh)
    pub energy_wh: f64,
    pub faults: BTreeMap<FaultKind, u64>,
    pub stop_reason: StopReason,
}

pub struct Simulation<S: SensorModel = ProfileSensor> {
    config: SimulationConfig,
    estimator: SocEstimator,
    impedance: ImpedanceModel,
    sensor: S,
    reference: Option<ReferencePack>,
    ctx: SimContext,
    tick: u64,
    cycle_count: u32,
    stop_reason: Option<StopReason>,
}

impl Simulation<ProfileSensor> {
    /// Simulation driven by the synthetic profile sensor described by the
    /// configuration.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        if profiles::find_profile(&config.profile).is_none() {
            log::warn!(
                "unknown load profile {:?}, using the {:?} pattern",
                config.profile,
                profiles::profile_or_default(&config.profile).name
            );
        }
        let synthesizer = Synthesizer::new(config.synthesizer, config.seed)?;
        let sensor = ProfileSensor::new(
            synthesizer,
            config.profile.clone(),
            config.current_multiplier,
            config.base_temperature,
        );
        Self::with_sensor(config, sensor)
    }
}

impl<S: SensorModel> Simulation<S> {
    pub fn with_sensor(config: SimulationConfig, sensor: S) -> Result<Self> {
        config.validate()?;
        let estimator = SocEstimator::with_config(config.battery, config.tuning)?;

        let mut simulation = Simulation {
            impedance: ImpedanceModel::new(config.impedance),
            ctx: SimContext { dt: config.dt, t: 0.0 },
            config,
            estimator,
            sensor,
            reference: None,
            tick: 0,
            cycle_count: 0,
            stop_reason: None,
        };
        simulation.reset();
        Ok(simulation)
    }

    /// Back to tick 0: sensor streams rewound, estimator at the initial SoC,
    /// reference pack (if any) at its true initial SoC, fresh cell.
    pub fn reset(&mut self) {
        self.sensor.reset();
        self.estimator.reset(self.config.initial_soc);
        self.reference = self
            .config
            .true_initial_soc
            .map(|soc| ReferencePack { soc: soc.clamp(0.0, 100.0) });
        self.ctx = SimContext { dt: self.config.dt, t: 0.0 };
        self.tick = 0;
        self.cycle_count = 0;
        self.stop_reason = None;
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn estimator(&self) -> &SocEstimator {
        &self.estimator
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn ticks(&self) -> u64 {
        self.tick
    }

    /// SoC of the reference pack, `None` when the sensor is read against the
    /// estimate itself.
    pub fn true_soc(&self) -> Option<f64> {
        self.reference.map(|pack| pack.soc)
    }

    pub fn cycle_count(&self) -> u32 {
        self.cycle_count
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    pub fn is_stopped(&self) -> bool {
        self.stop_reason.is_some()
    }

    /// Advance one period.
    ///
    /// Fails with [`AppError::Stopped`] once the run has stopped; call
    /// [`Self::reset`] to start over.
    pub fn tick(&mut self) -> Result<TickRecord> {
        if let Some(reason) = self.stop_reason {
            return Err(AppError::Stopped(reason));
        }
        self.ctx = self.ctx.advance();
        self.tick += 1;

        let current = self.sensor.sample_current(self.ctx);
        let temperature = self.sensor.sample_temperature(self.ctx);
        if self.tick % self.config.cycle_interval_ticks == 0 {
            self.cycle_count = self.cycle_count.saturating_add(1);
        }

        let mut sample = SensorSample {
            current,
            voltage: 0.0,
            temperature,
            cycle_count: self.cycle_count,
        };
        // Ideal reading under this tick's load: the reference pack when there
        // is one, otherwise the model at the current estimate.
        let model = self.estimator.model();
        let ideal_voltage = match self.reference.as_mut() {
            Some(pack) => pack.step(model, &sample, self.config.dt),
            None => model.terminal_voltage(self.estimator.soc(), current, temperature, self.cycle_count),
        };
        sample.voltage = self.sensor.measure_voltage(self.ctx, ideal_voltage);
        let report = self.estimator.update(self.ctx, &sample)?;

        let soc = self.estimator.soc();
        let voltage = self.estimator.terminal_voltage();
        let state_of_health = self.estimator.state_of_health(self.cycle_count);
        let internal_resistance = self.estimator.internal_resistance();
        let eis_impedance = self
            .impedance
            .compute_parameters(soc, temperature, self.cycle_count)
            .total_impedance_magnitude(self.config.eis_frequency);

        let mut record = TickRecord {
            tick: self.tick,
            elapsed: self.ctx.t,
            sample,
            true_soc: self.true_soc(),
            soc,
            voltage,
            power: voltage * current,
            state_of_health,
            internal_resistance,
            eis_impedance,
            kalman_gain: report.kalman_gain,
            faults: Vec::new(),
        };

        if soc <= self.config.cutoff_soc {
            log::warn!(
                "battery protection: SoC {:.2} % at or below {:.2} %, stopping at t = {:.0} s",
                soc,
                self.config.cutoff_soc,
                self.ctx.t
            );
            self.stop_reason = Some(StopReason::BatteryProtection);
            return Ok(record);
        }

        if self.tick % self.config.fault_check_interval_ticks == 0 {
            let readings = PackReadings {
                soc,
                voltage,
                temperature,
                state_of_health,
                eis_impedance,
                internal_resistance,
            };
            record.faults = check_faults(&readings, &self.config.thresholds);
            for fault in &record.faults {
                log::warn!("t = {:.0} s: {}", self.ctx.t, fault);
            }
        }

        log::debug!(
            "t = {:.0} s  I = {:.2} A  T = {:.1} °C  SoC = {:.2} %  V = {:.3} V  P = {:.1} W",
            record.elapsed,
            current,
            temperature,
            soc,
            voltage,
            record.power
        );

        Ok(record)
    }

    /// Tick until battery protection trips or `max_ticks` is reached.
    pub fn run(&mut self) -> Result<RunSummary> {
        self.run_with(|_| {})
    }

    /// [`Self::run`], handing every tick's record to `observer`.
    pub fn run_with(&mut self, mut observer: impl FnMut(&TickRecord)) -> Result<RunSummary> {
        let mut min_voltage = f64::INFINITY;
        let mut peak_current: f64 = 0.0;
        let mut energy_wh = 0.0;
        let mut faults: BTreeMap<FaultKind, u64> = BTreeMap::new();

        while !self.is_stopped() {
            if self.tick >= self.config.max_ticks {
                self.stop_reason = Some(StopReason::TickBudget);
                break;
            }
            let record = self.tick()?;

            min_voltage = min_voltage.min(record.voltage);
            peak_current = peak_current.max(record.sample.current.abs());
            energy_wh += record.power * self.config.dt / 3600.0;
            for fault in &record.faults {
                *faults.entry(fault.kind).or_insert(0) += 1;
            }
            observer(&record);
        }

        let summary = RunSummary {
            ticks: self.tick,
            elapsed: self.ctx.t,
            final_soc: self.estimator.soc(),
            final_voltage: self.estimator.terminal_voltage(),
            final_state_of_health: self.estimator.state_of_health(self.cycle_count),
            cycle_count: self.cycle_count,
            min_voltage: if min_voltage.is_finite() {
                min_voltage
            } else {
                self.estimator.terminal_voltage()
            },
            peak_current,
            energy_wh,
            faults,
            stop_reason: self.stop_reason.unwrap_or(StopReason::TickBudget),
        };
        Ok(summary)
    }
}
