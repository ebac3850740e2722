use approx::assert_relative_eq;
use bms_sim::{AppError, FaultKind, Simulation, SimulationConfig, StopReason, TickRecord};
use electrical::BatteryConfiguration;
use environment::SynthesizerConfig;
use simcore::{Model, SensorModel, SimContext};

fn config(max_ticks: u64) -> SimulationConfig {
    SimulationConfig {
        max_ticks,
        ..Default::default()
    }
}

fn record_run(config: SimulationConfig) -> Vec<TickRecord> {
    let mut simulation = Simulation::new(config).unwrap();
    let mut records = Vec::new();
    simulation.run_with(|r| records.push(r.clone())).unwrap();
    records
}

/// Heavy constant load whose voltage readings always map to an empty pack.
struct DrainSensor;

impl Model for DrainSensor {
    fn reset(&mut self) {}
}

impl SensorModel for DrainSensor {
    fn sample_current(&mut self, _ctx: SimContext) -> f64 {
        100.0
    }

    fn sample_temperature(&mut self, _ctx: SimContext) -> f64 {
        25.0
    }

    fn measure_voltage(&mut self, _ctx: SimContext, _ideal_voltage: f64) -> f64 {
        -10.0
    }
}

#[test]
fn test_same_seed_reproduces_run() {
    let a = record_run(config(600));
    let b = record_run(config(600));
    assert_eq!(a.len(), 600);
    assert_eq!(a, b);

    let other = record_run(SimulationConfig {
        seed: 43,
        ..config(600)
    });
    assert_ne!(a, other);
}

#[test]
fn test_reset_replays_run() {
    let mut simulation = Simulation::new(config(200)).unwrap();
    let first = simulation.run().unwrap();
    simulation.reset();
    assert_eq!(simulation.ticks(), 0);
    assert_eq!(simulation.estimator().soc(), 100.0);
    let second = simulation.run().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_budget_run_bookkeeping() {
    let mut simulation = Simulation::new(config(300)).unwrap();
    let mut records = Vec::new();
    let summary = simulation.run_with(|r| records.push(r.clone())).unwrap();

    assert_eq!(summary.stop_reason, StopReason::TickBudget);
    assert_eq!(summary.ticks, 300);
    assert_relative_eq!(summary.elapsed, 300.0);
    assert_eq!(summary.cycle_count, 10);
    assert!(summary.final_soc > 0.1 && summary.final_soc < 100.0);
    assert!(summary.energy_wh > 0.0);
    assert!(summary.min_voltage <= summary.final_voltage);

    for record in &records {
        assert!((0.0..=100.0).contains(&record.soc));
        assert!(record.sample.current >= 0.0);
        assert_relative_eq!(record.power, record.voltage * record.sample.current);
        assert_eq!(record.sample.cycle_count as u64, record.tick / 30);
        if record.tick % 30 != 0 {
            assert!(record.faults.is_empty());
        }
    }
}

#[test]
fn test_battery_protection_stops_run() {
    let config = SimulationConfig {
        battery: BatteryConfiguration::with_capacity(1.0),
        max_ticks: 1000,
        ..Default::default()
    };
    let mut simulation = Simulation::with_sensor(config, DrainSensor).unwrap();
    let mut last = None;
    let summary = simulation.run_with(|r| last = Some(r.clone())).unwrap();

    assert_eq!(summary.stop_reason, StopReason::BatteryProtection);
    assert!(summary.ticks < 100);
    assert!(summary.final_soc <= 0.1);
    assert_eq!(summary.peak_current, 100.0);

    let last = last.unwrap();
    assert_eq!(last.tick, summary.ticks);
    assert!(last.faults.is_empty());

    // Stopped runs stay stopped.
    assert!(matches!(
        simulation.tick(),
        Err(AppError::Stopped(StopReason::BatteryProtection))
    ));
    let again = simulation.run().unwrap();
    assert_eq!(again.ticks, summary.ticks);

    simulation.reset();
    assert!(simulation.tick().is_ok());
}

#[test]
fn test_tick_refused_after_budget() {
    let mut simulation = Simulation::new(config(5)).unwrap();
    simulation.run().unwrap();
    assert!(matches!(simulation.tick(), Err(AppError::Stopped(StopReason::TickBudget))));
    assert_eq!(simulation.ticks(), 5);
}

#[test]
fn test_unknown_profile_uses_first() {
    let config = SimulationConfig {
        profile: "Forklift".to_string(),
        synthesizer: SynthesizerConfig::noiseless(),
        ..config(3)
    };
    let mut simulation = Simulation::new(config).unwrap();
    assert_eq!(simulation.sensor().profile(), "Forklift");

    let currents: Vec<f64> = (0..3).map(|_| simulation.tick().unwrap().sample.current).collect();
    assert_eq!(currents, vec![15.0, 25.0, 35.0]);
}

#[test]
fn test_unknown_profile_spikes_at_default() {
    let config = SimulationConfig {
        profile: "Forklift".to_string(),
        synthesizer: SynthesizerConfig {
            spike_probability: 1.0,
            ..SynthesizerConfig::noiseless()
        },
        ..config(1)
    };
    let record = Simulation::new(config).unwrap().tick().unwrap();
    assert_relative_eq!(record.sample.current, 15.0 * 1.3);
}

fn light_load(true_initial_soc: Option<f64>) -> SimulationConfig {
    SimulationConfig {
        profile: "Smartphone/Tablet".to_string(),
        current_multiplier: 0.1,
        synthesizer: SynthesizerConfig::noiseless(),
        initial_soc: 100.0,
        true_initial_soc,
        ..config(120)
    }
}

#[test]
fn test_voltage_correction_closes_gap_to_reference_pack() {
    let mut simulation = Simulation::new(light_load(Some(80.0))).unwrap();
    assert_eq!(simulation.estimator().soc(), 100.0);
    assert_eq!(simulation.true_soc(), Some(80.0));

    let mut records = Vec::new();
    let summary = simulation.run_with(|r| records.push(r.clone())).unwrap();
    let true_soc = simulation.true_soc().unwrap();

    assert_eq!(summary.stop_reason, StopReason::TickBudget);
    assert!(true_soc < 80.0);
    assert!((summary.final_soc - true_soc).abs() < 2.0);
    assert!(records.iter().all(|r| r.true_soc.is_some()));

    // Reset restores both starting points.
    simulation.reset();
    assert_eq!(simulation.estimator().soc(), 100.0);
    assert_eq!(simulation.true_soc(), Some(80.0));
}

#[test]
fn test_without_reference_pack_estimate_only_drains() {
    let mut simulation = Simulation::new(light_load(None)).unwrap();
    let summary = simulation.run().unwrap();

    assert_eq!(simulation.true_soc(), None);
    assert!(summary.final_soc > 99.0 && summary.final_soc < 100.0);
}

#[test]
fn test_cold_pack_raises_temperature_faults() {
    let config = SimulationConfig {
        profile: "Smartphone/Tablet".to_string(),
        base_temperature: -15.0,
        synthesizer: SynthesizerConfig {
            daily_swing: 0.0,
            ..SynthesizerConfig::noiseless()
        },
        ..config(90)
    };
    let summary = Simulation::new(config).unwrap().run().unwrap();

    assert_eq!(summary.faults.get(&FaultKind::LowTemperature), Some(&3));
    assert_eq!(summary.faults.get(&FaultKind::HighTemperature), None);
}

#[test]
fn test_invalid_battery_is_rejected() {
    let config = SimulationConfig {
        battery: BatteryConfiguration::with_capacity(0.0),
        ..Default::default()
    };
    assert!(matches!(
        Simulation::new(config),
        Err(bms_sim::AppError::Estimator(_))
    ));
}
