use bms_sim::{SimulationConfig, Simulation};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Usage: bms-sim [config.json]
    let config = match std::env::args().nth(1) {
        Some(path) => SimulationConfig::from_json_file(path)?,
        None => SimulationConfig::default(),
    };
    TermLogger::init(config.log_level()?, Config::default(), TerminalMode::Mixed, ColorChoice::Auto)?;

    log::info!(
        "{} Ah pack, profile {:?}, seed {}, start at {:.1} %",
        config.battery.capacity_ah,
        config.profile,
        config.seed,
        config.initial_soc
    );

    let mut simulation = Simulation::new(config)?;
    let summary = simulation.run()?;

    log::info!("stopped after {} ticks ({:.0} s): {:?}", summary.ticks, summary.elapsed, summary.stop_reason);
    log::info!(
        "final SoC {:.2} %, voltage {:.3} V (min {:.3} V), SoH {:.1} % after {} cycles",
        summary.final_soc,
        summary.final_voltage,
        summary.min_voltage,
        summary.final_state_of_health,
        summary.cycle_count
    );
    log::info!("peak current {:.1} A, energy delivered {:.1} Wh", summary.peak_current, summary.energy_wh);
    for (kind, count) in &summary.faults {
        log::info!("{kind:?}: raised {count} times");
    }

    Ok(())
}
