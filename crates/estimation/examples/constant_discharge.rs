use estimation::SocEstimator;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Pack params (tweak as needed)
    let mut estimator = SocEstimator::new(20.0)?;
    estimator.reset(100.0);

    // Sim settings
    let dt = 1.0; // s
    let t_end = 3600.0; // s
    let i_nominal = 10.0; // A
    let i_spike = 40.0; // A
    let spike_every = 300.0; // s
    let spike_duration = 20.0; // s

    // Measured voltage starts from a cell that reads 5 % low on the OCV curve,
    // so the filter has something to pull in.
    let mut true_soc: f64 = 95.0;

    println!("t,current,true_soc,est_soc,voltage,resistance");

    let mut t = 0.0;
    while t <= t_end {
        let current = if t % spike_every < spike_duration { i_spike } else { i_nominal };

        true_soc -= current * dt / 3600.0 / estimator.effective_capacity(0) * 100.0;
        true_soc = true_soc.max(0.0);
        let model = estimator.model();
        let measured = model.open_circuit_voltage(true_soc) - current * model.internal_resistance(true_soc, 25.0, 0);

        estimator.update_soc(current, measured, 25.0, 0, dt)?;

        if (t as u64) % 60 == 0 {
            println!(
                "{:.0},{:.1},{:.3},{:.3},{:.4},{:.4}",
                t,
                current,
                true_soc,
                estimator.soc(),
                estimator.terminal_voltage(),
                estimator.internal_resistance()
            );
        }

        t += dt;
    }

    Ok(())
}
