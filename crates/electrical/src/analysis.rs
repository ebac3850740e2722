//! Sweeps over the battery and impedance models for diagnostics and design work.
//!
//! These functions compute whole curves in one pass and return plain vectors
//! that a caller can plot or tabulate.

use crate::battery::EquivalentCircuit;
use crate::impedance::ImpedanceParameters;

/// Impedance sampled over a range of frequencies (Nyquist / Bode data).
#[derive(Debug, Clone, Default)]
pub struct ImpedanceSpectrum {
    pub frequencies: Vec<f64>,
    pub real: Vec<f64>,
    pub imaginary: Vec<f64>,
    pub magnitude: Vec<f64>,
}

impl ImpedanceSpectrum {
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }
}

/// Sample the impedance at `n_points` log-spaced frequencies in
/// `[f_min, f_max]` (Hz).
///
/// Returns an empty spectrum when the range is not positive or `n_points` is
/// zero; a single point samples `f_min`.
pub fn impedance_spectrum(params: &ImpedanceParameters, f_min: f64, f_max: f64, n_points: usize) -> ImpedanceSpectrum {
    if n_points == 0 || !(f_min > 0.0 && f_max >= f_min) {
        return ImpedanceSpectrum::default();
    }

    let log_min = f_min.log10();
    let log_span = f_max.log10() - log_min;

    let mut spectrum = ImpedanceSpectrum {
        frequencies: Vec::with_capacity(n_points),
        real: Vec::with_capacity(n_points),
        imaginary: Vec::with_capacity(n_points),
        magnitude: Vec::with_capacity(n_points),
    };

    for i in 0..n_points {
        let fraction = if n_points == 1 {
            0.0
        } else {
            i as f64 / (n_points - 1) as f64
        };
        let frequency = 10f64.powf(log_min + fraction * log_span);
        let z = params.complex_impedance(frequency);

        spectrum.frequencies.push(frequency);
        spectrum.real.push(z.re);
        spectrum.imaginary.push(z.im);
        spectrum.magnitude.push(params.total_impedance_magnitude(frequency));
    }

    spectrum
}

/// Worst-case terminal voltage under a peak load.
///
/// Returns `(min_voltage, soc_at_min_voltage)`.
pub fn voltage_sag_analysis(model: &EquivalentCircuit, peak_current: f64, temperature: f64, cycle_count: u32) -> (f64, f64) {
    // Ohmic drop only; resistance and OCV both worsen toward empty.
    let test_socs = [100.0, 80.0, 60.0, 40.0, 20.0, 10.0, 5.0];
    let mut min_voltage = f64::MAX;
    let mut soc_at_min = 100.0;

    for &soc in &test_socs {
        let voltage = model.terminal_voltage(soc, peak_current, temperature, cycle_count);
        if voltage < min_voltage {
            min_voltage = voltage;
            soc_at_min = soc;
        }
    }

    (min_voltage, soc_at_min)
}

/// OCV curve sampled at `n_points` evenly spaced states of charge in [0, 100].
pub fn ocv_table(model: &EquivalentCircuit, n_points: usize) -> Vec<(f64, f64)> {
    (0..n_points)
        .map(|i| {
            let soc = if n_points == 1 {
                0.0
            } else {
                100.0 * i as f64 / (n_points - 1) as f64
            };
            (soc, model.open_circuit_voltage(soc))
        })
        .collect()
}
