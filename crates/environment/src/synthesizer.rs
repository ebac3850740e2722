//! Synthetic sensor streams: load current, ambient temperature and voltage
//! measurement noise.
//!
//! All three streams share one tick counter. Only [`Synthesizer::next_current`]
//! advances it; [`Synthesizer::next_temperature`] reads it to place the tick in
//! the day. Call `next_current` first in every tick for the temperature to
//! follow the same clock.

use std::f64::consts::PI;

use rand::SeedableRng;
use rand::distr::{Bernoulli, Uniform};
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::profiles::{self, LoadProfile};

const SECONDS_PER_DAY: u64 = 86_400;
const SECONDS_PER_HOUR: f64 = 3600.0;
/// Hour of day at which the daily temperature swing crosses its mean rising.
const DAILY_SWING_PHASE_HOURS: f64 = 6.0;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EnvironmentError {
    #[error("{name} noise amplitude must be non-negative and finite, got {value}")]
    InvalidNoise { name: &'static str, value: f64 },
    #[error("spike probability must be within [0, 1], got {0}")]
    InvalidSpikeProbability(f64),
    #[error("temperature range is empty: {min} to {max} °C")]
    InvalidTemperatureRange { min: f64, max: f64 },
}

/// Shape of the additive and multiplicative noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseShape {
    /// Uniform over `[-amplitude, amplitude]`.
    #[default]
    Uniform,
    /// Zero-mean normal with the same variance as the uniform band.
    Gaussian,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesizerConfig {
    /// Relative current noise (0.15 = ±15 %)
    pub current_noise: f64,
    /// °C
    pub temperature_noise: f64,
    /// V
    pub voltage_noise: f64,
    pub spike_probability: f64,
    /// Amplitude of the day/night temperature swing (°C)
    pub daily_swing: f64,
    pub min_temperature: f64,
    pub max_temperature: f64,
    pub noise_shape: NoiseShape,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        SynthesizerConfig {
            current_noise: 0.15,
            temperature_noise: 3.0,
            voltage_noise: 0.01,
            spike_probability: 0.05,
            daily_swing: 8.0,
            min_temperature: -20.0,
            max_temperature: 50.0,
            noise_shape: NoiseShape::Uniform,
        }
    }
}

impl SynthesizerConfig {
    /// No noise and no spikes; streams follow the profile and the daily swing
    /// exactly.
    pub fn noiseless() -> Self {
        SynthesizerConfig {
            current_noise: 0.0,
            temperature_noise: 0.0,
            voltage_noise: 0.0,
            spike_probability: 0.0,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
enum NoiseSource {
    Uniform(Uniform<f64>),
    Gaussian(Normal<f64>),
}

impl NoiseSource {
    fn new(name: &'static str, amplitude: f64, shape: NoiseShape) -> Result<Self, EnvironmentError> {
        let invalid = || EnvironmentError::InvalidNoise { name, value: amplitude };
        if !(amplitude.is_finite() && amplitude >= 0.0) {
            return Err(invalid());
        }
        match shape {
            NoiseShape::Uniform => Uniform::new_inclusive(-amplitude, amplitude)
                .map(NoiseSource::Uniform)
                .map_err(|_| invalid()),
            NoiseShape::Gaussian => Normal::new(0.0, amplitude / 3f64.sqrt())
                .map(NoiseSource::Gaussian)
                .map_err(|_| invalid()),
        }
    }

    fn sample(&self, rng: &mut StdRng) -> f64 {
        match self {
            NoiseSource::Uniform(dist) => dist.sample(rng),
            NoiseSource::Gaussian(dist) => dist.sample(rng),
        }
    }
}

/// Generator of plausible sensor streams, seeded per instance.
#[derive(Debug, Clone)]
pub struct Synthesizer {
    config: SynthesizerConfig,
    seed: u64,
    rng: StdRng,
    time_index: u64,
    current_noise: NoiseSource,
    temperature_noise: NoiseSource,
    voltage_noise: NoiseSource,
    spike: Bernoulli,
}

impl Synthesizer {
    pub fn new(config: SynthesizerConfig, seed: u64) -> Result<Self, EnvironmentError> {
        if !(config.min_temperature.is_finite() && config.max_temperature.is_finite())
            || config.min_temperature > config.max_temperature
        {
            return Err(EnvironmentError::InvalidTemperatureRange {
                min: config.min_temperature,
                max: config.max_temperature,
            });
        }
        let spike = Bernoulli::new(config.spike_probability)
            .map_err(|_| EnvironmentError::InvalidSpikeProbability(config.spike_probability))?;

        Ok(Synthesizer {
            current_noise: NoiseSource::new("current", config.current_noise, config.noise_shape)?,
            temperature_noise: NoiseSource::new("temperature", config.temperature_noise, config.noise_shape)?,
            voltage_noise: NoiseSource::new("voltage", config.voltage_noise, config.noise_shape)?,
            spike,
            config,
            seed,
            rng: StdRng::seed_from_u64(seed),
            time_index: 0,
        })
    }

    pub fn config(&self) -> &SynthesizerConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Ticks elapsed since construction or the last reset.
    pub fn time_index(&self) -> u64 {
        self.time_index
    }

    pub fn available_profiles(&self) -> Vec<&'static str> {
        profiles::profile_names()
    }

    pub fn profile_description(&self, name: &str) -> &'static str {
        profiles::find_profile(name).map_or("Unknown profile", |p| p.description)
    }

    /// Load current for this tick (A, ≥ 0), then advance the tick counter.
    ///
    /// Unknown profile names fall back to the pattern of the first profile of
    /// the catalog; the spike size still follows the requested name.
    pub fn next_current(&mut self, profile_name: &str, multiplier: f64) -> f64 {
        let profile: &LoadProfile = match profiles::find_profile(profile_name) {
            Some(profile) => profile,
            None => {
                let fallback = profiles::profile_or_default(profile_name);
                log::debug!("unknown load profile {profile_name:?}, using the {:?} pattern", fallback.name);
                fallback
            }
        };

        let base = profile.base_current(self.time_index) * multiplier;
        let mut current = base * (1.0 + self.current_noise.sample(&mut self.rng));
        if self.spike.sample(&mut self.rng) {
            current *= profiles::spike_multiplier(profile_name);
            log::trace!("load spike on {:?} at tick {}", profile.name, self.time_index);
        }

        self.time_index += 1;
        current.max(0.0)
    }

    /// Ambient temperature (°C) for the current tick: base plus a daily sine
    /// swing peaking at noon, plus weather noise.
    pub fn next_temperature(&mut self, base: f64) -> f64 {
        let hour_of_day = (self.time_index % SECONDS_PER_DAY) as f64 / SECONDS_PER_HOUR;
        let daily = self.config.daily_swing * ((hour_of_day - DAILY_SWING_PHASE_HOURS) * PI / 12.0).sin();
        let weather = self.temperature_noise.sample(&mut self.rng);

        (base + daily + weather).clamp(self.config.min_temperature, self.config.max_temperature)
    }

    /// Ideal voltage plus ADC/measurement noise.
    pub fn add_voltage_noise(&mut self, ideal: f64) -> f64 {
        ideal + self.voltage_noise.sample(&mut self.rng)
    }

    /// Rewind to tick 0 and replay the random streams from the seed.
    pub fn reset(&mut self) {
        self.time_index = 0;
        self.rng = StdRng::seed_from_u64(self.seed);
        log::debug!("synthesizer reset (seed {})", self.seed);
    }
}
