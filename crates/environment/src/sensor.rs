use simcore::{Model, SensorModel, SimContext};

use crate::synthesizer::Synthesizer;

/// Synthetic sensor front-end driven by one named load profile.
#[derive(Debug, Clone)]
pub struct ProfileSensor {
    synthesizer: Synthesizer,
    profile: String,
    current_multiplier: f64,
    base_temperature: f64,
}

impl ProfileSensor {
    pub fn new(synthesizer: Synthesizer, profile: impl Into<String>, current_multiplier: f64, base_temperature: f64) -> Self {
        ProfileSensor {
            synthesizer,
            profile: profile.into(),
            current_multiplier,
            base_temperature,
        }
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn synthesizer(&self) -> &Synthesizer {
        &self.synthesizer
    }
}

impl Model for ProfileSensor {
    fn reset(&mut self) {
        self.synthesizer.reset();
    }
}

impl SensorModel for ProfileSensor {
    fn sample_current(&mut self, _ctx: SimContext) -> f64 {
        self.synthesizer.next_current(&self.profile, self.current_multiplier)
    }

    fn sample_temperature(&mut self, _ctx: SimContext) -> f64 {
        self.synthesizer.next_temperature(self.base_temperature)
    }

    fn measure_voltage(&mut self, _ctx: SimContext, ideal_voltage: f64) -> f64 {
        self.synthesizer.add_voltage_noise(ideal_voltage)
    }
}
