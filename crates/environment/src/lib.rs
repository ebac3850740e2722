//! Synthetic operating environment for battery simulations: load profiles,
//! ambient temperature and sensor noise.

pub mod profiles;
pub mod sensor;
pub mod synthesizer;

pub use profiles::{LoadProfile, PROFILES};
pub use sensor::ProfileSensor;
pub use synthesizer::{EnvironmentError, NoiseShape, Synthesizer, SynthesizerConfig};
