//! Simulation configuration.

use std::time::Duration;

use marquee_core::media::RawErrorKind;

/// Fault injected at a fixed tick of one engine generation.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedFault {
    /// Engine generation, counting every `create_engines` call from 0
    pub generation: usize,
    /// Tick of that generation's clock at which the fault fires
    pub tick: u64,
    pub kind: RawErrorKind,
}

impl ScriptedFault {
    pub fn new(generation: usize, tick: u64, kind: RawErrorKind) -> Self {
        Self {
            generation,
            tick,
            kind,
        }
    }
}

/// Knobs for the simulated backend and manifest loader.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Seed for every random decision in the run
    pub seed: u64,
    /// Wall-clock time between engine ticks
    pub tick_interval: Duration,
    /// Media seconds the playhead advances per tick while playing
    pub media_seconds_per_tick: f64,
    /// Total media duration in seconds
    pub media_duration: f64,
    /// Vertical resolutions advertised by the simulated manifest
    pub resolutions: Vec<u32>,
    /// Audio rendition names; the first is the default
    pub audio_renditions: Vec<String>,
    /// Delay before a manifest fetch resolves
    pub manifest_latency: Duration,
    /// Probability that a manifest fetch fails with a network error
    pub manifest_failure_rate: f64,
    /// Per-tick probability of a fatal network fault while loading
    pub network_fault_rate: f64,
    /// Per-tick probability of a fatal decode fault while playing
    pub decode_fault_rate: f64,
    /// Faults injected at fixed ticks regardless of probabilities
    pub scripted_faults: Vec<ScriptedFault>,
    /// Play natively without a streaming engine
    pub native_playback: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED,
            tick_interval: Duration::from_millis(5),
            media_seconds_per_tick: 1.0,
            media_duration: 120.0,
            resolutions: vec![480, 720, 1080],
            audio_renditions: vec!["English".to_string(), "Español".to_string()],
            manifest_latency: Duration::from_millis(10),
            manifest_failure_rate: 0.0,
            network_fault_rate: 0.0,
            decode_fault_rate: 0.0,
            scripted_faults: Vec::new(),
            native_playback: false,
        }
    }
}

impl SimulationConfig {
    /// Creates a fault-free configuration with the given seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Number of ticks needed to play the whole media once.
    pub fn ticks_to_end(&self) -> u64 {
        if self.media_seconds_per_tick <= 0.0 {
            return u64::MAX;
        }
        (self.media_duration / self.media_seconds_per_tick).ceil() as u64
    }
}
