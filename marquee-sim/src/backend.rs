//! Simulated media and streaming engines.
//!
//! Each engine pair shares a playhead driven by a tokio ticking task. Faults
//! come from the configured probabilities and the scripted fault list, both
//! keyed to the engine generation so a seed replays the same run.

use std::sync::Arc;

use marquee_core::manifest::Manifest;
use marquee_core::media::{
    EngineSignal, ErrorEvent, FaultSource, MediaBackend, MediaEngine, MediaError, RawErrorKind,
    SessionEngines, SignalSink, StreamingEngine,
};
use marquee_core::player::Track;
use parking_lot::Mutex;
use tokio::task::AbortHandle;
use tokio::time::MissedTickBehavior;
use url::Url;

use crate::config::SimulationConfig;
use crate::rng::DeterministicRng;

/// Counters collected across every engine the backend created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendStats {
    pub engines_created: usize,
    pub engines_released: usize,
    pub start_loads: usize,
    pub media_recoveries: usize,
    pub faults_injected: usize,
}

/// `MediaBackend` producing simulated engines.
#[derive(Clone)]
pub struct SimulatedBackend {
    config: Arc<SimulationConfig>,
    stats: Arc<Mutex<BackendStats>>,
}

impl SimulatedBackend {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config: Arc::new(config),
            stats: Arc::new(Mutex::new(BackendStats::default())),
        }
    }

    /// Snapshot of the counters so far.
    pub fn stats(&self) -> BackendStats {
        self.stats.lock().clone()
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }
}

impl MediaBackend for SimulatedBackend {
    fn create_engines(
        &self,
        source: &Url,
        start_position: f64,
        signals: SignalSink,
    ) -> Result<SessionEngines, MediaError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            MediaError::EngineUnavailable {
                reason: format!("no tokio runtime for simulated clock: {e}"),
            }
        })?;

        let generation = {
            let mut stats = self.stats.lock();
            stats.engines_created += 1;
            stats.engines_created - 1
        };

        let native = self.config.native_playback;
        let playhead = Arc::new(Mutex::new(Playhead::new(
            start_position,
            self.config.media_duration,
            native,
        )));

        let clock = EngineClock {
            config: Arc::clone(&self.config),
            stats: Arc::clone(&self.stats),
            playhead: Arc::clone(&playhead),
            rng: DeterministicRng::from_seed(self.config.seed).fork(generation as u64),
            generation,
            signals,
        };
        let task = runtime.spawn(clock.run());

        tracing::debug!(
            %source,
            generation,
            start_position,
            native,
            "Simulated engines created"
        );

        let media = SimulatedMediaEngine {
            playhead: Arc::clone(&playhead),
            stats: Arc::clone(&self.stats),
            clock: task.abort_handle(),
            released: false,
        };
        let streaming = (!native).then(|| {
            Box::new(SimulatedStreamingEngine {
                playhead,
                stats: Arc::clone(&self.stats),
            }) as Box<dyn StreamingEngine>
        });

        Ok(SessionEngines {
            media: Box::new(media),
            streaming,
        })
    }
}

/// Playback position shared by one engine pair and its clock.
#[derive(Debug)]
struct Playhead {
    position: f64,
    duration: f64,
    playing: bool,
    loading: bool,
    ended: bool,
    announced_duration: bool,
    pending_level_switch: Option<usize>,
    tick: u64,
}

impl Playhead {
    fn new(position: f64, duration: f64, loading: bool) -> Self {
        Self {
            position: position.clamp(0.0, duration),
            duration,
            playing: false,
            loading,
            ended: false,
            announced_duration: false,
            pending_level_switch: None,
            tick: 0,
        }
    }

    fn seek(&mut self, position: f64) {
        self.position = position.clamp(0.0, self.duration);
        self.ended = self.position >= self.duration;
    }
}

struct EngineClock {
    config: Arc<SimulationConfig>,
    stats: Arc<Mutex<BackendStats>>,
    playhead: Arc<Mutex<Playhead>>,
    rng: DeterministicRng,
    generation: usize,
    signals: SignalSink,
}

impl EngineClock {
    async fn run(mut self) {
        let mut interval = tokio::time::interval(self.config.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            for signal in self.tick() {
                if !self.signals.emit(signal) {
                    return;
                }
            }
        }
    }

    /// Advances one tick and returns the signals it produced.
    fn tick(&mut self) -> Vec<EngineSignal> {
        let mut signals = Vec::new();
        let mut playhead = self.playhead.lock();
        if !playhead.loading {
            return signals;
        }
        playhead.tick += 1;
        let tick = playhead.tick;

        if !playhead.announced_duration {
            playhead.announced_duration = true;
            signals.push(EngineSignal::DurationChanged {
                duration: playhead.duration,
            });
        }

        if let Some(index) = playhead.pending_level_switch.take() {
            signals.push(EngineSignal::LevelSwitched { index });
        }

        let mut faults: Vec<RawErrorKind> = self
            .config
            .scripted_faults
            .iter()
            .filter(|fault| fault.generation == self.generation && fault.tick == tick)
            .map(|fault| fault.kind.clone())
            .collect();
        if self.rng.random_bool(self.config.network_fault_rate) {
            faults.push(RawErrorKind::Network);
        }
        if playhead.playing && self.rng.random_bool(self.config.decode_fault_rate) {
            faults.push(RawErrorKind::Media);
        }
        if !faults.is_empty() {
            self.stats.lock().faults_injected += faults.len();
        }
        signals.extend(faults.into_iter().map(|kind| {
            let source = match kind {
                RawErrorKind::Network => FaultSource::StreamingEngine,
                _ => FaultSource::MediaEngine,
            };
            let details = format!("simulated fault at tick {tick}");
            EngineSignal::Error(ErrorEvent::fatal(kind, source, details))
        }));

        if playhead.ended {
            return signals;
        }

        if playhead.playing {
            playhead.position =
                (playhead.position + self.config.media_seconds_per_tick).min(playhead.duration);
        }
        signals.push(EngineSignal::TimeUpdate {
            current_time: playhead.position,
            duration: Some(playhead.duration),
        });

        if playhead.playing && playhead.position >= playhead.duration {
            playhead.ended = true;
            playhead.playing = false;
            signals.push(EngineSignal::EndOfStream);
        }

        signals
    }
}

struct SimulatedMediaEngine {
    playhead: Arc<Mutex<Playhead>>,
    stats: Arc<Mutex<BackendStats>>,
    clock: AbortHandle,
    released: bool,
}

impl MediaEngine for SimulatedMediaEngine {
    fn play(&mut self) {
        self.playhead.lock().playing = true;
    }

    fn pause(&mut self) {
        self.playhead.lock().playing = false;
    }

    fn seek(&mut self, position: f64) {
        self.playhead.lock().seek(position);
    }

    fn set_volume(&mut self, _volume: f64) {}

    fn set_muted(&mut self, _muted: bool) {}

    fn set_fullscreen(&mut self, _fullscreen: bool) {}

    fn attach_track(&mut self, track: &Track) {
        tracing::trace!(language = %track.language_code, "Simulated track attached");
    }

    fn detach_track(&mut self, track: &Track) {
        tracing::trace!(language = %track.language_code, "Simulated track detached");
    }

    fn show_text_track(&mut self, _index: Option<usize>) {}

    fn recover_media_error(&mut self) {
        self.stats.lock().media_recoveries += 1;
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.clock.abort();
        self.playhead.lock().loading = false;
        self.stats.lock().engines_released += 1;
    }
}

struct SimulatedStreamingEngine {
    playhead: Arc<Mutex<Playhead>>,
    stats: Arc<Mutex<BackendStats>>,
}

impl StreamingEngine for SimulatedStreamingEngine {
    fn attach_manifest(&mut self, manifest: &Manifest) {
        tracing::trace!(levels = manifest.levels.len(), "Simulated manifest attached");
    }

    fn start_load(&mut self, position: f64) {
        let mut playhead = self.playhead.lock();
        playhead.seek(position);
        playhead.loading = true;
        self.stats.lock().start_loads += 1;
    }

    fn set_level(&mut self, index: Option<usize>) {
        self.playhead.lock().pending_level_switch = index;
    }

    fn set_audio_track(&mut self, _index: usize) {}

    fn recover_media_error(&mut self) {}

    fn destroy(&mut self) {
        self.playhead.lock().loading = false;
    }
}
