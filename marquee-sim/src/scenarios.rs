//! Pre-built playback scenarios with fault injection.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use marquee_core::config::MarqueeConfig;
use marquee_core::controls::{ControlAction, action_for_key};
use marquee_core::media::RawErrorKind;
use marquee_core::persistence::{MemoryResumeStore, ResumeStore};
use marquee_core::player::{
    FailureNotice, OpenRequest, PlaybackState, PlayerEvent, PlayerHandle, SessionEvents,
    SessionPhase, spawn_player,
};
use tokio::time::Instant;

use crate::SimulationError;
use crate::backend::{BackendStats, SimulatedBackend};
use crate::config::{ScriptedFault, SimulationConfig};
use crate::invariants::{
    AdvertisedQualityInvariant, Invariant, InvariantViolation, StateBoundsInvariant,
    TerminalEventsInvariant, check_all,
};
use crate::loader::SimulatedManifestLoader;

/// Source URL every simulated session opens.
pub const SIMULATED_SOURCE: &str = "https://sim.marquee.test/feature/master.m3u8";

/// Named fault pattern applied on top of a base configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// No faults; plays to the end
    Steady,
    /// Two network faults, both recovered by reloading
    FlakyNetwork,
    /// Back-to-back decode faults forcing one reinitialization
    DecodeGlitch,
    /// Unclassifiable fault ending the session
    Fatal,
    /// Random network and decode faults drawn from the seed
    Chaos,
}

impl Scenario {
    pub const ALL: [Scenario; 5] = [
        Scenario::Steady,
        Scenario::FlakyNetwork,
        Scenario::DecodeGlitch,
        Scenario::Fatal,
        Scenario::Chaos,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Scenario::Steady => "steady",
            Scenario::FlakyNetwork => "flaky-network",
            Scenario::DecodeGlitch => "decode-glitch",
            Scenario::Fatal => "fatal",
            Scenario::Chaos => "chaos",
        }
    }

    /// Layers this scenario's faults onto `base`.
    pub fn configure(self, mut base: SimulationConfig) -> SimulationConfig {
        match self {
            Scenario::Steady => {}
            Scenario::FlakyNetwork => {
                base.scripted_faults.extend([
                    ScriptedFault::new(0, 5, RawErrorKind::Network),
                    ScriptedFault::new(0, 15, RawErrorKind::Network),
                ]);
            }
            Scenario::DecodeGlitch => {
                base.scripted_faults.extend([
                    ScriptedFault::new(0, 4, RawErrorKind::Media),
                    ScriptedFault::new(0, 4, RawErrorKind::Media),
                ]);
            }
            Scenario::Fatal => {
                base.scripted_faults.push(ScriptedFault::new(
                    0,
                    3,
                    RawErrorKind::Other("unsupported codec".to_string()),
                ));
            }
            Scenario::Chaos => {
                base.network_fault_rate = base.network_fault_rate.max(0.02);
                base.decode_fault_rate = base.decode_fault_rate.max(0.02);
            }
        }
        base
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scenario::ALL
            .into_iter()
            .find(|scenario| scenario.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| SimulationError::UnknownScenario {
                name: s.to_string(),
            })
    }
}

/// A player wired to simulated collaborators.
///
/// Must be created inside a tokio runtime.
pub struct PlaybackSimulation {
    config: SimulationConfig,
    backend: SimulatedBackend,
    loader: SimulatedManifestLoader,
    player: PlayerHandle,
}

impl PlaybackSimulation {
    pub fn new(config: SimulationConfig) -> Self {
        Self::with_resume_store(
            config,
            MarqueeConfig::default(),
            Arc::new(MemoryResumeStore::new()),
        )
    }

    pub fn with_resume_store(
        config: SimulationConfig,
        player_config: MarqueeConfig,
        resume_store: Arc<dyn ResumeStore>,
    ) -> Self {
        let backend = SimulatedBackend::new(config.clone());
        let loader = SimulatedManifestLoader::new(config.clone());
        let player = spawn_player(
            player_config,
            Arc::new(backend.clone()),
            Arc::new(loader.clone()),
            resume_store,
        );

        Self {
            config,
            backend,
            loader,
            player,
        }
    }

    pub fn player(&self) -> &PlayerHandle {
        &self.player
    }

    pub fn backend(&self) -> &SimulatedBackend {
        &self.backend
    }

    pub fn loader(&self) -> &SimulatedManifestLoader {
        &self.loader
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Opens the simulated source.
    ///
    /// # Errors
    ///
    /// - `SimulationError::Session` - The player rejected the open
    pub async fn open(&self, request: OpenRequest) -> Result<SessionEvents, SimulationError> {
        Ok(self.player.open(request).await?)
    }

    /// Invariants every simulated session must hold.
    pub fn invariants(&self) -> Vec<Box<dyn Invariant>> {
        vec![
            Box::new(StateBoundsInvariant),
            Box::new(TerminalEventsInvariant),
            Box::new(AdvertisedQualityInvariant::new(self.config.resolutions.clone())),
        ]
    }
}

/// Outcome of one scenario run.
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub scenario: Scenario,
    pub seed: u64,
    pub events: Vec<PlayerEvent>,
    pub final_phase: SessionPhase,
    pub final_state: PlaybackState,
    pub failure: Option<FailureNotice>,
    pub backend: BackendStats,
    pub manifest_loads: usize,
    pub violations: Vec<InvariantViolation>,
}

impl ScenarioReport {
    pub fn ended(&self) -> bool {
        self.events.contains(&PlayerEvent::Ended)
    }

    pub fn progress_count(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, PlayerEvent::Progress(_)))
            .count()
    }

    /// Phase changes in publication order.
    pub fn phases(&self) -> Vec<SessionPhase> {
        self.events
            .iter()
            .filter_map(|event| match event {
                PlayerEvent::PhaseChanged(phase) => Some(*phase),
                _ => None,
            })
            .collect()
    }
}

/// Plays the simulated source with autoplay until it ends, fails, or
/// `run_for` elapses, then checks the invariants over everything published.
///
/// # Errors
///
/// - `SimulationError::Session` - Opening or driving the player failed
pub async fn run_scenario(
    scenario: Scenario,
    base: SimulationConfig,
    run_for: Duration,
) -> Result<ScenarioReport, SimulationError> {
    let config = scenario.configure(base);
    let seed = config.seed;
    let simulation = PlaybackSimulation::new(config);
    let player = simulation.player();

    tracing::info!(%scenario, seed, "Running playback scenario");

    let mut events = simulation.open(OpenRequest::new(SIMULATED_SOURCE)).await?;
    player.set_playing(true).await?;

    let log = collect_until_terminal(&mut events, Instant::now() + run_for).await;

    let final_phase = player.phase().await?;
    let final_state = player.state().await?;
    player.shutdown().await?;

    let failure = log.iter().find_map(|event| match event {
        PlayerEvent::Failed(notice) => Some(notice.clone()),
        _ => None,
    });
    let violations = check_all(&simulation.invariants(), &log);
    for violation in &violations {
        tracing::error!(%scenario, seed, %violation, "Invariant violated");
    }

    Ok(ScenarioReport {
        scenario,
        seed,
        events: log,
        final_phase,
        final_state,
        failure,
        backend: simulation.backend().stats(),
        manifest_loads: simulation.loader().load_count(),
        violations,
    })
}

/// Collects events until `Ended`, `Failed`, stream end, or the deadline.
pub async fn collect_until_terminal(
    events: &mut SessionEvents,
    deadline: Instant,
) -> Vec<PlayerEvent> {
    let mut log = Vec::new();
    while let Ok(Some(event)) = tokio::time::timeout_at(deadline, events.recv()).await {
        let terminal = matches!(event, PlayerEvent::Ended | PlayerEvent::Failed(_));
        log.push(event);
        if terminal {
            break;
        }
    }
    log
}

/// Result of replaying a key script against a simulated session.
#[derive(Debug, Clone)]
pub struct KeyReplay {
    pub applied: Vec<(String, ControlAction)>,
    pub ignored: Vec<String>,
    pub state: PlaybackState,
}

/// Splits a key script such as `"space, m arrowright"` into key names.
pub fn parse_key_script(script: &str) -> Vec<String> {
    script
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .collect()
}

/// Opens the simulated source, waits for the first playhead update and
/// applies `keys` in order through the keyboard bindings.
///
/// # Errors
///
/// - `SimulationError::Timeout` - The session never reported progress
/// - `SimulationError::Session` - A control was rejected
pub async fn replay_keys(
    config: SimulationConfig,
    keys: &[String],
) -> Result<KeyReplay, SimulationError> {
    let player_config = MarqueeConfig::default();
    let seek_step = player_config.playback.keyboard_seek_step;
    let simulation =
        PlaybackSimulation::with_resume_store(config, player_config, Arc::new(MemoryResumeStore::new()));
    let player = simulation.player();

    let mut events = simulation.open(OpenRequest::new(SIMULATED_SOURCE)).await?;
    wait_for_progress(&mut events, Duration::from_secs(5)).await?;

    let mut applied = Vec::new();
    let mut ignored = Vec::new();
    for key in keys {
        match action_for_key(key, seek_step) {
            Some(action) => {
                action.apply(player).await?;
                tracing::debug!(key = %key, ?action, "Key applied");
                applied.push((key.clone(), action));
            }
            None => ignored.push(key.clone()),
        }
    }

    let state = player.state().await?;
    player.shutdown().await?;

    Ok(KeyReplay {
        applied,
        ignored,
        state,
    })
}

/// Waits for the first `Progress` event.
///
/// # Errors
///
/// - `SimulationError::Timeout` - No progress before `limit`
pub async fn wait_for_progress(
    events: &mut SessionEvents,
    limit: Duration,
) -> Result<PlaybackState, SimulationError> {
    let deadline = Instant::now() + limit;
    while let Ok(Some(event)) = tokio::time::timeout_at(deadline, events.recv()).await {
        if let PlayerEvent::Progress(state) = event {
            return Ok(state);
        }
    }
    Err(SimulationError::Timeout {
        what: "first progress update".to_string(),
    })
}
