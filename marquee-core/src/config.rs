//! Centralized configuration for Marquee.
//!
//! All tunable parameters of the playback controller are defined here to
//! avoid hard-coded values scattered throughout the codebase.

/// Central configuration for all Marquee components.
///
/// Groups related configuration settings into logical sections.
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct MarqueeConfig {
    pub playback: PlaybackConfig,
    pub recovery: RecoveryConfig,
    pub session: SessionConfig,
}

/// Playback defaults applied to every new session.
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Highest vertical resolution the fallback level may have when a
    /// requested quality is not advertised (None = no ceiling)
    pub quality_ceiling: Option<u32>,
    /// Volume a session starts with unless the caller overrides it
    pub initial_volume: f64,
    /// Step used by relative keyboard seeks, in seconds
    pub keyboard_seek_step: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            quality_ceiling: Some(1080),
            initial_volume: 1.0,
            keyboard_seek_step: 10.0,
        }
    }
}

/// Bounds for automatic fault recovery.
///
/// Every counter is scoped to a single session and only resets when the
/// caller opens a new one. Exceeding a bound turns the fault fatal.
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// Manifest/source reload attempts after network faults
    pub max_network_retries: u32,
    /// In-place media engine recoveries after decode faults
    pub max_media_recoveries: u32,
    /// Full session reinitializations after repeated decode faults
    pub max_reinitializations: u32,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_network_retries: 3,
            max_media_recoveries: 3,
            max_reinitializations: 1,
        }
    }
}

/// Controller actor configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Capacity of the command channel between handles and the actor
    pub command_capacity: usize,
    /// Capacity of each session's event channel
    pub event_capacity: usize,
    /// URL schemes accepted by `open`
    pub allowed_schemes: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            command_capacity: 100,
            event_capacity: 256,
            allowed_schemes: vec!["http".to_string(), "https".to_string(), "file".to_string()],
        }
    }
}

impl MarqueeConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Allows runtime configuration via environment variables while
    /// maintaining sensible defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(ceiling) = std::env::var("MARQUEE_QUALITY_CEILING") {
            config.playback.quality_ceiling = match ceiling.as_str() {
                "none" | "" => None,
                value => value.parse::<u32>().ok().or(config.playback.quality_ceiling),
            };
        }

        if let Ok(retries) = std::env::var("MARQUEE_MAX_NETWORK_RETRIES")
            && let Ok(count) = retries.parse::<u32>()
        {
            config.recovery.max_network_retries = count;
        }

        if let Ok(recoveries) = std::env::var("MARQUEE_MAX_MEDIA_RECOVERIES")
            && let Ok(count) = recoveries.parse::<u32>()
        {
            config.recovery.max_media_recoveries = count;
        }

        if let Ok(reinits) = std::env::var("MARQUEE_MAX_REINITIALIZATIONS")
            && let Ok(count) = reinits.parse::<u32>()
        {
            config.recovery.max_reinitializations = count;
        }

        if let Ok(capacity) = std::env::var("MARQUEE_COMMAND_CAPACITY")
            && let Ok(value) = capacity.parse::<usize>()
        {
            config.session.command_capacity = value.max(1);
        }

        if let Ok(capacity) = std::env::var("MARQUEE_EVENT_CAPACITY")
            && let Ok(value) = capacity.parse::<usize>()
        {
            config.session.event_capacity = value;
        }

        config
    }

    /// Creates a configuration optimized for testing.
    ///
    /// Uses a small command channel so back-pressure paths are exercised.
    pub fn for_testing() -> Self {
        let mut config = Self::default();
        config.session.command_capacity = 8;
        config
    }
}
