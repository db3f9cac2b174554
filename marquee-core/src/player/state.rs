//! Playback state store and session lifecycle phases.

use serde::{Deserialize, Serialize};

use crate::manifest::QualityLevel;

/// Lifecycle phase of a playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// No session has been opened yet
    Uninitialized,
    /// Manifest acquisition in progress
    Loading,
    /// Manifest resolved, not yet playing
    Ready,
    Playing,
    Paused,
    /// Automatic recovery from a recoverable fault in progress
    Recovering,
    /// Natural end of stream reached
    Ended,
    /// Terminal: fatal fault or exhausted retries
    Failed,
    /// Terminal: released by the caller
    Disposed,
}

impl SessionPhase {
    /// Checks if no further transitions can happen in this session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Failed | SessionPhase::Disposed)
    }

    /// Checks if a recoverable fault may move the session to `Recovering`.
    pub fn can_recover(&self) -> bool {
        matches!(
            self,
            SessionPhase::Ready | SessionPhase::Playing | SessionPhase::Paused
        )
    }
}

/// Snapshot of the shared playback state.
///
/// Invariants: `0 <= current_time <= duration` once the duration is known,
/// `0 <= volume <= 1`, and `quality` is one of the levels resolved for the
/// active session (unset before the manifest resolves).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub current_time: f64,
    pub duration: Option<f64>,
    pub is_playing: bool,
    pub quality: Option<QualityLevel>,
    pub volume: f64,
    pub is_muted: bool,
    pub is_fullscreen: bool,
    /// Language code of the shown subtitle track
    pub active_subtitle: Option<String>,
    /// Name of the selected audio rendition
    pub active_audio_track: Option<String>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_time: 0.0,
            duration: None,
            is_playing: false,
            quality: None,
            volume: 1.0,
            is_muted: false,
            is_fullscreen: false,
            active_subtitle: None,
            active_audio_track: None,
        }
    }
}

impl PlaybackState {
    /// Playback progress from 0.0 to 1.0, if the duration is known.
    pub fn progress(&self) -> Option<f64> {
        match self.duration {
            Some(duration) if duration > 0.0 => Some((self.current_time / duration).min(1.0)),
            _ => None,
        }
    }

    /// Checks if the playhead reached the known duration.
    pub fn is_at_end(&self) -> bool {
        matches!(self.duration, Some(duration) if duration > 0.0 && self.current_time >= duration)
    }
}

/// Requested seek target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekTarget {
    /// Absolute position in seconds
    Absolute(f64),
    /// Offset in seconds from the current position
    Relative(f64),
}

/// Outcome of resolving a seek target against the current state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekResolution {
    /// Move the playhead to this clamped position
    Apply(f64),
    /// Duration unknown; apply this position once it is
    Defer(f64),
    /// Target equals the current position
    Unchanged,
}

/// Clamps a volume into `[0, 1]`. NaN has no meaningful clamp and yields None.
pub fn clamp_volume(volume: f64) -> Option<f64> {
    if volume.is_nan() {
        None
    } else {
        Some(volume.clamp(0.0, 1.0))
    }
}

/// Clamps a position into `[0, duration]`, or `[0, inf)` when unknown.
pub fn clamp_position(position: f64, duration: Option<f64>) -> f64 {
    let position = if position.is_nan() { 0.0 } else { position.max(0.0) };
    match duration {
        Some(duration) => position.min(duration.max(0.0)),
        None => position,
    }
}

/// Single-session playback state store.
///
/// Sole source of truth for `PlaybackState`. Setters enforce the state
/// invariants and report whether anything changed, so callers can skip
/// engine calls for idempotent requests.
#[derive(Debug, Clone, Default)]
pub struct PlaybackStore {
    state: PlaybackState,
}

impl PlaybackStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> PlaybackState {
        self.state.clone()
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// Resets to defaults for a new session.
    pub fn reset(&mut self, volume: f64, muted: bool) {
        self.state = PlaybackState {
            volume: clamp_volume(volume).unwrap_or(1.0),
            is_muted: muted,
            ..PlaybackState::default()
        };
    }

    pub fn set_volume(&mut self, volume: f64) -> bool {
        match clamp_volume(volume) {
            Some(volume) if volume != self.state.volume => {
                self.state.volume = volume;
                true
            }
            _ => false,
        }
    }

    pub fn set_muted(&mut self, muted: bool) -> bool {
        replace_if_changed(&mut self.state.is_muted, muted)
    }

    pub fn set_fullscreen(&mut self, fullscreen: bool) -> bool {
        replace_if_changed(&mut self.state.is_fullscreen, fullscreen)
    }

    pub fn set_playing(&mut self, playing: bool) -> bool {
        replace_if_changed(&mut self.state.is_playing, playing)
    }

    pub fn set_quality(&mut self, quality: Option<QualityLevel>) -> bool {
        replace_if_changed(&mut self.state.quality, quality)
    }

    pub fn set_active_subtitle(&mut self, language: Option<String>) -> bool {
        replace_if_changed(&mut self.state.active_subtitle, language)
    }

    pub fn set_active_audio_track(&mut self, name: Option<String>) -> bool {
        replace_if_changed(&mut self.state.active_audio_track, name)
    }

    /// Records a known duration, re-clamping the playhead.
    pub fn set_duration(&mut self, duration: f64) {
        if duration.is_finite() && duration > 0.0 {
            self.state.duration = Some(duration);
            self.state.current_time = clamp_position(self.state.current_time, self.state.duration);
        }
    }

    /// Applies a playhead update from the engine.
    pub fn update_time(&mut self, current_time: f64, duration: Option<f64>) {
        if let Some(duration) = duration {
            self.set_duration(duration);
        }
        self.state.current_time = clamp_position(current_time, self.state.duration);
    }

    /// Resolves a seek target against the current position and duration.
    pub fn resolve_seek(&self, target: SeekTarget) -> SeekResolution {
        let requested = match target {
            SeekTarget::Absolute(position) => position,
            SeekTarget::Relative(offset) => self.state.current_time + offset,
        };

        if self.state.duration.is_none() {
            return SeekResolution::Defer(clamp_position(requested, None));
        }

        let position = clamp_position(requested, self.state.duration);
        if position == self.state.current_time {
            SeekResolution::Unchanged
        } else {
            SeekResolution::Apply(position)
        }
    }

    /// Moves the playhead to an already clamped position.
    pub fn apply_seek(&mut self, position: f64) {
        self.state.current_time = clamp_position(position, self.state.duration);
    }
}

fn replace_if_changed<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}
