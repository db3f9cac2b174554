//! Command definitions for the player actor.

use tokio::sync::oneshot;

use super::SessionError;
use super::events::SessionEvents;
use super::quality::QualitySelection;
use super::state::{PlaybackState, SeekTarget, SessionPhase};
use super::tracks::Track;
use crate::manifest::QualityLevel;
use crate::persistence::MediaId;

/// Playback state a session should start from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitialState {
    /// Start position in seconds; wins over a persisted resume position
    pub current_time: Option<f64>,
    /// Requested vertical resolution, applied once the manifest resolves
    pub quality: Option<u32>,
    pub volume: Option<f64>,
    pub muted: Option<bool>,
}

/// Parameters for opening a session.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenRequest {
    pub source_url: String,
    /// Enables resume position persistence when set
    pub media_id: Option<MediaId>,
    pub initial_state: Option<InitialState>,
}

impl OpenRequest {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            media_id: None,
            initial_state: None,
        }
    }

    pub fn with_media_id(mut self, media_id: MediaId) -> Self {
        self.media_id = Some(media_id);
        self
    }

    pub fn with_initial_state(mut self, initial_state: InitialState) -> Self {
        self.initial_state = Some(initial_state);
        self
    }
}

/// Commands accepted by the player actor.
///
/// Each command carries a response channel. The actor handles them one at a
/// time, interleaved with engine signals, so no state is ever shared.
pub enum PlayerCommand {
    /// Open a session, replacing any active one.
    Open {
        request: OpenRequest,
        responder: oneshot::Sender<Result<SessionEvents, SessionError>>,
    },
    /// Release the active session.
    Dispose { responder: oneshot::Sender<()> },
    SetPlaying {
        playing: bool,
        responder: oneshot::Sender<Result<(), SessionError>>,
    },
    TogglePlay {
        responder: oneshot::Sender<Result<(), SessionError>>,
    },
    Seek {
        target: SeekTarget,
        responder: oneshot::Sender<Result<(), SessionError>>,
    },
    SetVolume {
        volume: f64,
        responder: oneshot::Sender<Result<(), SessionError>>,
    },
    SetMuted {
        muted: bool,
        responder: oneshot::Sender<Result<(), SessionError>>,
    },
    ToggleMute {
        responder: oneshot::Sender<Result<(), SessionError>>,
    },
    SetFullscreen {
        fullscreen: bool,
        responder: oneshot::Sender<Result<(), SessionError>>,
    },
    ToggleFullscreen {
        responder: oneshot::Sender<Result<(), SessionError>>,
    },
    SelectQuality {
        vertical_resolution: u32,
        responder: oneshot::Sender<Result<QualitySelection, SessionError>>,
    },
    SetTracks {
        tracks: Vec<Track>,
        responder: oneshot::Sender<Result<(), SessionError>>,
    },
    SelectSubtitle {
        language: Option<String>,
        responder: oneshot::Sender<Result<(), SessionError>>,
    },
    SelectAudioTrack {
        name: String,
        responder: oneshot::Sender<Result<(), SessionError>>,
    },
    /// Current playback state (last known state once the session ended).
    GetState {
        responder: oneshot::Sender<PlaybackState>,
    },
    GetPhase {
        responder: oneshot::Sender<SessionPhase>,
    },
    GetTracks {
        responder: oneshot::Sender<Result<Vec<Track>, SessionError>>,
    },
    GetLevels {
        responder: oneshot::Sender<Result<Vec<QualityLevel>, SessionError>>,
    },
    /// Dispose the active session and stop the actor.
    Shutdown { responder: oneshot::Sender<()> },
}
