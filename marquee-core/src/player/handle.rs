//! Handle for communicating with the player actor.

use tokio::sync::{mpsc, oneshot};

use super::SessionError;
use super::commands::{OpenRequest, PlayerCommand};
use super::events::SessionEvents;
use super::quality::QualitySelection;
use super::state::{PlaybackState, SeekTarget, SessionPhase};
use super::tracks::Track;
use crate::manifest::QualityLevel;

/// Handle for communicating with the player actor.
///
/// Provides the imperative command surface of the controller. Cheap to
/// clone; every clone talks to the same actor.
#[derive(Clone)]
pub struct PlayerHandle {
    sender: mpsc::Sender<PlayerCommand>,
}

impl PlayerHandle {
    /// Creates a new handle with the given command sender.
    pub fn new(sender: mpsc::Sender<PlayerCommand>) -> Self {
        Self { sender }
    }

    /// Opens a source, disposing any active session first.
    ///
    /// Returns the new session's event stream. Manifest acquisition
    /// continues in the background; its failures are recovered or
    /// surfaced through the stream, never here.
    ///
    /// # Errors
    /// - `SessionError::SourceUnavailable` - URL cannot be used at all
    /// - `SessionError::EngineUnavailable` - Engines could not be created
    /// - `SessionError::PlayerShutdown` - Actor is gone
    pub async fn open(&self, request: OpenRequest) -> Result<SessionEvents, SessionError> {
        self.request(|responder| PlayerCommand::Open { request, responder })
            .await?
    }

    /// Releases the active session. Calling it again has no effect.
    ///
    /// # Errors
    /// - `SessionError::PlayerShutdown` - Actor is gone
    pub async fn dispose(&self) -> Result<(), SessionError> {
        self.request(|responder| PlayerCommand::Dispose { responder })
            .await
    }

    /// Starts or pauses playback.
    ///
    /// # Errors
    /// - `SessionError::NoActiveSession` - Nothing is open
    /// - `SessionError::PlayerShutdown` - Actor is gone
    pub async fn set_playing(&self, playing: bool) -> Result<(), SessionError> {
        self.request(|responder| PlayerCommand::SetPlaying { playing, responder })
            .await?
    }

    /// # Errors
    /// - `SessionError::NoActiveSession` - Nothing is open
    /// - `SessionError::PlayerShutdown` - Actor is gone
    pub async fn toggle_play(&self) -> Result<(), SessionError> {
        self.request(|responder| PlayerCommand::TogglePlay { responder })
            .await?
    }

    /// Moves the playhead to an absolute position or by an offset.
    ///
    /// # Errors
    /// - `SessionError::NoActiveSession` - Nothing is open
    /// - `SessionError::PlayerShutdown` - Actor is gone
    pub async fn seek(&self, target: SeekTarget) -> Result<(), SessionError> {
        self.request(|responder| PlayerCommand::Seek { target, responder })
            .await?
    }

    /// Sets the volume, clamped to `[0, 1]`.
    ///
    /// # Errors
    /// - `SessionError::NoActiveSession` - Nothing is open
    /// - `SessionError::PlayerShutdown` - Actor is gone
    pub async fn set_volume(&self, volume: f64) -> Result<(), SessionError> {
        self.request(|responder| PlayerCommand::SetVolume { volume, responder })
            .await?
    }

    /// # Errors
    /// - `SessionError::NoActiveSession` - Nothing is open
    /// - `SessionError::PlayerShutdown` - Actor is gone
    pub async fn set_muted(&self, muted: bool) -> Result<(), SessionError> {
        self.request(|responder| PlayerCommand::SetMuted { muted, responder })
            .await?
    }

    /// # Errors
    /// - `SessionError::NoActiveSession` - Nothing is open
    /// - `SessionError::PlayerShutdown` - Actor is gone
    pub async fn toggle_mute(&self) -> Result<(), SessionError> {
        self.request(|responder| PlayerCommand::ToggleMute { responder })
            .await?
    }

    /// # Errors
    /// - `SessionError::NoActiveSession` - Nothing is open
    /// - `SessionError::PlayerShutdown` - Actor is gone
    pub async fn set_fullscreen(&self, fullscreen: bool) -> Result<(), SessionError> {
        self.request(|responder| PlayerCommand::SetFullscreen {
            fullscreen,
            responder,
        })
        .await?
    }

    /// # Errors
    /// - `SessionError::NoActiveSession` - Nothing is open
    /// - `SessionError::PlayerShutdown` - Actor is gone
    pub async fn toggle_fullscreen(&self) -> Result<(), SessionError> {
        self.request(|responder| PlayerCommand::ToggleFullscreen { responder })
            .await?
    }

    /// Pins the level with the requested vertical resolution.
    ///
    /// A resolution the manifest does not advertise selects the default
    /// level instead; this is never an error.
    ///
    /// # Errors
    /// - `SessionError::NoActiveSession` - Nothing is open
    /// - `SessionError::PlayerShutdown` - Actor is gone
    pub async fn select_quality(
        &self,
        vertical_resolution: u32,
    ) -> Result<QualitySelection, SessionError> {
        self.request(|responder| PlayerCommand::SelectQuality {
            vertical_resolution,
            responder,
        })
        .await?
    }

    /// Replaces the subtitle track set atomically.
    ///
    /// # Errors
    /// - `SessionError::NoActiveSession` - Nothing is open
    /// - `SessionError::PlayerShutdown` - Actor is gone
    pub async fn set_tracks(&self, tracks: Vec<Track>) -> Result<(), SessionError> {
        self.request(|responder| PlayerCommand::SetTracks { tracks, responder })
            .await?
    }

    /// Shows the subtitle track for `language`, or hides subtitles.
    ///
    /// # Errors
    /// - `SessionError::UnknownTrack` - No attached track has that language
    /// - `SessionError::NoActiveSession` - Nothing is open
    /// - `SessionError::PlayerShutdown` - Actor is gone
    pub async fn select_subtitle(&self, language: Option<&str>) -> Result<(), SessionError> {
        let language = language.map(str::to_string);
        self.request(|responder| PlayerCommand::SelectSubtitle {
            language,
            responder,
        })
        .await?
    }

    /// Switches the audio rendition by name.
    ///
    /// # Errors
    /// - `SessionError::UnknownTrack` - Manifest has no such rendition
    /// - `SessionError::NoActiveSession` - Nothing is open
    /// - `SessionError::PlayerShutdown` - Actor is gone
    pub async fn select_audio_track(&self, name: &str) -> Result<(), SessionError> {
        let name = name.to_string();
        self.request(|responder| PlayerCommand::SelectAudioTrack { name, responder })
            .await?
    }

    /// Returns the current playback state snapshot.
    ///
    /// # Errors
    /// - `SessionError::PlayerShutdown` - Actor is gone
    pub async fn state(&self) -> Result<PlaybackState, SessionError> {
        self.request(|responder| PlayerCommand::GetState { responder })
            .await
    }

    /// # Errors
    /// - `SessionError::PlayerShutdown` - Actor is gone
    pub async fn phase(&self) -> Result<SessionPhase, SessionError> {
        self.request(|responder| PlayerCommand::GetPhase { responder })
            .await
    }

    /// Returns the active subtitle track set.
    ///
    /// # Errors
    /// - `SessionError::NoActiveSession` - Nothing is open
    /// - `SessionError::PlayerShutdown` - Actor is gone
    pub async fn tracks(&self) -> Result<Vec<Track>, SessionError> {
        self.request(|responder| PlayerCommand::GetTracks { responder })
            .await?
    }

    /// Returns the quality levels of the resolved manifest.
    ///
    /// # Errors
    /// - `SessionError::NoActiveSession` - Nothing is open
    /// - `SessionError::PlayerShutdown` - Actor is gone
    pub async fn levels(&self) -> Result<Vec<QualityLevel>, SessionError> {
        self.request(|responder| PlayerCommand::GetLevels { responder })
            .await?
    }

    /// Disposes the active session and stops the actor.
    ///
    /// # Errors
    /// - `SessionError::PlayerShutdown` - Actor was already gone
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.request(|responder| PlayerCommand::Shutdown { responder })
            .await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> PlayerCommand,
    ) -> Result<T, SessionError> {
        let (responder, rx) = oneshot::channel();

        self.sender
            .send(command(responder))
            .await
            .map_err(|_| SessionError::PlayerShutdown)?;

        rx.await.map_err(|_| SessionError::PlayerShutdown)
    }
}
