//! Marquee Core - Adaptive playback controller
//!
//! This crate owns a single playback session at a time: it binds media and
//! streaming engines to a source, tracks quality levels, subtitle and audio
//! tracks, and recovers from engine faults within bounded retry budgets.
//! Engines sit behind traits so hosts and simulations can supply their own.

pub mod catalog;
pub mod config;
pub mod controls;
pub mod manifest;
pub mod media;
pub mod persistence;
pub mod player;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use catalog::MediaDescriptor;
pub use config::MarqueeConfig;
pub use manifest::{HttpManifestLoader, Manifest, ManifestError, ManifestLoader, QualityLevel};
pub use media::{MediaBackend, MediaEngine, MediaError, StreamingEngine};
pub use persistence::{JsonFileResumeStore, MediaId, PersistenceError, ResumeStore};
pub use player::{
    OpenRequest, PlaybackState, PlayerEvent, PlayerHandle, SessionError, SessionPhase, spawn_player,
};

/// Errors that can bubble up from any Marquee subsystem.
#[derive(Debug, thiserror::Error)]
pub enum MarqueeError {
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Descriptor error: {0}")]
    Descriptor(#[from] serde_json::Error),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MarqueeError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            MarqueeError::Session(e) => match e {
                SessionError::SourceUnavailable { url, .. } => {
                    format!("Cannot play {url}")
                }
                SessionError::EngineUnavailable { .. } => {
                    "Playback is not supported here".to_string()
                }
                SessionError::NoActiveSession => "Nothing is playing".to_string(),
                SessionError::UnknownTrack { name } => format!("No track named {name}"),
                SessionError::PlayerShutdown => "Player has stopped".to_string(),
            },
            MarqueeError::Manifest(_) => "Could not load the stream".to_string(),
            MarqueeError::Media(_) => "Playback is not supported here".to_string(),
            MarqueeError::Persistence(_) => "Could not save playback position".to_string(),
            MarqueeError::Descriptor(_) => "Invalid media description".to_string(),
            MarqueeError::Configuration { .. } => "Configuration error occurred".to_string(),
            MarqueeError::Io(_) => "File system error occurred".to_string(),
        }
    }

    /// Checks if this error is due to user input validation.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            MarqueeError::Configuration { .. }
                | MarqueeError::Descriptor(_)
                | MarqueeError::Session(SessionError::SourceUnavailable { .. })
                | MarqueeError::Session(SessionError::UnknownTrack { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, MarqueeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors() {
        let unknown: MarqueeError = SessionError::UnknownTrack {
            name: "Klingon".to_string(),
        }
        .into();
        assert!(unknown.is_user_error());
        assert_eq!(unknown.user_message(), "No track named Klingon");

        let shutdown: MarqueeError = SessionError::PlayerShutdown.into();
        assert!(!shutdown.is_user_error());

        let manifest: MarqueeError = ManifestError::Network {
            reason: "timeout".to_string(),
        }
        .into();
        assert_eq!(manifest.user_message(), "Could not load the stream");
    }
}
