//! Adaptive playback controller.
//!
//! A single actor owns the active session and its playback state. Callers
//! drive it through a cloneable `PlayerHandle`; engines report back through
//! tagged signals; each session hands its caller a `SessionEvents` stream
//! that closes when the session ends.

mod actor;
pub mod commands;
mod core;
pub mod events;
mod handle;
pub mod quality;
pub mod recovery;
mod session;
pub mod state;
pub mod tracks;

#[cfg(test)]
mod integration_tests;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_mocks;

pub use actor::spawn_player;
pub use commands::{InitialState, OpenRequest, PlayerCommand};
pub use events::{PlayerEvent, SessionEvents};
pub use handle::PlayerHandle;
pub use quality::{QualityResolver, QualitySelection};
pub use recovery::{FailureNotice, FaultKind, RecoveryAction, RecoveryPolicy};
pub use state::{PlaybackState, PlaybackStore, SeekTarget, SessionPhase};
pub use tracks::{Track, TrackSynchronizer, normalize_tracks};

/// Errors returned by player commands.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum SessionError {
    #[error("Source unavailable: {url}: {reason}")]
    SourceUnavailable { url: String, reason: String },

    #[error("Media engine unavailable: {reason}")]
    EngineUnavailable { reason: String },

    #[error("No active playback session")]
    NoActiveSession,

    #[error("Unknown track: {name}")]
    UnknownTrack { name: String },

    #[error("Player has shut down")]
    PlayerShutdown,
}
