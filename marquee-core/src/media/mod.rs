//! Abstractions over the engines that actually decode and fetch media.
//!
//! The controller never talks to a browser media element or an adaptive
//! streaming library directly. A `MediaBackend` creates one pair of engines
//! per session; the controller drives them through the `MediaEngine` and
//! `StreamingEngine` traits and receives their signals through a
//! `SignalSink`.

pub mod signal;

use url::Url;

pub use signal::{
    EngineSignal, ErrorEvent, FaultSource, RawErrorKind, SessionId, SignalSink, SignalTag,
};
pub(crate) use signal::{SessionSignal, TaggedSignal};

use crate::manifest::Manifest;
use crate::player::Track;

/// Errors raised while creating engines for a session.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum MediaError {
    #[error("Media engine unavailable: {reason}")]
    EngineUnavailable { reason: String },

    #[error("Unsupported source: {url}")]
    UnsupportedSource { url: String },
}

/// The media element side of playback.
pub trait MediaEngine: Send + Sync {
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, position: f64);
    fn set_volume(&mut self, volume: f64);
    fn set_muted(&mut self, muted: bool);
    fn set_fullscreen(&mut self, fullscreen: bool);

    /// Attaches a subtitle track. Tracks are attached in display order.
    fn attach_track(&mut self, track: &Track);

    /// Detaches a previously attached subtitle track.
    fn detach_track(&mut self, track: &Track);

    /// Shows the attached track at `index`, or hides all tracks.
    fn show_text_track(&mut self, index: Option<usize>);

    /// Attempts to recover from a decode error without reloading the source.
    fn recover_media_error(&mut self);

    /// Releases the underlying media resource. Called exactly once.
    fn release(&mut self);
}

/// The adaptive-streaming engine feeding the media element.
pub trait StreamingEngine: Send + Sync {
    /// Hands the parsed manifest to the engine.
    fn attach_manifest(&mut self, manifest: &Manifest);

    /// Starts or restarts segment loading from `position` seconds.
    fn start_load(&mut self, position: f64);

    /// Pins a level, or returns to automatic bandwidth-based switching.
    fn set_level(&mut self, index: Option<usize>);

    /// Switches to the audio rendition at `index`.
    fn set_audio_track(&mut self, index: usize);

    /// Re-attaches media buffers after a decode error.
    fn recover_media_error(&mut self);

    /// Tears the engine down. Called exactly once.
    fn destroy(&mut self);
}

/// Engines owned by one session.
pub struct SessionEngines {
    pub media: Box<dyn MediaEngine>,
    /// `None` when the source plays natively without adaptive streaming
    pub streaming: Option<Box<dyn StreamingEngine>>,
}

/// Factory for session engines.
pub trait MediaBackend: Send + Sync {
    /// Creates engines bound to `source`.
    ///
    /// `start_position` is the playhead the engines should start loading
    /// from. Engines report back exclusively through `signals`.
    ///
    /// # Errors
    ///
    /// - `MediaError::EngineUnavailable` - Engines could not be created
    /// - `MediaError::UnsupportedSource` - Source cannot be played at all
    fn create_engines(
        &self,
        source: &Url,
        start_position: f64,
        signals: SignalSink,
    ) -> Result<SessionEngines, MediaError>;
}
