//! A single playback session and the resources it owns.

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use url::Url;

use super::events::{EVENT_HEADROOM, PlayerEvent};
use super::quality::QualityResolver;
use super::recovery::RecoveryPolicy;
use super::state::SessionPhase;
use super::tracks::{Track, TrackSynchronizer, normalize_tracks};
use crate::config::MarqueeConfig;
use crate::manifest::Manifest;
use crate::media::{MediaEngine, SessionEngines, SessionId, SignalTag, StreamingEngine};
use crate::persistence::MediaId;

/// Engine handles and in-flight work owned by a session.
///
/// Released exactly once: explicitly on dispose, failure or
/// reinitialization, and otherwise when dropped.
pub(crate) struct SessionResources {
    media: Box<dyn MediaEngine>,
    streaming: Option<Box<dyn StreamingEngine>>,
    manifest_fetch: Option<AbortHandle>,
    released: bool,
}

impl SessionResources {
    pub fn new(engines: SessionEngines) -> Self {
        Self {
            media: engines.media,
            streaming: engines.streaming,
            manifest_fetch: None,
            released: false,
        }
    }

    pub fn media(&mut self) -> &mut (dyn MediaEngine + 'static) {
        self.media.as_mut()
    }

    pub fn streaming(&mut self) -> Option<&mut (dyn StreamingEngine + 'static)> {
        self.streaming.as_deref_mut()
    }

    /// Checks if playback goes through an adaptive-streaming engine.
    pub fn is_adaptive(&self) -> bool {
        self.streaming.is_some()
    }

    /// Tracks a manifest fetch task, aborting any previous one.
    pub fn set_manifest_fetch(&mut self, handle: AbortHandle) {
        if let Some(previous) = self.manifest_fetch.replace(handle) {
            previous.abort();
        }
    }

    /// Forgets the manifest fetch task once its result arrived.
    pub fn clear_manifest_fetch(&mut self) {
        self.manifest_fetch = None;
    }

    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        if let Some(fetch) = self.manifest_fetch.take() {
            fetch.abort();
        }
        if let Some(streaming) = self.streaming.as_mut() {
            streaming.destroy();
        }
        self.media.release();
    }
}

impl Drop for SessionResources {
    fn drop(&mut self) {
        self.release();
    }
}

/// Changes requested before the session could apply them.
///
/// One slot per field; a later request replaces an earlier one.
#[derive(Debug, Default)]
pub(crate) struct PendingChanges {
    pub quality: Option<u32>,
    pub tracks: Option<Vec<Track>>,
    pub subtitle: Option<Option<String>>,
    pub audio_track: Option<String>,
    /// Absolute position awaiting a known duration
    pub seek: Option<f64>,
    pub playing: Option<bool>,
}

/// State of one opened source.
pub(crate) struct Session {
    pub id: SessionId,
    pub source: Url,
    pub media_id: Option<MediaId>,
    pub phase: SessionPhase,
    /// Phase to return to when recovery completes
    pub resume_phase: Option<SessionPhase>,
    /// Engine generation; bumped on every reinitialization
    pub epoch: u32,
    pub resources: SessionResources,
    pub quality: QualityResolver,
    pub tracks: TrackSynchronizer,
    pub recovery: RecoveryPolicy,
    pub pending: PendingChanges,
    pub manifest: Option<Manifest>,
    pub ended_notified: bool,
    events: mpsc::Sender<PlayerEvent>,
}

impl Session {
    pub fn new(
        id: SessionId,
        source: Url,
        media_id: Option<MediaId>,
        engines: SessionEngines,
        config: &MarqueeConfig,
        events: mpsc::Sender<PlayerEvent>,
    ) -> Self {
        Self {
            id,
            source,
            media_id,
            phase: SessionPhase::Uninitialized,
            resume_phase: None,
            epoch: 0,
            resources: SessionResources::new(engines),
            quality: QualityResolver::new(config.playback.quality_ceiling),
            tracks: TrackSynchronizer::new(),
            recovery: RecoveryPolicy::new(config.recovery.clone()),
            pending: PendingChanges::default(),
            manifest: None,
            ended_notified: false,
            events,
        }
    }

    pub fn tag(&self) -> SignalTag {
        SignalTag {
            session: self.id,
            epoch: self.epoch,
        }
    }

    /// Sends an event to the caller. A dropped receiver is not an error.
    ///
    /// Progress updates are dropped while the free capacity is at or below
    /// `EVENT_HEADROOM`.
    pub fn emit(&self, event: PlayerEvent) {
        if matches!(event, PlayerEvent::Progress(_)) && self.events.capacity() <= EVENT_HEADROOM {
            tracing::trace!(session = %self.id, "Event receiver lagging, progress update dropped");
            return;
        }

        if let Err(mpsc::error::TrySendError::Full(event)) = self.events.try_send(event) {
            tracing::warn!(session = %self.id, ?event, "Event receiver full, event dropped");
        }
    }

    pub fn set_phase(&mut self, phase: SessionPhase) {
        if self.phase == phase {
            return;
        }

        tracing::debug!(session = %self.id, from = ?self.phase, to = ?phase, "Phase transition");
        self.phase = phase;
        if phase == SessionPhase::Playing {
            self.recovery.on_playing();
        }
        self.emit(PlayerEvent::PhaseChanged(phase));
    }

    /// Enters `Recovering`, remembering where to return to.
    pub fn enter_recovering(&mut self) {
        if self.phase.can_recover() {
            self.resume_phase = Some(self.phase);
            self.set_phase(SessionPhase::Recovering);
        }
    }

    /// Leaves `Recovering` for the phase it interrupted.
    pub fn finish_recovering(&mut self) {
        if self.phase == SessionPhase::Recovering {
            let phase = self.resume_phase.take().unwrap_or(SessionPhase::Ready);
            self.set_phase(phase);
        }
    }

    /// Tracks as the caller sees them: the queued set if any, else the attached one.
    pub fn visible_tracks(&self) -> Vec<Track> {
        match &self.pending.tracks {
            Some(tracks) => normalize_tracks(tracks.clone()),
            None => self.tracks.attached().to_vec(),
        }
    }
}
