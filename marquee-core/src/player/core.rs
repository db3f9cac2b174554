//! Session manager: the single owner of the session and its playback state.
//!
//! Every mutation happens here, either on a caller command or on a tagged
//! signal from the engines or the manifest fetch. The actor in `actor.rs`
//! serializes both onto one task, so nothing below needs locking.

use std::sync::Arc;

use tokio::sync::mpsc;
use url::Url;

use super::SessionError;
use super::commands::OpenRequest;
use super::events::{PlayerEvent, SessionEvents};
use super::quality::QualitySelection;
use super::recovery::{FailureNotice, FaultKind, RecoveryAction};
use super::session::{Session, SessionResources};
use super::state::{
    PlaybackState, PlaybackStore, SeekResolution, SeekTarget, SessionPhase, clamp_position,
};
use super::tracks::Track;
use crate::config::MarqueeConfig;
use crate::manifest::{Manifest, ManifestLoader, QualityLevel};
use crate::media::{
    EngineSignal, MediaBackend, SessionId, SessionSignal, SignalSink, SignalTag, TaggedSignal,
};
use crate::persistence::{MediaId, ResumeStore};

/// Owns the active session, the playback state store and the collaborators.
pub struct SessionManager {
    config: MarqueeConfig,
    backend: Arc<dyn MediaBackend>,
    loader: Arc<dyn ManifestLoader>,
    resume_store: Arc<dyn ResumeStore>,
    signal_sender: mpsc::UnboundedSender<TaggedSignal>,
    store: PlaybackStore,
    session: Option<Session>,
    /// Phase reported once no session is active
    last_phase: SessionPhase,
    next_session_id: u64,
}

impl SessionManager {
    pub(crate) fn new(
        config: MarqueeConfig,
        backend: Arc<dyn MediaBackend>,
        loader: Arc<dyn ManifestLoader>,
        resume_store: Arc<dyn ResumeStore>,
        signal_sender: mpsc::UnboundedSender<TaggedSignal>,
    ) -> Self {
        Self {
            config,
            backend,
            loader,
            resume_store,
            signal_sender,
            store: PlaybackStore::new(),
            session: None,
            last_phase: SessionPhase::Uninitialized,
            next_session_id: 0,
        }
    }

    /// Opens `request.source_url`, disposing any active session first.
    ///
    /// Only synchronous validation can fail here. Manifest acquisition runs
    /// in the background and its failures go through fault recovery.
    ///
    /// # Errors
    ///
    /// - `SessionError::SourceUnavailable` - URL does not parse or uses a
    ///   scheme outside the configured allow-list
    /// - `SessionError::EngineUnavailable` - Backend could not create engines
    pub async fn open(&mut self, request: OpenRequest) -> Result<SessionEvents, SessionError> {
        let source = self.validate_source(&request.source_url)?;

        self.dispose().await;

        let initial = request.initial_state.unwrap_or_default();
        let resume_position = match &request.media_id {
            Some(media_id) => self.load_resume_position(media_id).await,
            None => None,
        };
        let start_position = initial
            .current_time
            .or(resume_position)
            .map(|position| clamp_position(position, None))
            .unwrap_or(0.0);

        self.next_session_id += 1;
        let id = SessionId::new(self.next_session_id);
        let sink = SignalSink::new(
            SignalTag {
                session: id,
                epoch: 0,
            },
            self.signal_sender.clone(),
        );

        let engines = self
            .backend
            .create_engines(&source, start_position, sink)
            .map_err(|e| SessionError::EngineUnavailable {
                reason: e.to_string(),
            })?;

        let (event_sender, events) =
            SessionEvents::channel(id, self.config.session.event_capacity);
        let mut session = Session::new(
            id,
            source,
            request.media_id,
            engines,
            &self.config,
            event_sender,
        );

        self.store.reset(
            initial
                .volume
                .unwrap_or(self.config.playback.initial_volume),
            initial.muted.unwrap_or(false),
        );
        self.store.apply_seek(start_position);
        let state = self.store.state();
        session.resources.media().set_volume(state.volume);
        session.resources.media().set_muted(state.is_muted);

        session.pending.quality = initial.quality;
        if start_position > 0.0 {
            session.pending.seek = Some(start_position);
        }

        tracing::info!(
            session = %id,
            source = %session.source,
            start_position,
            adaptive = session.resources.is_adaptive(),
            "Opened playback session"
        );

        session.set_phase(SessionPhase::Loading);
        let adaptive = session.resources.is_adaptive();
        if adaptive {
            self.spawn_manifest_fetch(&mut session);
        }
        self.session = Some(session);

        if !adaptive {
            self.become_ready();
        }

        Ok(events)
    }

    /// Releases the active session. Safe to call repeatedly.
    pub async fn dispose(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        session.resources.release();
        self.store.set_playing(false);
        self.last_phase = SessionPhase::Disposed;
        tracing::info!(session = %session.id, "Disposed playback session");

        self.persist_position(session.media_id.as_ref()).await;
    }

    pub fn phase(&self) -> SessionPhase {
        self.session
            .as_ref()
            .map(|session| session.phase)
            .unwrap_or(self.last_phase)
    }

    pub fn snapshot(&self) -> PlaybackState {
        self.store.snapshot()
    }

    /// # Errors
    ///
    /// - `SessionError::NoActiveSession` - Nothing is open
    pub fn tracks(&self) -> Result<Vec<Track>, SessionError> {
        Ok(self.active()?.visible_tracks())
    }

    /// # Errors
    ///
    /// - `SessionError::NoActiveSession` - Nothing is open
    pub fn levels(&self) -> Result<Vec<QualityLevel>, SessionError> {
        Ok(self.active()?.quality.levels().to_vec())
    }

    /// Starts or pauses playback.
    ///
    /// Queued while the manifest loads. Pausing persists the resume
    /// position, except for a queued pause, where the position is still
    /// the start or resume offset. Playing from `Ended` restarts at the
    /// beginning.
    ///
    /// # Errors
    ///
    /// - `SessionError::NoActiveSession` - Nothing is open
    pub async fn set_playing(&mut self, playing: bool) -> Result<(), SessionError> {
        let session = self.session.as_mut().ok_or(SessionError::NoActiveSession)?;

        if session.phase == SessionPhase::Loading {
            session.pending.playing = Some(playing);
            return Ok(());
        }

        if !self.store.set_playing(playing) {
            return Ok(());
        }

        let target = if playing {
            if session.phase == SessionPhase::Ended {
                session.resources.media().seek(0.0);
                self.store.apply_seek(0.0);
            }
            session.resources.media().play();
            SessionPhase::Playing
        } else {
            session.resources.media().pause();
            SessionPhase::Paused
        };

        if session.phase == SessionPhase::Recovering {
            session.resume_phase = Some(target);
        } else {
            session.set_phase(target);
        }

        if !playing {
            let media_id = session.media_id.clone();
            self.persist_position(media_id.as_ref()).await;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// - `SessionError::NoActiveSession` - Nothing is open
    pub async fn toggle_play(&mut self) -> Result<(), SessionError> {
        let session = self.active()?;
        let playing = match session.phase {
            SessionPhase::Loading => session.pending.playing.unwrap_or(false),
            _ => self.store.state().is_playing,
        };
        self.set_playing(!playing).await
    }

    /// Moves the playhead, clamped to `[0, duration]`.
    ///
    /// Deferred until the duration is known; the latest deferred target wins.
    ///
    /// # Errors
    ///
    /// - `SessionError::NoActiveSession` - Nothing is open
    pub fn seek(&mut self, target: SeekTarget) -> Result<(), SessionError> {
        let session = self.session.as_mut().ok_or(SessionError::NoActiveSession)?;

        match self.store.resolve_seek(target) {
            SeekResolution::Apply(position) => {
                session.pending.seek = None;
                session.resources.media().seek(position);
                self.store.apply_seek(position);
                if session.phase == SessionPhase::Ended && !self.store.state().is_at_end() {
                    session.set_phase(SessionPhase::Paused);
                }
            }
            SeekResolution::Defer(position) => session.pending.seek = Some(position),
            SeekResolution::Unchanged => {}
        }
        Ok(())
    }

    /// # Errors
    ///
    /// - `SessionError::NoActiveSession` - Nothing is open
    pub fn set_volume(&mut self, volume: f64) -> Result<(), SessionError> {
        let session = self.session.as_mut().ok_or(SessionError::NoActiveSession)?;
        if self.store.set_volume(volume) {
            session.resources.media().set_volume(self.store.state().volume);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// - `SessionError::NoActiveSession` - Nothing is open
    pub fn set_muted(&mut self, muted: bool) -> Result<(), SessionError> {
        let session = self.session.as_mut().ok_or(SessionError::NoActiveSession)?;
        if self.store.set_muted(muted) {
            session.resources.media().set_muted(muted);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// - `SessionError::NoActiveSession` - Nothing is open
    pub fn toggle_mute(&mut self) -> Result<(), SessionError> {
        let muted = self.store.state().is_muted;
        self.set_muted(!muted)
    }

    /// # Errors
    ///
    /// - `SessionError::NoActiveSession` - Nothing is open
    pub fn set_fullscreen(&mut self, fullscreen: bool) -> Result<(), SessionError> {
        let session = self.session.as_mut().ok_or(SessionError::NoActiveSession)?;
        if self.store.set_fullscreen(fullscreen) {
            session.resources.media().set_fullscreen(fullscreen);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// - `SessionError::NoActiveSession` - Nothing is open
    pub fn toggle_fullscreen(&mut self) -> Result<(), SessionError> {
        let fullscreen = self.store.state().is_fullscreen;
        self.set_fullscreen(!fullscreen)
    }

    /// Pins the level matching `vertical_resolution`, or the default level.
    ///
    /// # Errors
    ///
    /// - `SessionError::NoActiveSession` - Nothing is open
    pub fn select_quality(
        &mut self,
        vertical_resolution: u32,
    ) -> Result<QualitySelection, SessionError> {
        let session = self.session.as_mut().ok_or(SessionError::NoActiveSession)?;

        if session.manifest.is_none() {
            if !session.resources.is_adaptive() {
                return Ok(QualitySelection::Unavailable);
            }
            session.pending.quality = Some(vertical_resolution);
            return Ok(QualitySelection::Queued);
        }

        Ok(apply_quality(session, &mut self.store, vertical_resolution))
    }

    /// Replaces the subtitle track set. Queued while the manifest loads.
    ///
    /// # Errors
    ///
    /// - `SessionError::NoActiveSession` - Nothing is open
    pub fn set_tracks(&mut self, tracks: Vec<Track>) -> Result<(), SessionError> {
        let session = self.session.as_mut().ok_or(SessionError::NoActiveSession)?;

        if session.phase == SessionPhase::Loading {
            session.pending.tracks = Some(tracks);
            session.pending.subtitle = None;
            return Ok(());
        }

        apply_tracks(session, &mut self.store, tracks);
        Ok(())
    }

    /// Shows the subtitle track with `language`, or hides subtitles.
    ///
    /// # Errors
    ///
    /// - `SessionError::NoActiveSession` - Nothing is open
    /// - `SessionError::UnknownTrack` - No track with that language
    pub fn select_subtitle(&mut self, language: Option<String>) -> Result<(), SessionError> {
        let session = self.session.as_mut().ok_or(SessionError::NoActiveSession)?;

        if session.phase == SessionPhase::Loading {
            let known = language.as_ref().is_none_or(|language| {
                session
                    .visible_tracks()
                    .iter()
                    .any(|track| track.language_code == *language)
            });
            if !known {
                return Err(SessionError::UnknownTrack {
                    name: language.unwrap_or_default(),
                });
            }
            session.pending.subtitle = Some(language);
            return Ok(());
        }

        let media = session.resources.media();
        match session.tracks.show(language.as_deref(), media) {
            Some(shown) => {
                self.store.set_active_subtitle(shown);
                Ok(())
            }
            None => Err(SessionError::UnknownTrack {
                name: language.unwrap_or_default(),
            }),
        }
    }

    /// Switches to the manifest audio rendition called `name`.
    ///
    /// # Errors
    ///
    /// - `SessionError::NoActiveSession` - Nothing is open
    /// - `SessionError::UnknownTrack` - No rendition with that name
    pub fn select_audio_track(&mut self, name: String) -> Result<(), SessionError> {
        let session = self.session.as_mut().ok_or(SessionError::NoActiveSession)?;

        if session.manifest.is_none() {
            if !session.resources.is_adaptive() {
                return Err(SessionError::UnknownTrack { name });
            }
            session.pending.audio_track = Some(name);
            return Ok(());
        }

        if apply_audio_track(session, &mut self.store, &name) {
            Ok(())
        } else {
            Err(SessionError::UnknownTrack { name })
        }
    }

    /// Applies a signal from the engines or the manifest fetch.
    ///
    /// Signals tagged for anything but the live engine generation of the
    /// active session are dropped.
    pub(crate) fn handle_signal(&mut self, tagged: TaggedSignal) {
        let live = self.session.as_ref().map(Session::tag);
        if live != Some(tagged.tag) {
            tracing::debug!(
                session = %tagged.tag.session,
                epoch = tagged.tag.epoch,
                "Dropping stale signal"
            );
            return;
        }

        match tagged.signal {
            SessionSignal::ManifestLoaded(Ok(manifest)) => self.on_manifest_loaded(manifest),
            SessionSignal::ManifestLoaded(Err(error)) => {
                if let Some(session) = self.session.as_mut() {
                    session.resources.clear_manifest_fetch();
                }
                self.handle_fault(FaultKind::from_manifest_error(&error), error.to_string());
            }
            SessionSignal::Engine(signal) => self.on_engine_signal(signal),
        }
    }

    fn on_engine_signal(&mut self, signal: EngineSignal) {
        match signal {
            EngineSignal::TimeUpdate {
                current_time,
                duration,
            } => self.on_time_update(current_time, duration),
            EngineSignal::DurationChanged { duration } => {
                self.store.set_duration(duration);
                self.apply_pending_seek();
            }
            EngineSignal::LevelSwitched { index } => {
                if let Some(session) = self.session.as_ref()
                    && let Some(level) = session.quality.level(index)
                {
                    self.store.set_quality(Some(level.clone()));
                }
            }
            EngineSignal::EndOfStream => self.finish(),
            EngineSignal::Error(event) => match FaultKind::from_error_event(&event) {
                Some(kind) => self.handle_fault(kind, event.details),
                None => tracing::debug!(
                    kind = ?event.raw_kind,
                    source = ?event.source,
                    details = %event.details,
                    "Engine recovered from non-fatal error"
                ),
            },
        }
    }

    fn on_time_update(&mut self, current_time: f64, duration: Option<f64>) {
        self.store.update_time(current_time, duration);
        self.apply_pending_seek();

        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.finish_recovering();
        session.emit(PlayerEvent::Progress(self.store.snapshot()));

        if self.store.state().is_at_end() {
            self.finish();
        }
    }

    fn on_manifest_loaded(&mut self, manifest: Manifest) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.resources.clear_manifest_fetch();

        let start = session
            .pending
            .seek
            .unwrap_or(self.store.state().current_time);
        if let Some(streaming) = session.resources.streaming() {
            streaming.attach_manifest(&manifest);
            streaming.start_load(start);
        }

        session.quality.resolve_levels(manifest.levels.clone());
        self.store
            .set_active_audio_track(manifest.default_audio().map(|audio| audio.name.clone()));

        tracing::info!(
            session = %session.id,
            levels = manifest.levels.len(),
            audio_renditions = manifest.audio_renditions.len(),
            "Manifest resolved"
        );
        session.manifest = Some(manifest);

        self.become_ready();
    }

    /// Moves a loaded session to `Ready` and applies everything queued.
    fn become_ready(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.set_phase(SessionPhase::Ready);

        let pending = std::mem::take(&mut session.pending);

        if let Some(name) = pending.audio_track
            && !apply_audio_track(session, &mut self.store, &name)
        {
            tracing::warn!(session = %session.id, name = %name, "Queued audio track not in manifest");
        }
        if let Some(vertical_resolution) = pending.quality {
            apply_quality(session, &mut self.store, vertical_resolution);
        }
        if let Some(tracks) = pending.tracks {
            apply_tracks(session, &mut self.store, tracks);
        }
        if let Some(language) = pending.subtitle {
            let media = session.resources.media();
            match session.tracks.show(language.as_deref(), media) {
                Some(shown) => {
                    self.store.set_active_subtitle(shown);
                }
                None => tracing::warn!(session = %session.id, "Queued subtitle no longer attached"),
            }
        }
        session.pending.seek = pending.seek;
        let playing = pending.playing;

        self.apply_pending_seek();
        if playing == Some(true)
            && let Some(session) = self.session.as_mut()
        {
            session.resources.media().play();
            self.store.set_playing(true);
            session.set_phase(SessionPhase::Playing);
        }
    }

    /// Applies a deferred seek once the duration is known.
    fn apply_pending_seek(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(position) = session.pending.seek else {
            return;
        };

        match self.store.resolve_seek(SeekTarget::Absolute(position)) {
            SeekResolution::Apply(position) => {
                session.pending.seek = None;
                session.resources.media().seek(position);
                self.store.apply_seek(position);
            }
            SeekResolution::Unchanged => session.pending.seek = None,
            SeekResolution::Defer(_) => {}
        }
    }

    /// Handles natural end of stream; notifies the caller once per session.
    fn finish(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        self.store.set_playing(false);
        session.set_phase(SessionPhase::Ended);
        if !session.ended_notified {
            session.ended_notified = true;
            tracing::info!(session = %session.id, "Playback ended");
            session.emit(PlayerEvent::Ended);
        }
    }

    fn handle_fault(&mut self, kind: FaultKind, reason: String) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let action = session.recovery.on_fault(kind, reason.clone());
        match action {
            RecoveryAction::Reload => {
                tracing::warn!(
                    session = %session.id,
                    attempt = session.recovery.network_attempts(),
                    reason = %reason,
                    "Network fault, reloading"
                );
                session.enter_recovering();

                if !session.resources.is_adaptive() {
                    self.rebuild_engines(kind);
                } else if session.manifest.is_none() {
                    self.spawn_fetch_for_active();
                } else {
                    let position = self.store.state().current_time;
                    if let Some(streaming) = session.resources.streaming() {
                        streaming.start_load(position);
                    }
                }
            }
            RecoveryAction::RecoverMedia => {
                tracing::warn!(session = %session.id, reason = %reason, "Decode fault, recovering media");
                session.enter_recovering();
                session.resources.media().recover_media_error();
                if let Some(streaming) = session.resources.streaming() {
                    streaming.recover_media_error();
                }
            }
            RecoveryAction::Reinitialize => {
                tracing::warn!(
                    session = %session.id,
                    reason = %reason,
                    "Repeated decode fault, reinitializing session"
                );
                self.rebuild_engines(kind);
            }
            RecoveryAction::Fail(notice) => self.fail(notice),
        }
    }

    /// Tears the engines down and recreates them at the last known position.
    fn rebuild_engines(&mut self, kind: FaultKind) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let resume_at = self.store.state().current_time;
        let was_playing =
            self.store.state().is_playing || session.pending.playing == Some(true);
        let tracks = session.tracks.take();

        session.resources.release();
        session.epoch += 1;
        let sink = SignalSink::new(session.tag(), self.signal_sender.clone());

        let engines = match self.backend.create_engines(&session.source, resume_at, sink) {
            Ok(engines) => engines,
            Err(e) => {
                let notice = FailureNotice {
                    kind,
                    attempts: session.recovery.reinitializations(),
                    reason: format!("reinitialization failed: {e}"),
                };
                self.fail(notice);
                return;
            }
        };

        session.resources = SessionResources::new(engines);
        let state = self.store.state();
        session.resources.media().set_volume(state.volume);
        session.resources.media().set_muted(state.is_muted);
        if state.is_fullscreen {
            session.resources.media().set_fullscreen(true);
        }

        session.manifest = None;
        session.quality.resolve_levels(Vec::new());
        session.pending.seek = Some(resume_at);
        if was_playing {
            session.pending.playing = Some(true);
        }
        if session.pending.tracks.is_none() && !tracks.is_empty() {
            session.pending.tracks = Some(tracks);
            if session.pending.subtitle.is_none() {
                session.pending.subtitle = Some(state.active_subtitle.clone());
            }
        }
        if session.pending.audio_track.is_none() {
            session.pending.audio_track = state.active_audio_track.clone();
        }
        self.store.set_playing(false);
        self.store.set_quality(None);

        tracing::info!(
            session = %session.id,
            epoch = session.epoch,
            resume_at,
            "Session engines recreated"
        );

        session.resume_phase = None;
        session.set_phase(SessionPhase::Loading);
        if session.resources.is_adaptive() {
            self.spawn_fetch_for_active();
        } else {
            self.become_ready();
        }
    }

    /// Ends the session on a fatal fault.
    ///
    /// The failure notice is the last event; dropping the session releases
    /// its resources and closes the event channel.
    fn fail(&mut self, notice: FailureNotice) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        tracing::error!(
            session = %session.id,
            kind = ?notice.kind,
            attempts = notice.attempts,
            reason = %notice.reason,
            "Playback session failed"
        );

        session.resources.release();
        self.store.set_playing(false);
        self.last_phase = SessionPhase::Failed;
        session.emit(PlayerEvent::Failed(notice));
    }

    fn spawn_fetch_for_active(&mut self) {
        if let Some(mut session) = self.session.take() {
            self.spawn_manifest_fetch(&mut session);
            self.session = Some(session);
        }
    }

    fn spawn_manifest_fetch(&self, session: &mut Session) {
        let loader = Arc::clone(&self.loader);
        let sender = self.signal_sender.clone();
        let source = session.source.clone();
        let tag = session.tag();

        let task = tokio::spawn(async move {
            let result = loader.load(&source).await;
            let _ = sender.send(TaggedSignal {
                tag,
                signal: SessionSignal::ManifestLoaded(result),
            });
        });

        session.resources.set_manifest_fetch(task.abort_handle());
    }

    fn validate_source(&self, source_url: &str) -> Result<Url, SessionError> {
        let url = Url::parse(source_url).map_err(|e| SessionError::SourceUnavailable {
            url: source_url.to_string(),
            reason: e.to_string(),
        })?;

        if !self
            .config
            .session
            .allowed_schemes
            .iter()
            .any(|scheme| scheme == url.scheme())
        {
            return Err(SessionError::SourceUnavailable {
                url: source_url.to_string(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        Ok(url)
    }

    fn active(&self) -> Result<&Session, SessionError> {
        self.session.as_ref().ok_or(SessionError::NoActiveSession)
    }

    async fn load_resume_position(&self, media_id: &MediaId) -> Option<f64> {
        match self.resume_store.resume_position(media_id).await {
            Ok(position) => position,
            Err(e) => {
                tracing::warn!(media_id = %media_id, error = %e, "Failed to read resume position");
                None
            }
        }
    }

    async fn persist_position(&self, media_id: Option<&MediaId>) {
        let Some(media_id) = media_id else {
            return;
        };

        let position = self.store.state().current_time;
        if let Err(e) = self
            .resume_store
            .save_resume_position(media_id, position)
            .await
        {
            tracing::warn!(media_id = %media_id, error = %e, "Failed to persist resume position");
        }
    }
}

fn apply_quality(
    session: &mut Session,
    store: &mut PlaybackStore,
    vertical_resolution: u32,
) -> QualitySelection {
    let previous = session.quality.selected();
    let Some((level, exact)) = session.quality.select(vertical_resolution) else {
        return QualitySelection::Unavailable;
    };

    if !exact {
        tracing::debug!(
            session = %session.id,
            requested = vertical_resolution,
            fallback = %level,
            "Requested quality not advertised, using default level"
        );
    }

    if previous != Some(level.index)
        && let Some(streaming) = session.resources.streaming()
    {
        streaming.set_level(Some(level.index));
    }
    store.set_quality(Some(level.clone()));
    QualitySelection::Applied(level)
}

fn apply_tracks(session: &mut Session, store: &mut PlaybackStore, tracks: Vec<Track>) {
    let media = session.resources.media();
    if session.tracks.replace(tracks, media) {
        let language = session
            .tracks
            .default_track()
            .map(|track| track.language_code.clone());
        store.set_active_subtitle(language);
    }
}

fn apply_audio_track(session: &mut Session, store: &mut PlaybackStore, name: &str) -> bool {
    let Some(index) = session.manifest.as_ref().and_then(|manifest| {
        manifest
            .audio_renditions
            .iter()
            .find(|rendition| rendition.name == name)
            .map(|rendition| rendition.index)
    }) else {
        return false;
    };

    if store.set_active_audio_track(Some(name.to_string()))
        && let Some(streaming) = session.resources.streaming()
    {
        streaming.set_audio_track(index);
    }
    true
}
