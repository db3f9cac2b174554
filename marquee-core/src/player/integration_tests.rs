//! Scenario tests driving the player actor through its handle.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::config::MarqueeConfig;
    use crate::manifest::ManifestError;
    use crate::media::{EngineSignal, RawErrorKind};
    use crate::persistence::{MediaId, MemoryResumeStore, ResumeStore};
    use crate::player::test_mocks::{EngineCall, MockMediaBackend, MockManifestLoader};
    use crate::player::{
        FaultKind, InitialState, OpenRequest, PlayerEvent, PlayerHandle, QualitySelection,
        SeekTarget, SessionError, SessionEvents, SessionPhase, Track, spawn_player,
    };

    const SOURCE_A: &str = "https://cdn.test/a/master.m3u8";
    const SOURCE_B: &str = "https://cdn.test/b/master.m3u8";

    struct Harness {
        player: PlayerHandle,
        backend: MockMediaBackend,
        loader: MockManifestLoader,
        resume_store: Arc<MemoryResumeStore>,
    }

    fn harness_with(backend: MockMediaBackend) -> Harness {
        let loader = MockManifestLoader::new();
        let resume_store = Arc::new(MemoryResumeStore::new());
        let player = spawn_player(
            MarqueeConfig::for_testing(),
            Arc::new(backend.clone()),
            Arc::new(loader.clone()),
            resume_store.clone(),
        );
        Harness {
            player,
            backend,
            loader,
            resume_store,
        }
    }

    fn harness() -> Harness {
        harness_with(MockMediaBackend::new())
    }

    async fn next_event(events: &mut SessionEvents) -> Option<PlayerEvent> {
        tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("timed out waiting for player event")
    }

    async fn wait_for_phase(events: &mut SessionEvents, phase: SessionPhase) {
        loop {
            match next_event(events).await {
                Some(PlayerEvent::PhaseChanged(current)) if current == phase => return,
                Some(_) => continue,
                None => panic!("event stream closed before reaching {phase:?}"),
            }
        }
    }

    async fn drain(events: &mut SessionEvents) -> Vec<PlayerEvent> {
        let mut drained = Vec::new();
        while let Some(event) = next_event(events).await {
            drained.push(event);
        }
        drained
    }

    async fn open_ready(harness: &Harness, source: &str) -> SessionEvents {
        let mut events = harness
            .player
            .open(OpenRequest::new(source))
            .await
            .unwrap();
        wait_for_phase(&mut events, SessionPhase::Ready).await;
        events
    }

    fn subtitle(language: &str) -> Track {
        Track::new(format!("https://cdn.test/subs/{language}.vtt"), language, language)
    }

    #[tokio::test]
    async fn test_open_applies_initial_quality_after_manifest() {
        let harness = harness();
        let mut events = harness
            .player
            .open(OpenRequest::new(SOURCE_A).with_initial_state(InitialState {
                quality: Some(720),
                ..InitialState::default()
            }))
            .await
            .unwrap();

        assert_eq!(
            next_event(&mut events).await,
            Some(PlayerEvent::PhaseChanged(SessionPhase::Loading))
        );
        wait_for_phase(&mut events, SessionPhase::Ready).await;

        let state = harness.player.state().await.unwrap();
        assert_eq!(state.quality.unwrap().label, "720p");
        assert_eq!(state.active_audio_track.as_deref(), Some("English"));

        let probe = harness.backend.latest_probe().unwrap();
        let calls = probe.calls();
        assert!(calls.contains(&EngineCall::AttachManifest(3)));
        assert!(calls.contains(&EngineCall::SetLevel(Some(1))));
    }

    #[tokio::test]
    async fn test_select_quality_exact_and_default_fallback() {
        let harness = harness();
        let _events = open_ready(&harness, SOURCE_A).await;

        let exact = harness.player.select_quality(720).await.unwrap();
        assert!(matches!(exact, QualitySelection::Applied(ref level) if level.label == "720p"));
        assert_eq!(
            harness.player.state().await.unwrap().quality.unwrap().label,
            "720p"
        );

        let fallback = harness.player.select_quality(900).await.unwrap();
        assert!(
            matches!(fallback, QualitySelection::Applied(ref level) if level.vertical_resolution == 1080)
        );
        assert_eq!(
            harness.player.state().await.unwrap().quality.unwrap().label,
            "1080p"
        );

        let levels = harness.player.levels().await.unwrap();
        assert_eq!(levels.len(), 3);
    }

    #[tokio::test]
    async fn test_quality_and_tracks_queue_until_manifest_resolves() {
        let harness = harness();
        harness.loader.hold(SOURCE_A);
        let mut events = harness
            .player
            .open(OpenRequest::new(SOURCE_A))
            .await
            .unwrap();

        assert_eq!(
            harness.player.select_quality(480).await.unwrap(),
            QualitySelection::Queued
        );
        assert_eq!(
            harness.player.select_quality(1080).await.unwrap(),
            QualitySelection::Queued
        );
        harness
            .player
            .set_tracks(vec![
                subtitle("en"),
                subtitle("fr").as_default(),
                subtitle("de").as_default(),
            ])
            .await
            .unwrap();

        let queued = harness.player.tracks().await.unwrap();
        assert_eq!(queued.iter().filter(|track| track.is_default).count(), 1);
        assert!(queued[0].is_default);

        let probe = harness.backend.latest_probe().unwrap();
        assert_eq!(probe.count(|call| matches!(call, EngineCall::AttachTrack(_))), 0);

        harness.loader.release(SOURCE_A);
        wait_for_phase(&mut events, SessionPhase::Ready).await;

        let state = harness.player.state().await.unwrap();
        assert_eq!(state.quality.unwrap().label, "1080p");
        assert_eq!(state.active_subtitle.as_deref(), Some("en"));
        assert_eq!(probe.count(|call| matches!(call, EngineCall::AttachTrack(_))), 3);
        assert_eq!(probe.count(|call| matches!(call, EngineCall::SetLevel(_))), 1);
    }

    #[tokio::test]
    async fn test_set_tracks_replaces_and_skips_equal_set() {
        let harness = harness();
        let _events = open_ready(&harness, SOURCE_A).await;
        let probe = harness.backend.latest_probe().unwrap();

        harness
            .player
            .set_tracks(vec![subtitle("en"), subtitle("fr")])
            .await
            .unwrap();
        harness
            .player
            .set_tracks(vec![subtitle("en"), subtitle("fr")])
            .await
            .unwrap();
        assert_eq!(probe.count(|call| matches!(call, EngineCall::AttachTrack(_))), 2);

        harness.player.set_tracks(Vec::new()).await.unwrap();
        assert_eq!(probe.count(|call| matches!(call, EngineCall::DetachTrack(_))), 2);
        assert!(harness.player.tracks().await.unwrap().is_empty());
        assert_eq!(harness.player.state().await.unwrap().active_subtitle, None);
    }

    #[tokio::test]
    async fn test_subtitle_and_audio_selection() {
        let harness = harness();
        let _events = open_ready(&harness, SOURCE_A).await;
        let probe = harness.backend.latest_probe().unwrap();

        harness
            .player
            .set_tracks(vec![subtitle("en"), subtitle("fr")])
            .await
            .unwrap();
        harness.player.select_subtitle(Some("fr")).await.unwrap();
        assert_eq!(
            harness.player.state().await.unwrap().active_subtitle.as_deref(),
            Some("fr")
        );
        assert_eq!(
            harness.player.select_subtitle(Some("ja")).await,
            Err(SessionError::UnknownTrack {
                name: "ja".to_string()
            })
        );

        harness.player.select_audio_track("Français").await.unwrap();
        assert!(probe.calls().contains(&EngineCall::SetAudioTrack(1)));
        assert!(matches!(
            harness.player.select_audio_track("Klingon").await,
            Err(SessionError::UnknownTrack { .. })
        ));
    }

    #[tokio::test]
    async fn test_seek_deferred_until_duration_known() {
        let harness = harness();
        let mut events = open_ready(&harness, SOURCE_A).await;
        let probe = harness.backend.latest_probe().unwrap();

        harness
            .player
            .seek(SeekTarget::Absolute(30.0))
            .await
            .unwrap();
        assert_eq!(probe.count(|call| matches!(call, EngineCall::Seek(_))), 0);

        probe.time_update(0.0, 100.0);
        match next_event(&mut events).await {
            Some(PlayerEvent::Progress(state)) => {
                assert_eq!(state.current_time, 30.0);
                assert_eq!(state.duration, Some(100.0));
            }
            other => panic!("expected progress, got {other:?}"),
        }
        assert!(probe.calls().contains(&EngineCall::Seek(30.0)));

        harness
            .player
            .seek(SeekTarget::Absolute(500.0))
            .await
            .unwrap();
        assert_eq!(harness.player.state().await.unwrap().current_time, 100.0);

        harness
            .player
            .seek(SeekTarget::Relative(-250.0))
            .await
            .unwrap();
        assert_eq!(harness.player.state().await.unwrap().current_time, 0.0);
    }

    #[tokio::test]
    async fn test_volume_is_clamped_and_idempotent() {
        let harness = harness();
        let _events = open_ready(&harness, SOURCE_A).await;
        let probe = harness.backend.latest_probe().unwrap();

        harness.player.set_volume(-0.5).await.unwrap();
        harness.player.set_volume(0.0).await.unwrap();
        assert_eq!(harness.player.state().await.unwrap().volume, 0.0);
        assert_eq!(probe.count(|call| *call == EngineCall::SetVolume(0.0)), 1);

        harness.player.set_volume(7.0).await.unwrap();
        assert_eq!(harness.player.state().await.unwrap().volume, 1.0);

        harness.player.set_muted(true).await.unwrap();
        harness.player.set_muted(true).await.unwrap();
        assert_eq!(probe.count(|call| *call == EngineCall::SetMuted(true)), 1);

        harness.player.toggle_fullscreen().await.unwrap();
        assert!(harness.player.state().await.unwrap().is_fullscreen);
    }

    #[tokio::test]
    async fn test_two_decode_faults_reinitialize_once_at_last_position() {
        let harness = harness();
        let mut events = open_ready(&harness, SOURCE_A).await;
        let first = harness.backend.latest_probe().unwrap();

        first.time_update(42.0, 100.0);
        first.fatal_error(RawErrorKind::Media);
        first.fatal_error(RawErrorKind::Media);

        wait_for_phase(&mut events, SessionPhase::Loading).await;
        wait_for_phase(&mut events, SessionPhase::Ready).await;

        assert_eq!(harness.backend.creation_count(), 2);
        assert!(first.calls().contains(&EngineCall::RecoverMedia));
        assert!(first.is_released());

        let second = harness.backend.latest_probe().unwrap();
        assert_eq!(second.start_position, 42.0);
        assert!(second.calls().contains(&EngineCall::StartLoad(42.0)));
        assert_eq!(harness.player.state().await.unwrap().current_time, 42.0);

        // Signals from the discarded engines no longer apply
        first.time_update(3.0, 100.0);
        assert_eq!(harness.player.state().await.unwrap().current_time, 42.0);
    }

    #[tokio::test]
    async fn test_reinitialization_keeps_subtitle_choice() {
        let harness = harness();
        let mut events = open_ready(&harness, SOURCE_A).await;
        harness
            .player
            .set_tracks(vec![subtitle("en").as_default(), subtitle("fr")])
            .await
            .unwrap();
        harness.player.select_subtitle(Some("fr")).await.unwrap();

        let first = harness.backend.latest_probe().unwrap();
        first.fatal_error(RawErrorKind::Media);
        first.fatal_error(RawErrorKind::Media);

        wait_for_phase(&mut events, SessionPhase::Loading).await;
        wait_for_phase(&mut events, SessionPhase::Ready).await;

        let state = harness.player.state().await.unwrap();
        assert_eq!(state.active_subtitle.as_deref(), Some("fr"));
        assert_eq!(harness.player.tracks().await.unwrap().len(), 2);

        let second = harness.backend.latest_probe().unwrap();
        assert!(second.calls().contains(&EngineCall::ShowTextTrack(Some(1))));
    }

    #[tokio::test]
    async fn test_reinitialization_forgets_levels_until_manifest_reloads() {
        let harness = harness();
        let mut events = open_ready(&harness, SOURCE_A).await;
        assert!(matches!(
            harness.player.select_quality(720).await.unwrap(),
            QualitySelection::Applied(_)
        ));

        harness.loader.hold(SOURCE_A);
        let first = harness.backend.latest_probe().unwrap();
        first.fatal_error(RawErrorKind::Media);
        first.fatal_error(RawErrorKind::Media);
        wait_for_phase(&mut events, SessionPhase::Loading).await;

        let state = harness.player.state().await.unwrap();
        assert!(state.quality.is_none());
        assert!(harness.player.levels().await.unwrap().is_empty());

        harness.loader.release(SOURCE_A);
        wait_for_phase(&mut events, SessionPhase::Ready).await;
        assert_eq!(harness.player.levels().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_fourth_network_fault_fails_session() {
        let harness = harness();
        let mut events = open_ready(&harness, SOURCE_A).await;
        let probe = harness.backend.latest_probe().unwrap();

        for _ in 0..4 {
            probe.fatal_error(RawErrorKind::Network);
        }

        let drained = drain(&mut events).await;
        match drained.last() {
            Some(PlayerEvent::Failed(notice)) => {
                assert_eq!(notice.kind, FaultKind::NetworkFault);
                assert_eq!(notice.attempts, 3);
            }
            other => panic!("expected failure notice, got {other:?}"),
        }
        assert_eq!(
            drained
                .iter()
                .filter(|event| matches!(event, PlayerEvent::Failed(_)))
                .count(),
            1
        );

        assert_eq!(harness.player.phase().await.unwrap(), SessionPhase::Failed);
        assert!(probe.is_released());
        assert!(probe.calls().contains(&EngineCall::Destroy));
        assert_eq!(probe.count(|call| matches!(call, EngineCall::StartLoad(_))), 4);
        assert_eq!(
            harness.player.set_playing(true).await,
            Err(SessionError::NoActiveSession)
        );
    }

    #[tokio::test]
    async fn test_manifest_network_failures_are_retried_then_fatal() {
        let harness = harness();
        for _ in 0..4 {
            harness.loader.push_failure(ManifestError::Network {
                reason: "connection reset".to_string(),
            });
        }

        let mut events = harness
            .player
            .open(OpenRequest::new(SOURCE_A))
            .await
            .unwrap();

        let drained = drain(&mut events).await;
        assert!(matches!(
            drained.last(),
            Some(PlayerEvent::Failed(notice)) if notice.kind == FaultKind::NetworkFault
        ));
        assert_eq!(harness.loader.load_count(), 4);
    }

    #[tokio::test]
    async fn test_manifest_recovers_after_transient_failure() {
        let harness = harness();
        harness.loader.push_failure(ManifestError::Network {
            reason: "timeout".to_string(),
        });

        let mut events = harness
            .player
            .open(OpenRequest::new(SOURCE_A))
            .await
            .unwrap();
        wait_for_phase(&mut events, SessionPhase::Ready).await;
        assert_eq!(harness.loader.load_count(), 2);
    }

    #[tokio::test]
    async fn test_unhandled_fault_is_fatal() {
        let harness = harness();
        let mut events = open_ready(&harness, SOURCE_A).await;
        let probe = harness.backend.latest_probe().unwrap();

        probe.fatal_error(RawErrorKind::KeySystem);

        let drained = drain(&mut events).await;
        assert!(matches!(
            drained.as_slice(),
            [PlayerEvent::Failed(notice)] if notice.kind == FaultKind::UnhandledFault
        ));
        assert!(probe.is_released());
    }

    #[tokio::test]
    async fn test_non_fatal_errors_are_ignored() {
        let harness = harness();
        let _events = open_ready(&harness, SOURCE_A).await;
        let probe = harness.backend.latest_probe().unwrap();

        probe.emit(EngineSignal::Error(crate::media::ErrorEvent::transient(
            RawErrorKind::Network,
            crate::media::FaultSource::StreamingEngine,
            "segment retry",
        )));

        assert_eq!(harness.player.phase().await.unwrap(), SessionPhase::Ready);
        assert_eq!(probe.count(|call| matches!(call, EngineCall::StartLoad(_))), 1);
    }

    #[tokio::test]
    async fn test_open_replaces_pending_session() {
        let harness = harness();
        harness.loader.hold(SOURCE_A);

        let mut events_a = harness
            .player
            .open(OpenRequest::new(SOURCE_A))
            .await
            .unwrap();
        let probe_a = harness.backend.latest_probe().unwrap();

        let mut events_b = open_ready(&harness, SOURCE_B).await;
        let probe_b = harness.backend.latest_probe().unwrap();
        harness.loader.release(SOURCE_A);

        probe_a.time_update(99.0, 100.0);
        probe_b.time_update(5.0, 100.0);

        match next_event(&mut events_b).await {
            Some(PlayerEvent::Progress(state)) => assert_eq!(state.current_time, 5.0),
            other => panic!("expected progress, got {other:?}"),
        }
        assert_eq!(harness.player.state().await.unwrap().current_time, 5.0);

        let drained_a = drain(&mut events_a).await;
        assert_eq!(
            drained_a,
            vec![PlayerEvent::PhaseChanged(SessionPhase::Loading)]
        );
        assert!(probe_a.is_released());
        assert!(!probe_b.is_released());
    }

    #[tokio::test]
    async fn test_dispose_stops_events_and_is_idempotent() {
        let harness = harness();
        let mut events = open_ready(&harness, SOURCE_A).await;
        let probe = harness.backend.latest_probe().unwrap();

        harness.player.dispose().await.unwrap();
        harness.player.dispose().await.unwrap();

        probe.time_update(10.0, 100.0);
        probe.emit(EngineSignal::EndOfStream);

        assert!(drain(&mut events).await.is_empty());
        assert_eq!(probe.release_count(), 1);
        assert_eq!(probe.count(|call| *call == EngineCall::Destroy), 1);
        assert_eq!(harness.player.phase().await.unwrap(), SessionPhase::Disposed);
    }

    #[tokio::test]
    async fn test_ended_is_notified_once() {
        let harness = harness();
        let mut events = open_ready(&harness, SOURCE_A).await;
        let probe = harness.backend.latest_probe().unwrap();

        harness.player.set_playing(true).await.unwrap();
        probe.time_update(100.0, 100.0);
        probe.emit(EngineSignal::EndOfStream);
        assert_eq!(harness.player.phase().await.unwrap(), SessionPhase::Ended);

        harness.player.dispose().await.unwrap();
        let drained = drain(&mut events).await;
        assert_eq!(
            drained
                .iter()
                .filter(|event| **event == PlayerEvent::Ended)
                .count(),
            1
        );
        assert!(!harness.player.state().await.unwrap().is_playing);
    }

    #[tokio::test]
    async fn test_queued_autoplay_starts_when_ready() {
        let harness = harness();
        harness.loader.hold(SOURCE_A);
        let mut events = harness
            .player
            .open(OpenRequest::new(SOURCE_A))
            .await
            .unwrap();

        harness.player.set_playing(true).await.unwrap();
        assert!(!harness.player.state().await.unwrap().is_playing);

        harness.loader.release(SOURCE_A);
        wait_for_phase(&mut events, SessionPhase::Playing).await;

        let probe = harness.backend.latest_probe().unwrap();
        assert_eq!(probe.count(|call| *call == EngineCall::Play), 1);
        assert!(harness.player.state().await.unwrap().is_playing);
    }

    #[tokio::test]
    async fn test_pause_persists_and_open_resumes() {
        let harness = harness();
        let media_id = MediaId::new("movie-7");

        let mut events = harness
            .player
            .open(OpenRequest::new(SOURCE_A).with_media_id(media_id.clone()))
            .await
            .unwrap();
        wait_for_phase(&mut events, SessionPhase::Ready).await;
        let probe = harness.backend.latest_probe().unwrap();

        harness.player.toggle_play().await.unwrap();
        probe.time_update(37.0, 100.0);
        harness.player.toggle_play().await.unwrap();

        assert_eq!(
            harness.resume_store.resume_position(&media_id).await.unwrap(),
            Some(37.0)
        );

        let _events = harness
            .player
            .open(OpenRequest::new(SOURCE_A).with_media_id(media_id.clone()))
            .await
            .unwrap();
        assert_eq!(harness.backend.latest_probe().unwrap().start_position, 37.0);
        assert_eq!(harness.player.state().await.unwrap().current_time, 37.0);
    }

    #[tokio::test]
    async fn test_initial_time_wins_over_resume_position() {
        let harness = harness();
        let media_id = MediaId::new("movie-8");
        harness
            .resume_store
            .save_resume_position(&media_id, 80.0)
            .await
            .unwrap();

        let _events = harness
            .player
            .open(
                OpenRequest::new(SOURCE_A)
                    .with_media_id(media_id)
                    .with_initial_state(InitialState {
                        current_time: Some(12.0),
                        volume: Some(0.3),
                        muted: Some(true),
                        ..InitialState::default()
                    }),
            )
            .await
            .unwrap();

        let probe = harness.backend.latest_probe().unwrap();
        assert_eq!(probe.start_position, 12.0);
        assert!(probe.calls().contains(&EngineCall::SetVolume(0.3)));

        let state = harness.player.state().await.unwrap();
        assert_eq!(state.volume, 0.3);
        assert!(state.is_muted);
    }

    #[tokio::test]
    async fn test_native_playback_has_no_levels() {
        let harness = harness_with(MockMediaBackend::native());
        let mut events = harness
            .player
            .open(OpenRequest::new("https://cdn.test/movie.mp4"))
            .await
            .unwrap();

        assert_eq!(
            next_event(&mut events).await,
            Some(PlayerEvent::PhaseChanged(SessionPhase::Loading))
        );
        assert_eq!(
            next_event(&mut events).await,
            Some(PlayerEvent::PhaseChanged(SessionPhase::Ready))
        );
        assert_eq!(
            harness.player.select_quality(720).await.unwrap(),
            QualitySelection::Unavailable
        );
        assert!(harness.player.levels().await.unwrap().is_empty());
        assert_eq!(harness.loader.load_count(), 0);
    }

    #[tokio::test]
    async fn test_open_rejects_unusable_sources() {
        let harness = harness();

        assert!(matches!(
            harness.player.open(OpenRequest::new("not a url")).await,
            Err(SessionError::SourceUnavailable { .. })
        ));
        assert!(matches!(
            harness
                .player
                .open(OpenRequest::new("ftp://cdn.test/a.m3u8"))
                .await,
            Err(SessionError::SourceUnavailable { .. })
        ));
        assert_eq!(harness.backend.creation_count(), 0);
        assert_eq!(
            harness.player.phase().await.unwrap(),
            SessionPhase::Uninitialized
        );
    }

    #[tokio::test]
    async fn test_engine_creation_failure() {
        let harness = harness_with(MockMediaBackend::failing());
        assert!(matches!(
            harness.player.open(OpenRequest::new(SOURCE_A)).await,
            Err(SessionError::EngineUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_commands_require_session() {
        let harness = harness();

        assert_eq!(
            harness.player.set_volume(0.5).await,
            Err(SessionError::NoActiveSession)
        );
        assert_eq!(
            harness.player.tracks().await,
            Err(SessionError::NoActiveSession)
        );
        harness.player.dispose().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_releases_session() {
        let harness = harness();
        let _events = open_ready(&harness, SOURCE_A).await;
        let probe = harness.backend.latest_probe().unwrap();

        harness.player.shutdown().await.unwrap();

        assert!(probe.is_released());
        assert_eq!(
            harness.player.phase().await,
            Err(SessionError::PlayerShutdown)
        );
    }
}
