//! Session lifecycle driven through the public handle.

use std::time::Duration;

use futures::StreamExt;
use marquee_core::player::{
    OpenRequest, PlayerEvent, QualitySelection, SessionError, SessionPhase, Track,
};
use marquee_sim::scenarios::wait_for_progress;
use marquee_sim::{PlaybackSimulation, SIMULATED_SOURCE, SimulationConfig};

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_quality_switch_during_playback() {
    let simulation = PlaybackSimulation::new(SimulationConfig::with_seed(21));
    let player = simulation.player();

    let mut events = simulation
        .open(OpenRequest::new(SIMULATED_SOURCE))
        .await
        .unwrap();
    player.set_playing(true).await.unwrap();
    wait_for_progress(&mut events, EVENT_TIMEOUT).await.unwrap();

    let selection = player.select_quality(720).await.unwrap();
    assert!(matches!(selection, QualitySelection::Applied(ref level) if level.label == "720p"));

    let fallback = player.select_quality(900).await.unwrap();
    assert!(matches!(fallback, QualitySelection::Applied(ref level) if level.label == "1080p"));

    let state = player.state().await.unwrap();
    assert_eq!(state.quality.unwrap().label, "1080p");
    assert!(state.is_playing);
    assert_eq!(player.phase().await.unwrap(), SessionPhase::Playing);

    player.dispose().await.unwrap();
    let remaining = tokio::time::timeout(EVENT_TIMEOUT, events.collect::<Vec<_>>())
        .await
        .expect("event stream should close on dispose");
    assert!(
        remaining
            .iter()
            .all(|event| !matches!(event, PlayerEvent::Failed(_)))
    );
    assert_eq!(player.phase().await.unwrap(), SessionPhase::Disposed);
    assert_eq!(simulation.backend().stats().engines_released, 1);
}

#[tokio::test]
async fn test_reopen_silences_previous_session() {
    let simulation = PlaybackSimulation::new(SimulationConfig::with_seed(22));
    let player = simulation.player();

    let first = simulation
        .open(OpenRequest::new("https://sim.marquee.test/trailer/master.m3u8"))
        .await
        .unwrap();
    let mut second = simulation
        .open(OpenRequest::new(SIMULATED_SOURCE))
        .await
        .unwrap();
    assert_ne!(first.session_id(), second.session_id());

    let first_events = tokio::time::timeout(EVENT_TIMEOUT, first.collect::<Vec<_>>())
        .await
        .unwrap();
    assert_eq!(
        first_events,
        vec![PlayerEvent::PhaseChanged(SessionPhase::Loading)]
    );

    player.set_playing(true).await.unwrap();
    let state = wait_for_progress(&mut second, EVENT_TIMEOUT).await.unwrap();
    assert_eq!(state.duration, Some(simulation.config().media_duration));
    player.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_tracks_and_audio_selection() {
    let simulation = PlaybackSimulation::new(SimulationConfig::with_seed(23));
    let player = simulation.player();

    let mut events = simulation
        .open(OpenRequest::new(SIMULATED_SOURCE))
        .await
        .unwrap();
    player
        .set_tracks(vec![
            Track::new("https://sim.marquee.test/en.vtt", "English", "en"),
            Track::new("https://sim.marquee.test/es.vtt", "Español", "es"),
        ])
        .await
        .unwrap();
    wait_for_progress(&mut events, EVENT_TIMEOUT).await.unwrap();

    let tracks = player.tracks().await.unwrap();
    assert_eq!(tracks.len(), 2);
    assert!(tracks[0].is_default);
    assert_eq!(
        player.state().await.unwrap().active_subtitle.as_deref(),
        Some("en")
    );

    player.select_subtitle(Some("es")).await.unwrap();
    player.select_audio_track("Español").await.unwrap();
    let state = player.state().await.unwrap();
    assert_eq!(state.active_subtitle.as_deref(), Some("es"));
    assert_eq!(state.active_audio_track.as_deref(), Some("Español"));

    assert_eq!(
        player.select_subtitle(Some("tlh")).await,
        Err(SessionError::UnknownTrack {
            name: "tlh".to_string()
        })
    );
    player.select_subtitle(None).await.unwrap();
    assert_eq!(player.state().await.unwrap().active_subtitle, None);

    player.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_native_playback_without_manifest() {
    let config = SimulationConfig {
        native_playback: true,
        media_duration: 20.0,
        ..SimulationConfig::with_seed(24)
    };
    let simulation = PlaybackSimulation::new(config);
    let player = simulation.player();

    let mut events = simulation
        .open(OpenRequest::new("https://sim.marquee.test/clip.mp4"))
        .await
        .unwrap();
    assert_eq!(player.phase().await.unwrap(), SessionPhase::Ready);
    assert!(player.levels().await.unwrap().is_empty());
    assert_eq!(
        player.select_quality(720).await.unwrap(),
        QualitySelection::Unavailable
    );

    player.set_playing(true).await.unwrap();
    let mut ended = false;
    while let Ok(Some(event)) = tokio::time::timeout(EVENT_TIMEOUT, events.recv()).await {
        if event == PlayerEvent::Ended {
            ended = true;
            break;
        }
    }
    assert!(ended);
    assert_eq!(simulation.loader().load_count(), 0);
    player.shutdown().await.unwrap();
}
