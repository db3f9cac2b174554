//! A catalog item opened, watched and finished.

use std::sync::Arc;
use std::time::Duration;

use marquee_core::MediaDescriptor;
use marquee_core::config::MarqueeConfig;
use marquee_core::persistence::{MemoryResumeStore, ResumeStore};
use marquee_core::player::{PlayerEvent, SessionPhase};
use marquee_sim::scenarios::collect_until_terminal;
use marquee_sim::{PlaybackSimulation, SIMULATED_SOURCE, SimulationConfig};
use tokio::time::Instant;

fn descriptor() -> MediaDescriptor {
    let json = serde_json::json!({
        "media_id": "night-of-the-comet",
        "source_url": SIMULATED_SOURCE,
        "poster_url": "https://img.marquee.test/comet.jpg",
        "subtitles": [
            {"src": "https://sim.marquee.test/comet/en.vtt", "label": "English", "language": "en"},
            {"src": "https://sim.marquee.test/comet/fr.vtt", "label": "Français", "language": "fr"}
        ],
        "qualities": [
            {"quality": "480p"},
            {"quality": "720p"}
        ]
    });
    MediaDescriptor::from_json(&json.to_string()).unwrap()
}

#[tokio::test]
async fn test_watch_catalog_item_to_end() {
    let descriptor = descriptor();
    let store = Arc::new(MemoryResumeStore::new());
    let simulation = PlaybackSimulation::with_resume_store(
        SimulationConfig {
            media_duration: 30.0,
            ..SimulationConfig::with_seed(61)
        },
        MarqueeConfig::default(),
        store.clone(),
    );
    let player = simulation.player();

    let mut events = simulation
        .open(descriptor.open_request(None))
        .await
        .unwrap();
    player.set_tracks(descriptor.tracks()).await.unwrap();
    player.set_playing(true).await.unwrap();

    let log = collect_until_terminal(&mut events, Instant::now() + Duration::from_secs(10)).await;
    assert_eq!(log.last(), Some(&PlayerEvent::Ended));
    assert!(log.contains(&PlayerEvent::PhaseChanged(SessionPhase::Playing)));

    let state = player.state().await.unwrap();
    assert_eq!(state.quality.unwrap().label, "480p");
    assert_eq!(state.active_subtitle.as_deref(), Some("en"));
    assert_eq!(state.current_time, 30.0);
    assert!(!state.is_playing);
    assert_eq!(player.phase().await.unwrap(), SessionPhase::Ended);

    // Replay from the top
    player.set_playing(true).await.unwrap();
    assert_eq!(player.phase().await.unwrap(), SessionPhase::Playing);
    assert!(player.state().await.unwrap().current_time < 30.0);

    player.dispose().await.unwrap();
    let saved = store
        .resume_position(&descriptor.media_id)
        .await
        .unwrap();
    assert!(saved.is_some());
    player.shutdown().await.unwrap();
}
