//! Resume positions persisted across players through the JSON store.

use std::sync::Arc;
use std::time::Duration;

use marquee_core::config::MarqueeConfig;
use marquee_core::persistence::{JsonFileResumeStore, MediaId, ResumeStore};
use marquee_core::player::{InitialState, OpenRequest, PlayerEvent};
use marquee_sim::{PlaybackSimulation, SIMULATED_SOURCE, SimulationConfig};
use tempfile::TempDir;

fn simulation_with_store(path: &std::path::Path, seed: u64) -> PlaybackSimulation {
    PlaybackSimulation::with_resume_store(
        SimulationConfig::with_seed(seed),
        MarqueeConfig::for_testing(),
        Arc::new(JsonFileResumeStore::new(path)),
    )
}

fn request(media_id: &MediaId) -> OpenRequest {
    OpenRequest::new(SIMULATED_SOURCE).with_media_id(media_id.clone())
}

#[tokio::test]
async fn test_paused_position_resumes_in_new_player() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("resume.json");
    let media_id = MediaId::new("feature-42");

    let first = simulation_with_store(&path, 31);
    let mut events = first.open(request(&media_id)).await.unwrap();
    first.player().set_playing(true).await.unwrap();

    // Play a few seconds in
    while let Ok(Some(event)) =
        tokio::time::timeout(Duration::from_secs(5), events.recv()).await
    {
        if let PlayerEvent::Progress(state) = event
            && state.current_time >= 5.0
        {
            break;
        }
    }
    first.player().set_playing(false).await.unwrap();
    first.player().shutdown().await.unwrap();

    let saved = JsonFileResumeStore::new(&path)
        .resume_position(&media_id)
        .await
        .unwrap()
        .expect("pause should persist the position");
    assert!(saved >= 5.0);

    let second = simulation_with_store(&path, 32);
    second.open(request(&media_id)).await.unwrap();
    assert_eq!(second.player().state().await.unwrap().current_time, saved);
    second.player().shutdown().await.unwrap();
}

#[tokio::test]
async fn test_explicit_start_beats_saved_position() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("resume.json");
    let media_id = MediaId::new("feature-7");

    JsonFileResumeStore::new(&path)
        .save_resume_position(&media_id, 64.0)
        .await
        .unwrap();

    let simulation = simulation_with_store(&path, 33);
    simulation
        .open(request(&media_id).with_initial_state(InitialState {
            current_time: Some(12.0),
            ..InitialState::default()
        }))
        .await
        .unwrap();
    assert_eq!(simulation.player().state().await.unwrap().current_time, 12.0);

    simulation.player().shutdown().await.unwrap();
}

#[tokio::test]
async fn test_corrupt_store_does_not_block_playback() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("resume.json");
    tokio::fs::write(&path, "{ not json").await.unwrap();

    let simulation = simulation_with_store(&path, 34);
    simulation
        .open(request(&MediaId::new("feature-9")))
        .await
        .unwrap();
    assert_eq!(simulation.player().state().await.unwrap().current_time, 0.0);

    simulation.player().shutdown().await.unwrap();
}
