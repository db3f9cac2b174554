//! Keyboard bindings applied to a live simulated session.

use std::time::Duration;

use marquee_core::controls::{ControlAction, action_for_key, format_playback_time};
use marquee_core::player::OpenRequest;
use marquee_sim::scenarios::wait_for_progress;
use marquee_sim::{PlaybackSimulation, SIMULATED_SOURCE, SimulationConfig, parse_key_script, replay_keys};

#[tokio::test]
async fn test_key_script_toggles_controls() {
    let keys = parse_key_script("space m f f arrowright");
    let replay = replay_keys(SimulationConfig::with_seed(41), &keys)
        .await
        .unwrap();

    assert_eq!(replay.applied[0].1, ControlAction::TogglePlay);
    assert!(replay.ignored.is_empty());
    assert!(replay.state.is_playing);
    assert!(replay.state.is_muted);
    assert!(!replay.state.is_fullscreen);
}

#[tokio::test]
async fn test_seek_keys_clamp_at_start() {
    let simulation = PlaybackSimulation::new(SimulationConfig::with_seed(42));
    let player = simulation.player();
    let mut events = simulation
        .open(OpenRequest::new(SIMULATED_SOURCE))
        .await
        .unwrap();
    wait_for_progress(&mut events, Duration::from_secs(5))
        .await
        .unwrap();

    for key in ["ArrowLeft", "ArrowRight", "ArrowRight", "ArrowRight"] {
        let action = action_for_key(key, 10.0).unwrap();
        action.apply(player).await.unwrap();
    }

    let state = player.state().await.unwrap();
    assert_eq!(state.current_time, 30.0);
    assert_eq!(format_playback_time(state.current_time), "0:30");
    assert_eq!(
        format_playback_time(state.duration.unwrap()),
        format_playback_time(simulation.config().media_duration)
    );

    player.shutdown().await.unwrap();
}
