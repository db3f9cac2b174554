//! Master playlists read from disk through the HTTP loader.

use std::sync::Arc;
use std::time::Duration;

use marquee_core::config::MarqueeConfig;
use marquee_core::manifest::{HttpManifestLoader, ManifestLoader};
use marquee_core::persistence::MemoryResumeStore;
use marquee_core::player::{InitialState, OpenRequest, SessionPhase, spawn_player};
use marquee_sim::scenarios::wait_for_progress;
use marquee_sim::{SimulatedBackend, SimulationConfig};
use tempfile::TempDir;
use url::Url;

const MASTER_PLAYLIST: &str = r#"#EXTM3U
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="aud",NAME="English",LANGUAGE="en",DEFAULT=YES
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="aud",NAME="Deutsch",LANGUAGE="de"
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=854x480,AUDIO="aud"
480/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=2800000,RESOLUTION=1280x720,AUDIO="aud"
720/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=5000000,RESOLUTION=1920x1080,AUDIO="aud"
1080/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=14000000,RESOLUTION=3840x2160,AUDIO="aud"
2160/index.m3u8
"#;

async fn write_playlist(dir: &TempDir, contents: &str) -> Url {
    let path = dir.path().join("master.m3u8");
    tokio::fs::write(&path, contents).await.unwrap();
    Url::from_file_path(&path).unwrap()
}

#[tokio::test]
async fn test_loads_master_playlist_from_file() {
    let dir = TempDir::new().unwrap();
    let url = write_playlist(&dir, MASTER_PLAYLIST).await;

    let manifest = HttpManifestLoader::new().load(&url).await.unwrap();
    let labels: Vec<_> = manifest.levels.iter().map(|l| l.label.as_str()).collect();
    assert_eq!(labels, vec!["480p", "720p", "1080p", "4K"]);
    assert_eq!(manifest.levels[1].bandwidth, Some(2_800_000));
    assert_eq!(manifest.default_audio().unwrap().name, "English");
}

#[tokio::test]
async fn test_media_playlist_has_no_levels() {
    let dir = TempDir::new().unwrap();
    let url = write_playlist(
        &dir,
        "#EXTM3U\n#EXT-X-TARGETDURATION:6\n#EXTINF:6.0,\nseg0.ts\n#EXT-X-ENDLIST\n",
    )
    .await;

    let manifest = HttpManifestLoader::new().load(&url).await.unwrap();
    assert!(manifest.levels.is_empty());
    assert!(manifest.audio_renditions.is_empty());
}

#[tokio::test]
async fn test_player_resolves_levels_from_disk() {
    let dir = TempDir::new().unwrap();
    let url = write_playlist(&dir, MASTER_PLAYLIST).await;

    let player = spawn_player(
        MarqueeConfig::default(),
        Arc::new(SimulatedBackend::new(SimulationConfig::with_seed(51))),
        Arc::new(HttpManifestLoader::new()),
        Arc::new(MemoryResumeStore::new()),
    );

    let mut events = player
        .open(OpenRequest::new(url.as_str()).with_initial_state(InitialState {
            quality: Some(900),
            ..InitialState::default()
        }))
        .await
        .unwrap();
    wait_for_progress(&mut events, Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(player.phase().await.unwrap(), SessionPhase::Ready);
    assert_eq!(player.levels().await.unwrap().len(), 4);

    let state = player.state().await.unwrap();
    assert_eq!(state.quality.unwrap().label, "1080p");
    assert_eq!(state.active_audio_track.as_deref(), Some("English"));

    player.select_audio_track("Deutsch").await.unwrap();
    assert_eq!(
        player.state().await.unwrap().active_audio_track.as_deref(),
        Some("Deutsch")
    );

    player.shutdown().await.unwrap();
}
