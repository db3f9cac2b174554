//! Actor implementation for the playback controller.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::commands::PlayerCommand;
use super::core::SessionManager;
use super::handle::PlayerHandle;
use crate::config::MarqueeConfig;
use crate::manifest::ManifestLoader;
use crate::media::{MediaBackend, TaggedSignal};
use crate::persistence::ResumeStore;

/// Spawns the player actor and returns its handle.
///
/// The actor owns the session manager and processes caller commands and
/// engine signals one at a time on a single task. Must be called from
/// within a tokio runtime.
///
/// # Examples
/// ```rust,no_run
/// # #[tokio::main]
/// # async fn main() {
/// use std::sync::Arc;
///
/// use marquee_core::config::MarqueeConfig;
/// use marquee_core::manifest::HttpManifestLoader;
/// use marquee_core::persistence::MemoryResumeStore;
/// use marquee_core::player::{OpenRequest, spawn_player};
/// # fn backend() -> Arc<dyn marquee_core::media::MediaBackend> { unimplemented!() }
///
/// let player = spawn_player(
///     MarqueeConfig::default(),
///     backend(),
///     Arc::new(HttpManifestLoader::new()),
///     Arc::new(MemoryResumeStore::new()),
/// );
/// let mut events = player
///     .open(OpenRequest::new("https://cdn.example/movie/master.m3u8"))
///     .await
///     .unwrap();
/// player.select_quality(720).await.unwrap();
/// while let Some(event) = events.recv().await {
///     println!("{event:?}");
/// }
/// # }
/// ```
pub fn spawn_player(
    config: MarqueeConfig,
    backend: Arc<dyn MediaBackend>,
    loader: Arc<dyn ManifestLoader>,
    resume_store: Arc<dyn ResumeStore>,
) -> PlayerHandle {
    let (sender, receiver) = mpsc::channel(config.session.command_capacity.max(1));
    let (signal_sender, signal_receiver) = mpsc::unbounded_channel();
    let manager = SessionManager::new(config, backend, loader, resume_store, signal_sender);

    tokio::spawn(async move {
        run_actor_loop(manager, receiver, signal_receiver).await;
    });

    PlayerHandle::new(sender)
}

/// Runs the main actor message processing loop.
///
/// Engine signals are drained before commands so a command never observes
/// state that lags behind signals already delivered. The loop ends when
/// every handle is dropped or a shutdown command arrives; the active
/// session is disposed either way.
async fn run_actor_loop(
    mut manager: SessionManager,
    mut receiver: mpsc::Receiver<PlayerCommand>,
    mut signal_receiver: mpsc::UnboundedReceiver<TaggedSignal>,
) {
    tracing::debug!("Player actor started");

    loop {
        tokio::select! {
            biased;

            Some(signal) = signal_receiver.recv() => {
                manager.handle_signal(signal);
            }
            command = receiver.recv() => match command {
                Some(command) => {
                    if !handle_command(&mut manager, command).await {
                        break;
                    }
                }
                None => break,
            },
        }
    }

    manager.dispose().await;
    tracing::debug!("Player actor stopped");
}

/// Handles a single command.
/// Returns true to continue processing, false to shutdown.
async fn handle_command(manager: &mut SessionManager, command: PlayerCommand) -> bool {
    match command {
        PlayerCommand::Open { request, responder } => {
            let result = manager.open(request).await;
            let _ = responder.send(result);
        }

        PlayerCommand::Dispose { responder } => {
            manager.dispose().await;
            let _ = responder.send(());
        }

        PlayerCommand::SetPlaying { playing, responder } => {
            let result = manager.set_playing(playing).await;
            let _ = responder.send(result);
        }

        PlayerCommand::TogglePlay { responder } => {
            let result = manager.toggle_play().await;
            let _ = responder.send(result);
        }

        PlayerCommand::Seek { target, responder } => {
            let _ = responder.send(manager.seek(target));
        }

        PlayerCommand::SetVolume { volume, responder } => {
            let _ = responder.send(manager.set_volume(volume));
        }

        PlayerCommand::SetMuted { muted, responder } => {
            let _ = responder.send(manager.set_muted(muted));
        }

        PlayerCommand::ToggleMute { responder } => {
            let _ = responder.send(manager.toggle_mute());
        }

        PlayerCommand::SetFullscreen {
            fullscreen,
            responder,
        } => {
            let _ = responder.send(manager.set_fullscreen(fullscreen));
        }

        PlayerCommand::ToggleFullscreen { responder } => {
            let _ = responder.send(manager.toggle_fullscreen());
        }

        PlayerCommand::SelectQuality {
            vertical_resolution,
            responder,
        } => {
            let _ = responder.send(manager.select_quality(vertical_resolution));
        }

        PlayerCommand::SetTracks { tracks, responder } => {
            let _ = responder.send(manager.set_tracks(tracks));
        }

        PlayerCommand::SelectSubtitle {
            language,
            responder,
        } => {
            let _ = responder.send(manager.select_subtitle(language));
        }

        PlayerCommand::SelectAudioTrack { name, responder } => {
            let _ = responder.send(manager.select_audio_track(name));
        }

        PlayerCommand::GetState { responder } => {
            let _ = responder.send(manager.snapshot());
        }

        PlayerCommand::GetPhase { responder } => {
            let _ = responder.send(manager.phase());
        }

        PlayerCommand::GetTracks { responder } => {
            let _ = responder.send(manager.tracks());
        }

        PlayerCommand::GetLevels { responder } => {
            let _ = responder.send(manager.levels());
        }

        PlayerCommand::Shutdown { responder } => {
            tracing::debug!("Player actor shutting down");
            manager.dispose().await;
            let _ = responder.send(());
            return false;
        }
    }

    true
}
