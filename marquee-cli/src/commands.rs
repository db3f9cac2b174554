//! CLI command implementations

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Subcommand;
use marquee_core::MediaDescriptor;
use marquee_core::catalog::quality_labels;
use marquee_core::controls::format_playback_time;
use marquee_core::manifest::{HttpManifestLoader, ManifestLoader};
use marquee_core::player::{PlaybackState, PlayerEvent};
use marquee_sim::{Scenario, SimulationConfig, parse_key_script, replay_keys, run_scenario};
use url::Url;

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Fetch a master playlist and list its levels and audio renditions
    Inspect {
        /// Manifest URL (http, https or file)
        source: String,
    },
    /// Show what a catalog descriptor would open
    Describe {
        /// Path to a descriptor JSON file
        path: PathBuf,
    },
    /// Run a simulated playback session and print its events
    Simulate {
        /// Seed for fault injection
        #[arg(short, long, default_value = "12345")]
        seed: u64,
        /// Simulated media duration in seconds
        #[arg(short, long, default_value = "120")]
        duration: f64,
        /// steady, flaky-network, decode-glitch, fatal or chaos
        #[arg(long, default_value = "steady")]
        scenario: String,
        /// Wall-clock limit in seconds
        #[arg(long, default_value = "30")]
        timeout: u64,
    },
    /// Apply a key script to a simulated session and print the final state
    Keys {
        /// Keys separated by commas or spaces, e.g. "space,m,arrowright"
        sequence: String,
        #[arg(short, long, default_value = "12345")]
        seed: u64,
    },
}

/// Handle the CLI command
///
/// # Errors
/// Returns the failure of the command that ran
pub async fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Inspect { source } => inspect_manifest(&source).await,
        Commands::Describe { path } => describe(path).await,
        Commands::Simulate {
            seed,
            duration,
            scenario,
            timeout,
        } => simulate(seed, duration, &scenario, Duration::from_secs(timeout)).await,
        Commands::Keys { sequence, seed } => keys(&sequence, seed).await,
    }
}

/// Fetch and print a master playlist
///
/// # Errors
/// - Invalid URL, or the manifest could not be fetched or parsed
pub async fn inspect_manifest(source: &str) -> anyhow::Result<()> {
    let url = Url::parse(source).with_context(|| format!("invalid manifest URL: {source}"))?;
    let manifest = HttpManifestLoader::new()
        .load(&url)
        .await
        .with_context(|| format!("failed to load {url}"))?;

    if manifest.levels.is_empty() {
        println!("No variants: media playlist, plays at a single quality");
    } else {
        println!("Quality levels:");
        for level in &manifest.levels {
            match level.bandwidth {
                Some(bandwidth) => println!(
                    "  [{}] {:<6} {} kbit/s",
                    level.index,
                    level.label,
                    bandwidth / 1000
                ),
                None => println!("  [{}] {}", level.index, level.label),
            }
        }
    }

    if !manifest.audio_renditions.is_empty() {
        println!("Audio renditions:");
        for rendition in &manifest.audio_renditions {
            let marker = if rendition.is_default { " (default)" } else { "" };
            let language = rendition.language.as_deref().unwrap_or("und");
            println!("  {} [{language}]{marker}", rendition.name);
        }
    }

    Ok(())
}

/// Print the open request and tracks a descriptor produces
///
/// # Errors
/// - File could not be read or is not a valid descriptor
pub async fn describe(path: PathBuf) -> anyhow::Result<()> {
    let json = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let descriptor = MediaDescriptor::from_json(&json)
        .with_context(|| format!("invalid descriptor in {}", path.display()))?;

    let request = descriptor.open_request(None);
    println!("Media:    {}", descriptor.media_id);
    println!("Source:   {}", request.source_url);
    if let Some(poster) = &descriptor.poster_url {
        println!("Poster:   {poster}");
    }
    println!("Quality:  {}", quality_labels(&descriptor).join(", "));
    if let Some(preferred) = descriptor.preferred_quality() {
        println!("Opens at: {preferred}p");
    }

    for track in descriptor.tracks() {
        let marker = if track.is_default { " (default)" } else { "" };
        println!("Subtitle: {} [{}]{marker}", track.label, track.language_code);
    }

    Ok(())
}

/// Run one simulated scenario
///
/// # Errors
/// - Unknown scenario name, or the simulated player failed
pub async fn simulate(
    seed: u64,
    duration: f64,
    scenario: &str,
    timeout: Duration,
) -> anyhow::Result<()> {
    let scenario: Scenario = scenario.parse()?;
    let config = SimulationConfig {
        media_duration: duration,
        ..SimulationConfig::with_seed(seed)
    };

    let report = run_scenario(scenario, config, timeout).await?;

    for event in &report.events {
        match event {
            PlayerEvent::Progress(state) => println!("  {}", progress_line(state)),
            PlayerEvent::PhaseChanged(phase) => println!("phase: {phase:?}"),
            PlayerEvent::Ended => println!("ended"),
            PlayerEvent::Failed(notice) => println!(
                "failed: {:?} after {} attempts: {}",
                notice.kind, notice.attempts, notice.reason
            ),
        }
    }

    println!();
    println!("Scenario:  {} (seed {})", report.scenario, report.seed);
    println!("Outcome:   {:?}", report.final_phase);
    println!(
        "Engines:   {} created, {} released, {} loads, {} in-place recoveries",
        report.backend.engines_created,
        report.backend.engines_released,
        report.backend.start_loads,
        report.backend.media_recoveries
    );
    println!("Faults:    {}", report.backend.faults_injected);
    println!("Manifests: {}", report.manifest_loads);

    if report.violations.is_empty() {
        println!("Invariants: ok");
        Ok(())
    } else {
        for violation in &report.violations {
            println!("Invariant violation: {violation}");
        }
        anyhow::bail!("{} invariant violations", report.violations.len())
    }
}

/// Replay keys against a simulated session
///
/// # Errors
/// - The simulated session never became ready or rejected a control
pub async fn keys(sequence: &str, seed: u64) -> anyhow::Result<()> {
    let keys = parse_key_script(sequence);
    let replay = replay_keys(SimulationConfig::with_seed(seed), &keys).await?;

    for (key, action) in &replay.applied {
        println!("{key:>10} -> {action:?}");
    }
    for key in &replay.ignored {
        println!("{key:>10} -> (no binding)");
    }
    println!("{}", progress_line(&replay.state));

    Ok(())
}

fn progress_line(state: &PlaybackState) -> String {
    let duration = state
        .duration
        .map(format_playback_time)
        .unwrap_or_else(|| "--:--".to_string());
    let quality = state
        .quality
        .as_ref()
        .map(|level| level.label.as_str())
        .unwrap_or("auto");
    let playing = if state.is_playing { "playing" } else { "paused" };
    let muted = if state.is_muted { " muted" } else { "" };
    let fullscreen = if state.is_fullscreen { " fullscreen" } else { "" };

    format!(
        "[{} / {duration}] {quality} {playing} vol {:.0}%{muted}{fullscreen}",
        format_playback_time(state.current_time),
        state.volume * 100.0
    )
}
