//! Simulated manifest loader.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use marquee_core::manifest::{AudioRendition, Manifest, ManifestError, ManifestLoader};
use parking_lot::Mutex;
use url::Url;

use crate::config::SimulationConfig;
use crate::rng::DeterministicRng;

/// Random stream reserved for manifest fetch outcomes.
const MANIFEST_STREAM: u64 = u64::MAX;

/// Serves the configured manifest after a fixed latency, failing with
/// the configured probability.
#[derive(Clone)]
pub struct SimulatedManifestLoader {
    config: Arc<SimulationConfig>,
    rng: Arc<Mutex<DeterministicRng>>,
    loads: Arc<AtomicUsize>,
}

impl SimulatedManifestLoader {
    pub fn new(config: SimulationConfig) -> Self {
        let rng = DeterministicRng::from_seed(config.seed).fork(MANIFEST_STREAM);
        Self {
            config: Arc::new(config),
            rng: Arc::new(Mutex::new(rng)),
            loads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of fetches started so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// The manifest every successful fetch returns.
    pub fn manifest(&self) -> Manifest {
        let mut manifest = Manifest::with_resolutions(&self.config.resolutions);
        manifest.audio_renditions = self
            .config
            .audio_renditions
            .iter()
            .enumerate()
            .map(|(index, name)| AudioRendition {
                index,
                name: name.clone(),
                language: None,
                is_default: index == 0,
            })
            .collect();
        manifest
    }
}

#[async_trait]
impl ManifestLoader for SimulatedManifestLoader {
    async fn load(&self, source: &Url) -> Result<Manifest, ManifestError> {
        let attempt = self.loads.fetch_add(1, Ordering::SeqCst) + 1;
        let fails = self
            .rng
            .lock()
            .random_bool(self.config.manifest_failure_rate);

        tokio::time::sleep(self.config.manifest_latency).await;

        if fails {
            tracing::debug!(%source, attempt, "Simulated manifest fetch failed");
            return Err(ManifestError::Network {
                reason: format!("simulated fetch failure on attempt {attempt}"),
            });
        }
        Ok(self.manifest())
    }
}
