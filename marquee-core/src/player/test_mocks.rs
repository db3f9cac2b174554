//! Mock implementations for testing the playback controller.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use url::Url;

use super::tracks::Track;
use crate::manifest::{AudioRendition, Manifest, ManifestError, ManifestLoader};
use crate::media::{
    EngineSignal, ErrorEvent, FaultSource, MediaBackend, MediaEngine, MediaError, RawErrorKind,
    SessionEngines, SignalSink, StreamingEngine,
};

/// Calls recorded by the mock engines.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Play,
    Pause,
    Seek(f64),
    SetVolume(f64),
    SetMuted(bool),
    SetFullscreen(bool),
    /// Language code of the attached track
    AttachTrack(String),
    DetachTrack(String),
    ShowTextTrack(Option<usize>),
    RecoverMedia,
    Release,
    /// Number of levels in the attached manifest
    AttachManifest(usize),
    StartLoad(f64),
    SetLevel(Option<usize>),
    SetAudioTrack(usize),
    RecoverStreaming,
    Destroy,
}

type CallLog = Arc<Mutex<Vec<EngineCall>>>;

/// Media engine that only records calls, for unit tests.
#[derive(Debug, Default)]
pub struct RecordingMediaEngine {
    pub calls: Vec<EngineCall>,
}

impl MediaEngine for RecordingMediaEngine {
    fn play(&mut self) {
        self.calls.push(EngineCall::Play);
    }

    fn pause(&mut self) {
        self.calls.push(EngineCall::Pause);
    }

    fn seek(&mut self, position: f64) {
        self.calls.push(EngineCall::Seek(position));
    }

    fn set_volume(&mut self, volume: f64) {
        self.calls.push(EngineCall::SetVolume(volume));
    }

    fn set_muted(&mut self, muted: bool) {
        self.calls.push(EngineCall::SetMuted(muted));
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        self.calls.push(EngineCall::SetFullscreen(fullscreen));
    }

    fn attach_track(&mut self, track: &Track) {
        self.calls
            .push(EngineCall::AttachTrack(track.language_code.clone()));
    }

    fn detach_track(&mut self, track: &Track) {
        self.calls
            .push(EngineCall::DetachTrack(track.language_code.clone()));
    }

    fn show_text_track(&mut self, index: Option<usize>) {
        self.calls.push(EngineCall::ShowTextTrack(index));
    }

    fn recover_media_error(&mut self) {
        self.calls.push(EngineCall::RecoverMedia);
    }

    fn release(&mut self) {
        self.calls.push(EngineCall::Release);
    }
}

/// Media engine half handed out by `MockMediaBackend`.
struct MockMediaEngine {
    inner: RecordingMediaEngine,
    log: CallLog,
}

impl MockMediaEngine {
    fn record(&mut self, apply: impl FnOnce(&mut RecordingMediaEngine)) {
        apply(&mut self.inner);
        self.log.lock().extend(self.inner.calls.drain(..));
    }
}

impl MediaEngine for MockMediaEngine {
    fn play(&mut self) {
        self.record(|engine| engine.play());
    }

    fn pause(&mut self) {
        self.record(|engine| engine.pause());
    }

    fn seek(&mut self, position: f64) {
        self.record(|engine| engine.seek(position));
    }

    fn set_volume(&mut self, volume: f64) {
        self.record(|engine| engine.set_volume(volume));
    }

    fn set_muted(&mut self, muted: bool) {
        self.record(|engine| engine.set_muted(muted));
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        self.record(|engine| engine.set_fullscreen(fullscreen));
    }

    fn attach_track(&mut self, track: &Track) {
        self.record(|engine| engine.attach_track(track));
    }

    fn detach_track(&mut self, track: &Track) {
        self.record(|engine| engine.detach_track(track));
    }

    fn show_text_track(&mut self, index: Option<usize>) {
        self.record(|engine| engine.show_text_track(index));
    }

    fn recover_media_error(&mut self) {
        self.record(|engine| engine.recover_media_error());
    }

    fn release(&mut self) {
        self.record(|engine| engine.release());
    }
}

/// Streaming engine half handed out by `MockMediaBackend`.
struct MockStreamingEngine {
    log: CallLog,
}

impl StreamingEngine for MockStreamingEngine {
    fn attach_manifest(&mut self, manifest: &Manifest) {
        self.log
            .lock()
            .push(EngineCall::AttachManifest(manifest.levels.len()));
    }

    fn start_load(&mut self, position: f64) {
        self.log.lock().push(EngineCall::StartLoad(position));
    }

    fn set_level(&mut self, index: Option<usize>) {
        self.log.lock().push(EngineCall::SetLevel(index));
    }

    fn set_audio_track(&mut self, index: usize) {
        self.log.lock().push(EngineCall::SetAudioTrack(index));
    }

    fn recover_media_error(&mut self) {
        self.log.lock().push(EngineCall::RecoverStreaming);
    }

    fn destroy(&mut self) {
        self.log.lock().push(EngineCall::Destroy);
    }
}

/// Test-side view of one engine pair created by `MockMediaBackend`.
///
/// Drives the controller by emitting signals through the engines' sink and
/// exposes every call the controller made on them.
#[derive(Clone)]
pub struct MockEngineProbe {
    pub source: Url,
    pub start_position: f64,
    sink: SignalSink,
    log: CallLog,
}

impl MockEngineProbe {
    pub fn emit(&self, signal: EngineSignal) -> bool {
        self.sink.emit(signal)
    }

    pub fn time_update(&self, current_time: f64, duration: f64) -> bool {
        self.sink.time_update(current_time, Some(duration))
    }

    /// Emits a fatal error of the given raw kind.
    pub fn fatal_error(&self, kind: RawErrorKind) -> bool {
        self.sink.error(ErrorEvent::fatal(
            kind,
            FaultSource::StreamingEngine,
            "mock fault",
        ))
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.log.lock().clone()
    }

    pub fn count(&self, matches: impl Fn(&EngineCall) -> bool) -> usize {
        self.log.lock().iter().filter(|call| matches(call)).count()
    }

    pub fn release_count(&self) -> usize {
        self.count(|call| *call == EngineCall::Release)
    }

    pub fn is_released(&self) -> bool {
        self.release_count() > 0
    }
}

/// Media backend creating recording engines.
#[derive(Clone)]
pub struct MockMediaBackend {
    adaptive: bool,
    should_fail: bool,
    probes: Arc<Mutex<Vec<MockEngineProbe>>>,
}

impl MockMediaBackend {
    /// Creates a backend with adaptive streaming support.
    pub fn new() -> Self {
        Self {
            adaptive: true,
            should_fail: false,
            probes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Creates a backend that plays sources natively.
    pub fn native() -> Self {
        Self {
            adaptive: false,
            ..Self::new()
        }
    }

    /// Creates a backend whose engine creation always fails.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::new()
        }
    }

    /// Probes for every engine pair created so far, oldest first.
    pub fn probes(&self) -> Vec<MockEngineProbe> {
        self.probes.lock().clone()
    }

    pub fn latest_probe(&self) -> Option<MockEngineProbe> {
        self.probes.lock().last().cloned()
    }

    pub fn creation_count(&self) -> usize {
        self.probes.lock().len()
    }
}

impl Default for MockMediaBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaBackend for MockMediaBackend {
    fn create_engines(
        &self,
        source: &Url,
        start_position: f64,
        signals: SignalSink,
    ) -> Result<SessionEngines, MediaError> {
        if self.should_fail {
            return Err(MediaError::EngineUnavailable {
                reason: "Mock engine failure".to_string(),
            });
        }

        let log = CallLog::default();
        self.probes.lock().push(MockEngineProbe {
            source: source.clone(),
            start_position,
            sink: signals,
            log: Arc::clone(&log),
        });

        let streaming: Option<Box<dyn StreamingEngine>> = if self.adaptive {
            Some(Box::new(MockStreamingEngine {
                log: Arc::clone(&log),
            }))
        } else {
            None
        };

        Ok(SessionEngines {
            media: Box::new(MockMediaEngine {
                inner: RecordingMediaEngine::default(),
                log,
            }),
            streaming,
        })
    }
}

/// Manifest loader with scripted outcomes.
///
/// Returns queued outcomes first, then the default manifest. Loads for a
/// held URL wait until the URL is released.
#[derive(Clone)]
pub struct MockManifestLoader {
    manifest: Manifest,
    outcomes: Arc<Mutex<VecDeque<Result<Manifest, ManifestError>>>>,
    gates: Arc<Mutex<HashMap<String, Arc<Semaphore>>>>,
    loads: Arc<AtomicUsize>,
}

impl MockManifestLoader {
    /// Creates a loader serving 480p/720p/1080p with two audio renditions.
    pub fn new() -> Self {
        let mut manifest = Manifest::with_resolutions(&[480, 720, 1080]);
        manifest.audio_renditions = vec![
            AudioRendition {
                index: 0,
                name: "English".to_string(),
                language: Some("en".to_string()),
                is_default: true,
            },
            AudioRendition {
                index: 1,
                name: "Français".to_string(),
                language: Some("fr".to_string()),
                is_default: false,
            },
        ];
        Self::with_manifest(manifest)
    }

    pub fn with_manifest(manifest: Manifest) -> Self {
        Self {
            manifest,
            outcomes: Arc::new(Mutex::new(VecDeque::new())),
            gates: Arc::new(Mutex::new(HashMap::new())),
            loads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queues a failure for the next load.
    pub fn push_failure(&self, error: ManifestError) {
        self.outcomes.lock().push_back(Err(error));
    }

    /// Makes loads of `url` wait until `release` is called for it.
    pub fn hold(&self, url: &str) {
        self.gates
            .lock()
            .insert(url.to_string(), Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self, url: &str) {
        if let Some(gate) = self.gates.lock().remove(url) {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl Default for MockManifestLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ManifestLoader for MockManifestLoader {
    async fn load(&self, source: &Url) -> Result<Manifest, ManifestError> {
        self.loads.fetch_add(1, Ordering::SeqCst);

        let gate = self.gates.lock().get(source.as_str()).cloned();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await.map_err(|e| ManifestError::Network {
                reason: e.to_string(),
            })?;
        }

        match self.outcomes.lock().pop_front() {
            Some(outcome) => outcome,
            None => Ok(self.manifest.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::media::{SessionId, SignalTag};

    #[test]
    fn test_backend_records_probe_and_calls() {
        let backend = MockMediaBackend::new();
        let (sender, _receiver) = mpsc::unbounded_channel();
        let sink = SignalSink::new(
            SignalTag {
                session: SessionId::new(1),
                epoch: 0,
            },
            sender,
        );
        let url = Url::parse("https://cdn.test/a.m3u8").unwrap();

        let mut engines = backend.create_engines(&url, 12.0, sink).unwrap();
        engines.media.play();
        engines.streaming.as_mut().unwrap().start_load(12.0);

        let probe = backend.latest_probe().unwrap();
        assert_eq!(probe.start_position, 12.0);
        assert_eq!(
            probe.calls(),
            vec![EngineCall::Play, EngineCall::StartLoad(12.0)]
        );
    }

    #[test]
    fn test_native_and_failing_backends() {
        let (sender, _receiver) = mpsc::unbounded_channel();
        let sink = SignalSink::new(
            SignalTag {
                session: SessionId::new(1),
                epoch: 0,
            },
            sender,
        );
        let url = Url::parse("https://cdn.test/a.mp4").unwrap();

        let engines = MockMediaBackend::native()
            .create_engines(&url, 0.0, sink.clone())
            .unwrap();
        assert!(engines.streaming.is_none());

        assert!(MockMediaBackend::failing()
            .create_engines(&url, 0.0, sink)
            .is_err());
    }

    #[tokio::test]
    async fn test_loader_serves_queued_outcomes_first() {
        let loader = MockManifestLoader::new();
        let url = Url::parse("https://cdn.test/a.m3u8").unwrap();
        loader.push_failure(ManifestError::Network {
            reason: "reset".to_string(),
        });

        assert!(loader.load(&url).await.is_err());
        assert_eq!(loader.load(&url).await.unwrap().levels.len(), 3);
        assert_eq!(loader.load_count(), 2);
    }
}
