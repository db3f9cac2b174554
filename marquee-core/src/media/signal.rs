//! Signals delivered from media and streaming engines to the controller.

use std::fmt;

use tokio::sync::mpsc;

use crate::manifest::{Manifest, ManifestError};

/// Identifier of one playback session opened on a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Creates a session identifier from its raw counter value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw counter value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Identifies which engine generation a signal was issued for.
///
/// The epoch increments every time a session tears its engines down and
/// recreates them, so signals from discarded engines never match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalTag {
    pub session: SessionId,
    pub epoch: u32,
}

/// Raw error category reported by an engine, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawErrorKind {
    /// Segment, playlist or key fetch failed
    Network,
    /// Media element could not decode or append data
    Media,
    /// Content protection failure
    KeySystem,
    /// Transmuxing failure
    Mux,
    /// Anything else the engine reports
    Other(String),
}

/// Component that raised an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultSource {
    MediaEngine,
    StreamingEngine,
    ManifestLoader,
}

/// A raw playback/network fault.
///
/// Transient: consumed synchronously by the controller's classifier and
/// discarded afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorEvent {
    pub raw_kind: RawErrorKind,
    /// Whether the engine gave up on handling it internally
    pub is_fatal: bool,
    pub source: FaultSource,
    pub details: String,
}

impl ErrorEvent {
    /// Creates a fatal error event.
    pub fn fatal(raw_kind: RawErrorKind, source: FaultSource, details: impl Into<String>) -> Self {
        Self {
            raw_kind,
            is_fatal: true,
            source,
            details: details.into(),
        }
    }

    /// Creates a non-fatal error event the engine recovers from on its own.
    pub fn transient(
        raw_kind: RawErrorKind,
        source: FaultSource,
        details: impl Into<String>,
    ) -> Self {
        Self {
            raw_kind,
            is_fatal: false,
            source,
            details: details.into(),
        }
    }
}

/// Discrete signal emitted by an engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineSignal {
    /// Periodic playhead update
    TimeUpdate {
        current_time: f64,
        duration: Option<f64>,
    },
    /// Media duration became known or changed
    DurationChanged { duration: f64 },
    /// The streaming engine finished switching to a level
    LevelSwitched { index: usize },
    /// Explicit end of the stream
    EndOfStream,
    /// Playback or network fault
    Error(ErrorEvent),
}

/// Everything the controller actor receives outside of caller commands.
#[derive(Debug)]
pub(crate) enum SessionSignal {
    Engine(EngineSignal),
    ManifestLoaded(Result<Manifest, ManifestError>),
}

/// Signal stamped with the session generation it belongs to.
#[derive(Debug)]
pub(crate) struct TaggedSignal {
    pub tag: SignalTag,
    pub signal: SessionSignal,
}

/// Sending half handed to engines at creation.
///
/// Emitting never blocks. Signals sent after the owning session was
/// disposed or reinitialized are discarded by the controller.
#[derive(Debug, Clone)]
pub struct SignalSink {
    tag: SignalTag,
    sender: mpsc::UnboundedSender<TaggedSignal>,
}

impl SignalSink {
    pub(crate) fn new(tag: SignalTag, sender: mpsc::UnboundedSender<TaggedSignal>) -> Self {
        Self { tag, sender }
    }

    /// Creates a sink with no controller behind it. Every emit returns false.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn detached(tag: SignalTag) -> Self {
        let (sender, _) = mpsc::unbounded_channel();
        Self { tag, sender }
    }

    /// Returns the generation this sink stamps on its signals.
    pub fn tag(&self) -> SignalTag {
        self.tag
    }

    /// Emits a signal. Returns false once the controller has shut down.
    pub fn emit(&self, signal: EngineSignal) -> bool {
        self.sender
            .send(TaggedSignal {
                tag: self.tag,
                signal: SessionSignal::Engine(signal),
            })
            .is_ok()
    }

    /// Emits a playhead update.
    pub fn time_update(&self, current_time: f64, duration: Option<f64>) -> bool {
        self.emit(EngineSignal::TimeUpdate {
            current_time,
            duration,
        })
    }

    /// Emits an error event.
    pub fn error(&self, event: ErrorEvent) -> bool {
        self.emit(EngineSignal::Error(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_display() {
        assert_eq!(SessionId::new(7).to_string(), "session-7");
        assert_eq!(SessionId::new(7).as_u64(), 7);
    }

    #[tokio::test]
    async fn test_sink_stamps_tag() {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let tag = SignalTag {
            session: SessionId::new(3),
            epoch: 2,
        };
        let sink = SignalSink::new(tag, sender);

        assert!(sink.time_update(1.5, Some(10.0)));

        let tagged = receiver.recv().await.unwrap();
        assert_eq!(tagged.tag, tag);
        assert!(matches!(
            tagged.signal,
            SessionSignal::Engine(EngineSignal::TimeUpdate { current_time, .. }) if current_time == 1.5
        ));
    }

    #[test]
    fn test_sink_reports_closed_controller() {
        let (sender, receiver) = mpsc::unbounded_channel();
        let sink = SignalSink::new(
            SignalTag {
                session: SessionId::new(1),
                epoch: 0,
            },
            sender,
        );
        drop(receiver);
        assert!(!sink.emit(EngineSignal::EndOfStream));
    }
}
