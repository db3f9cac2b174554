//! Error classification and bounded recovery.
//!
//! Faults are classified into three kinds. Network faults reload the source
//! from the last known position. Decode faults get one in-place recovery;
//! a second decode fault before playback resumes reinitializes the session.
//! Everything else is fatal. Each recoverable kind has its own counter,
//! scoped to the session, and exceeding a bound turns the fault fatal.

use serde::Serialize;

use crate::config::RecoveryConfig;
use crate::manifest::ManifestError;
use crate::media::{ErrorEvent, RawErrorKind};

/// Classified fault kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FaultKind {
    NetworkFault,
    DecodeFault,
    UnhandledFault,
}

impl FaultKind {
    /// Classifies an engine error event.
    ///
    /// Non-fatal events are handled inside the engine and yield None.
    pub fn from_error_event(event: &ErrorEvent) -> Option<Self> {
        if !event.is_fatal {
            return None;
        }

        Some(match event.raw_kind {
            RawErrorKind::Network => Self::NetworkFault,
            RawErrorKind::Media => Self::DecodeFault,
            RawErrorKind::KeySystem | RawErrorKind::Mux | RawErrorKind::Other(_) => {
                Self::UnhandledFault
            }
        })
    }

    /// Classifies a manifest acquisition failure.
    pub fn from_manifest_error(error: &ManifestError) -> Self {
        match error {
            ManifestError::Network { .. } => Self::NetworkFault,
            ManifestError::Invalid { .. } => Self::UnhandledFault,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::UnhandledFault)
    }
}

/// Terminal failure surfaced to the caller exactly once per session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureNotice {
    pub kind: FaultKind,
    /// Recovery attempts made for this kind before giving up
    pub attempts: u32,
    pub reason: String,
}

/// What the session manager should do about a fault.
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryAction {
    /// Reload the manifest/source from the last known position
    Reload,
    /// Ask the engines to recover from a decode error in place
    RecoverMedia,
    /// Tear down and recreate the engines at the last known position
    Reinitialize,
    /// Give up; the session fails
    Fail(FailureNotice),
}

/// Per-session recovery counters and policy.
#[derive(Debug, Clone)]
pub struct RecoveryPolicy {
    limits: RecoveryConfig,
    network_attempts: u32,
    media_recoveries: u32,
    reinitializations: u32,
    /// A decode fault was handled and playback has not resumed since
    decode_pending: bool,
}

impl RecoveryPolicy {
    pub fn new(limits: RecoveryConfig) -> Self {
        Self {
            limits,
            network_attempts: 0,
            media_recoveries: 0,
            reinitializations: 0,
            decode_pending: false,
        }
    }

    /// Decides the action for a classified fault and updates the counters.
    pub fn on_fault(&mut self, kind: FaultKind, reason: impl Into<String>) -> RecoveryAction {
        let reason = reason.into();

        match kind {
            FaultKind::NetworkFault => {
                self.network_attempts += 1;
                if self.network_attempts > self.limits.max_network_retries {
                    return self.fail(kind, self.network_attempts - 1, reason);
                }
                RecoveryAction::Reload
            }
            FaultKind::DecodeFault if self.decode_pending => {
                if self.reinitializations >= self.limits.max_reinitializations {
                    return self.fail(kind, self.media_recoveries + self.reinitializations, reason);
                }
                self.reinitializations += 1;
                RecoveryAction::Reinitialize
            }
            FaultKind::DecodeFault => {
                self.media_recoveries += 1;
                if self.media_recoveries > self.limits.max_media_recoveries {
                    return self.fail(kind, self.media_recoveries - 1 + self.reinitializations, reason);
                }
                self.decode_pending = true;
                RecoveryAction::RecoverMedia
            }
            FaultKind::UnhandledFault => self.fail(kind, 0, reason),
        }
    }

    /// Records that playback reached `Playing`, closing the decode window.
    pub fn on_playing(&mut self) {
        self.decode_pending = false;
    }

    pub fn network_attempts(&self) -> u32 {
        self.network_attempts
    }

    pub fn reinitializations(&self) -> u32 {
        self.reinitializations
    }

    fn fail(&self, kind: FaultKind, attempts: u32, reason: String) -> RecoveryAction {
        RecoveryAction::Fail(FailureNotice {
            kind,
            attempts,
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::FaultSource;

    fn policy() -> RecoveryPolicy {
        RecoveryPolicy::new(RecoveryConfig::default())
    }

    #[test]
    fn test_classification() {
        let fatal = |kind| ErrorEvent::fatal(kind, FaultSource::StreamingEngine, "boom");

        assert_eq!(
            FaultKind::from_error_event(&fatal(RawErrorKind::Network)),
            Some(FaultKind::NetworkFault)
        );
        assert_eq!(
            FaultKind::from_error_event(&fatal(RawErrorKind::Media)),
            Some(FaultKind::DecodeFault)
        );
        assert_eq!(
            FaultKind::from_error_event(&fatal(RawErrorKind::KeySystem)),
            Some(FaultKind::UnhandledFault)
        );
        assert_eq!(
            FaultKind::from_error_event(&ErrorEvent::transient(
                RawErrorKind::Network,
                FaultSource::StreamingEngine,
                "stall"
            )),
            None
        );
        assert_eq!(
            FaultKind::from_manifest_error(&ManifestError::Invalid {
                reason: "html".to_string()
            }),
            FaultKind::UnhandledFault
        );
    }

    #[test]
    fn test_fourth_network_fault_is_fatal() {
        let mut policy = policy();

        for _ in 0..3 {
            assert_eq!(policy.on_fault(FaultKind::NetworkFault, "timeout"), RecoveryAction::Reload);
        }

        match policy.on_fault(FaultKind::NetworkFault, "timeout") {
            RecoveryAction::Fail(notice) => {
                assert_eq!(notice.kind, FaultKind::NetworkFault);
                assert_eq!(notice.attempts, 3);
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_second_decode_fault_reinitializes_once() {
        let mut policy = policy();

        assert_eq!(policy.on_fault(FaultKind::DecodeFault, "append"), RecoveryAction::RecoverMedia);
        assert_eq!(policy.on_fault(FaultKind::DecodeFault, "append"), RecoveryAction::Reinitialize);
        assert!(matches!(
            policy.on_fault(FaultKind::DecodeFault, "append"),
            RecoveryAction::Fail(_)
        ));
        assert_eq!(policy.reinitializations(), 1);
    }

    #[test]
    fn test_playing_closes_decode_window() {
        let mut policy = policy();

        assert_eq!(policy.on_fault(FaultKind::DecodeFault, "a"), RecoveryAction::RecoverMedia);
        policy.on_playing();
        assert_eq!(policy.on_fault(FaultKind::DecodeFault, "b"), RecoveryAction::RecoverMedia);
    }

    #[test]
    fn test_media_recovery_bound() {
        let mut policy = RecoveryPolicy::new(RecoveryConfig {
            max_media_recoveries: 1,
            ..RecoveryConfig::default()
        });

        assert_eq!(policy.on_fault(FaultKind::DecodeFault, "a"), RecoveryAction::RecoverMedia);
        policy.on_playing();
        assert!(matches!(
            policy.on_fault(FaultKind::DecodeFault, "b"),
            RecoveryAction::Fail(FailureNotice { attempts: 1, .. })
        ));
    }

    #[test]
    fn test_unhandled_is_immediately_fatal() {
        let mut policy = policy();
        assert!(matches!(
            policy.on_fault(FaultKind::UnhandledFault, "drm"),
            RecoveryAction::Fail(FailureNotice { kind: FaultKind::UnhandledFault, .. })
        ));
    }
}
