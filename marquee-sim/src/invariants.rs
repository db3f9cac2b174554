//! Invariants checked over the events a simulated session published.

use std::fmt;

use marquee_core::player::{PlayerEvent, SessionPhase};

/// Violation of a playback invariant.
#[derive(Debug, Clone, PartialEq)]
pub struct InvariantViolation {
    /// Name of the violated invariant
    pub invariant: String,
    /// Position of the offending event in the log
    pub event_index: usize,
    pub description: String,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invariant '{}' violated at event {}: {}",
            self.invariant, self.event_index, self.description
        )
    }
}

/// Check over a complete event log.
pub trait Invariant: Send + Sync {
    /// # Errors
    ///
    /// - `InvariantViolation` - First event breaking the invariant
    fn check(&self, events: &[PlayerEvent]) -> Result<(), InvariantViolation>;

    fn name(&self) -> &str;

    fn violation(&self, event_index: usize, description: String) -> InvariantViolation {
        InvariantViolation {
            invariant: self.name().to_string(),
            event_index,
            description,
        }
    }
}

/// Playhead stays within `[0, duration]` and volume within `[0, 1]`.
pub struct StateBoundsInvariant;

impl Invariant for StateBoundsInvariant {
    fn check(&self, events: &[PlayerEvent]) -> Result<(), InvariantViolation> {
        for (index, event) in events.iter().enumerate() {
            let PlayerEvent::Progress(state) = event else {
                continue;
            };
            if state.current_time < 0.0 {
                return Err(self.violation(index, format!("negative time {}", state.current_time)));
            }
            if let Some(duration) = state.duration
                && state.current_time > duration
            {
                return Err(self.violation(
                    index,
                    format!("time {} beyond duration {duration}", state.current_time),
                ));
            }
            if !(0.0..=1.0).contains(&state.volume) {
                return Err(self.violation(index, format!("volume {} out of range", state.volume)));
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "StateBounds"
    }
}

/// A failed session publishes nothing after `Failed`, and `Ended` is
/// announced at most once.
pub struct TerminalEventsInvariant;

impl Invariant for TerminalEventsInvariant {
    fn check(&self, events: &[PlayerEvent]) -> Result<(), InvariantViolation> {
        let mut ended = false;
        for (index, event) in events.iter().enumerate() {
            match event {
                PlayerEvent::Failed(_) if index + 1 < events.len() => {
                    return Err(self.violation(
                        index + 1,
                        "event published after Failed".to_string(),
                    ));
                }
                PlayerEvent::Ended if ended => {
                    return Err(self.violation(index, "Ended announced twice".to_string()));
                }
                PlayerEvent::Ended => ended = true,
                PlayerEvent::PhaseChanged(SessionPhase::Failed | SessionPhase::Disposed) => {
                    return Err(self.violation(
                        index,
                        "terminal phase published as a phase change".to_string(),
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "TerminalEvents"
    }
}

/// Every reported quality is one the manifest advertised.
pub struct AdvertisedQualityInvariant {
    resolutions: Vec<u32>,
}

impl AdvertisedQualityInvariant {
    pub fn new(resolutions: Vec<u32>) -> Self {
        Self { resolutions }
    }
}

impl Invariant for AdvertisedQualityInvariant {
    fn check(&self, events: &[PlayerEvent]) -> Result<(), InvariantViolation> {
        for (index, event) in events.iter().enumerate() {
            if let PlayerEvent::Progress(state) = event
                && let Some(level) = &state.quality
                && !self.resolutions.contains(&level.vertical_resolution)
            {
                return Err(self.violation(
                    index,
                    format!("quality {} not advertised", level.label),
                ));
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "AdvertisedQuality"
    }
}

/// Runs every invariant and collects the violations.
pub fn check_all(
    invariants: &[Box<dyn Invariant>],
    events: &[PlayerEvent],
) -> Vec<InvariantViolation> {
    invariants
        .iter()
        .filter_map(|invariant| invariant.check(events).err())
        .collect()
}
