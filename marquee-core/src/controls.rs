//! Keyboard shortcuts and time display for player front-ends.

use crate::player::{PlayerHandle, SeekTarget, SessionError};

/// Player action bound to a key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlAction {
    TogglePlay,
    ToggleMute,
    ToggleFullscreen,
    /// Relative seek in seconds
    SeekBy(f64),
}

impl ControlAction {
    /// Sends the action to the player.
    ///
    /// # Errors
    ///
    /// - `SessionError::NoActiveSession` - Nothing is open
    /// - `SessionError::PlayerShutdown` - Actor is gone
    pub async fn apply(self, player: &PlayerHandle) -> Result<(), SessionError> {
        match self {
            ControlAction::TogglePlay => player.toggle_play().await,
            ControlAction::ToggleMute => player.toggle_mute().await,
            ControlAction::ToggleFullscreen => player.toggle_fullscreen().await,
            ControlAction::SeekBy(offset) => player.seek(SeekTarget::Relative(offset)).await,
        }
    }
}

/// Maps a key name to its action. Matching ignores case.
///
/// Space and `k` toggle playback, `m` mute, `f` fullscreen; the left and
/// right arrows seek by `seek_step` seconds.
pub fn action_for_key(key: &str, seek_step: f64) -> Option<ControlAction> {
    match key.to_lowercase().as_str() {
        " " | "space" | "k" => Some(ControlAction::TogglePlay),
        "m" => Some(ControlAction::ToggleMute),
        "f" => Some(ControlAction::ToggleFullscreen),
        "arrowleft" | "left" => Some(ControlAction::SeekBy(-seek_step)),
        "arrowright" | "right" => Some(ControlAction::SeekBy(seek_step)),
        _ => None,
    }
}

/// Formats a playback position as `m:ss`, or `h:mm:ss` from one hour on.
pub fn format_playback_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };

    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_bindings() {
        assert_eq!(action_for_key(" ", 10.0), Some(ControlAction::TogglePlay));
        assert_eq!(action_for_key("K", 10.0), Some(ControlAction::TogglePlay));
        assert_eq!(action_for_key("m", 10.0), Some(ControlAction::ToggleMute));
        assert_eq!(action_for_key("F", 10.0), Some(ControlAction::ToggleFullscreen));
        assert_eq!(
            action_for_key("ArrowLeft", 10.0),
            Some(ControlAction::SeekBy(-10.0))
        );
        assert_eq!(action_for_key("right", 5.0), Some(ControlAction::SeekBy(5.0)));
        assert_eq!(action_for_key("q", 10.0), None);
        assert_eq!(action_for_key("", 10.0), None);
    }

    #[test]
    fn test_format_playback_time() {
        assert_eq!(format_playback_time(0.0), "0:00");
        assert_eq!(format_playback_time(65.9), "1:05");
        assert_eq!(format_playback_time(599.0), "9:59");
        assert_eq!(format_playback_time(3600.0), "1:00:00");
        assert_eq!(format_playback_time(3725.0), "1:02:05");
        assert_eq!(format_playback_time(-4.0), "0:00");
        assert_eq!(format_playback_time(f64::NAN), "0:00");
    }
}
