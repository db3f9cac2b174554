//! Per-session output channel.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use super::recovery::FailureNotice;
use super::state::{PlaybackState, SessionPhase};
use crate::media::SessionId;

/// Notification delivered to the caller of `open`.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// Emitted on every playhead update
    Progress(PlaybackState),
    PhaseChanged(SessionPhase),
    /// Natural end of stream, at most once per session
    Ended,
    /// Terminal failure, the last event of the session
    Failed(FailureNotice),
}

/// Slots kept free for phase changes and terminal events. Progress
/// updates are dropped once the free capacity falls to this level.
pub(crate) const EVENT_HEADROOM: usize = 8;

/// Receiving half of a session's event channel.
///
/// The sending half belongs to the session; once the session is disposed,
/// replaced or failed, `recv` drains what was already sent and then
/// returns None. A receiver that falls behind misses progress updates,
/// not phase changes.
#[derive(Debug)]
pub struct SessionEvents {
    session: SessionId,
    receiver: mpsc::Receiver<PlayerEvent>,
}

impl SessionEvents {
    pub(crate) fn channel(session: SessionId, capacity: usize) -> (mpsc::Sender<PlayerEvent>, Self) {
        let (sender, receiver) = mpsc::channel(capacity.max(EVENT_HEADROOM * 2));
        (sender, Self { session, receiver })
    }

    pub fn session_id(&self) -> SessionId {
        self.session
    }

    /// Waits for the next event.
    pub async fn recv(&mut self) -> Option<PlayerEvent> {
        self.receiver.recv().await
    }

    /// Returns an already delivered event without waiting.
    pub fn try_recv(&mut self) -> Option<PlayerEvent> {
        self.receiver.try_recv().ok()
    }
}

impl Stream for SessionEvents {
    type Item = PlayerEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    #[tokio::test]
    async fn test_stream_ends_when_sender_dropped() {
        let (sender, mut events) = SessionEvents::channel(SessionId::new(1), 16);

        sender.try_send(PlayerEvent::Ended).unwrap();
        drop(sender);

        assert_eq!(events.next().await, Some(PlayerEvent::Ended));
        assert_eq!(events.next().await, None);
        assert_eq!(events.session_id(), SessionId::new(1));
    }
}
