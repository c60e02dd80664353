//! Broadcast bus carrying [`SessionEvent`]s from the orchestrator to renderers.
//!
//! Publishing with no subscribers is a no-op. A slow subscriber that falls
//! more than `capacity` events behind sees `RecvError::Lagged` and skips ahead.

use spaces_types::event::SessionEvent;
use tokio::sync::broadcast;

/// Default channel capacity used by the orchestrator.
pub const DEFAULT_CAPACITY: usize = 256;

/// Multi-consumer bus for session events. Cloning shares the channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to all events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: SessionEvent) {
        let _ = self.sender.send(event);
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spaces_types::event::ReplyRoute;
    use uuid::Uuid;

    fn failed(i: usize) -> SessionEvent {
        SessionEvent::ReplyFailed {
            space_id: Uuid::now_v7(),
            route: ReplyRoute::Direct,
            error: format!("failure {i}"),
        }
    }

    #[tokio::test]
    async fn every_subscriber_receives_each_event() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.clone().subscribe();

        bus.publish(failed(0));

        assert!(matches!(rx1.recv().await.unwrap(), SessionEvent::ReplyFailed { .. }));
        assert!(matches!(rx2.recv().await.unwrap(), SessionEvent::ReplyFailed { .. }));
        assert_eq!(bus.receiver_count(), 2);
    }

    #[test]
    fn publish_without_subscribers_is_noop() {
        let bus = EventBus::default();
        bus.publish(failed(0));
        assert_eq!(bus.receiver_count(), 0);
    }

    #[test]
    fn lagging_subscriber_skips_ahead() {
        let bus = EventBus::new(4);
        let mut rx = bus.subscribe();
        for i in 0..10 {
            bus.publish(failed(i));
        }

        match rx.try_recv() {
            Err(broadcast::error::TryRecvError::Lagged(n)) => assert_eq!(n, 6),
            other => panic!("expected lag, got {other:?}"),
        }
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn debug_shows_receiver_count() {
        let bus = EventBus::new(16);
        let _rx = bus.subscribe();
        assert!(format!("{bus:?}").contains("receiver_count: 1"));
    }
}
