//! Event bus (C3, §4.3). One [`tokio::sync::broadcast`] channel per
//! `EventKind` discriminant, so "per-kind subscription, registration-order
//! delivery to that kind's subscribers, no cross-kind ordering" falls out
//! of the primitive instead of being hand-rolled. Grounded in the
//! teacher's preference for channel-shaped plumbing over a bespoke
//! pub/sub registry (`toucan-execution`'s account-event streams).

use riskguard_sdk::{Event, EventKind};
use tokio::sync::broadcast;

/// Per-kind channel capacity. A slow subscriber that falls more than this
/// many events behind starts missing the oldest ones (`RecvError::Lagged`)
/// rather than applying backpressure to the producer - publish must never
/// block (§4.3).
const CHANNEL_CAPACITY: usize = 1024;

fn kind_index(kind: &EventKind) -> usize {
    match kind {
        EventKind::PositionOpened(_) => 0,
        EventKind::PositionUpdated(_) => 1,
        EventKind::PositionClosed(_) => 2,
        EventKind::OrderPlaced(_) => 3,
        EventKind::OrderFilled(_) => 4,
        EventKind::OrderCancelled(_) => 5,
        EventKind::OrderRejected(_) => 6,
        EventKind::TradeExecuted(_) => 7,
        EventKind::QuoteUpdate(_) => 8,
        EventKind::UnrealizedPnlUpdate(_) => 9,
        EventKind::MarketDataUpdated(_) => 10,
        EventKind::PnlUpdated(_) => 11,
        EventKind::SdkConnected(_) => 12,
        EventKind::SdkDisconnected(_) => 13,
        EventKind::AuthFailed(_) => 14,
        EventKind::AuthSuccess(_) => 15,
        EventKind::SystemStarted(_) => 16,
    }
}

const KIND_COUNT: usize = 17;

/// In-process multi-producer multi-consumer dispatcher. Not a durable
/// log - "no persistence, durability lives in the store" (§4.3).
#[derive(Debug)]
pub struct EventBus {
    channels: Vec<broadcast::Sender<Event>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let channels = (0..KIND_COUNT)
            .map(|_| broadcast::channel(CHANNEL_CAPACITY).0)
            .collect();
        Self { channels }
    }

    /// Publishes an event. Never blocks: a full channel overwrites its
    /// oldest entry rather than waiting for a subscriber (§4.3). A
    /// `publish` with zero current subscribers for that kind is a no-op,
    /// not an error.
    pub fn publish(&self, event: Event) {
        let idx = kind_index(&event.kind);
        let tag = event.kind.tag();
        if let Err(err) = self.channels[idx].send(event) {
            tracing::trace!(kind = tag, subscribers = 0, "published {tag} with no subscribers: {err}");
        }
    }

    /// Subscribes to every event of `kind`'s discriminant. Multiple
    /// subscribers to the same kind each get their own receiver and see
    /// every event, in publish order.
    pub fn subscribe(&self, kind: &EventKind) -> broadcast::Receiver<Event> {
        self.channels[kind_index(kind)].subscribe()
    }

    /// Subscribes by index directly - used by [`crate::engine::RiskEngine`]
    /// to fan in every kind onto one consumer loop without constructing a
    /// throwaway `EventKind` just to pick a channel.
    pub fn subscribe_all(&self) -> Vec<broadcast::Receiver<Event>> {
        self.channels.iter().map(|tx| tx.subscribe()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use riskguard_sdk::{event::SystemStarted, EventSource};

    fn system_started() -> Event {
        Event::new(EventKind::SystemStarted(SystemStarted), Utc::now(), EventSource::Internal)
    }

    #[tokio::test]
    async fn subscribers_receive_in_publish_order() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe(&EventKind::SystemStarted(SystemStarted));
        let mut rx2 = bus.subscribe(&EventKind::SystemStarted(SystemStarted));

        bus.publish(system_started());

        assert!(matches!(rx1.recv().await.unwrap().kind, EventKind::SystemStarted(_)));
        assert!(matches!(rx2.recv().await.unwrap().kind, EventKind::SystemStarted(_)));
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::new();
        bus.publish(system_started());
    }

    #[tokio::test]
    async fn different_kinds_are_isolated() {
        use riskguard_sdk::event::AuthSuccess;

        let bus = EventBus::new();
        let mut system_rx = bus.subscribe(&EventKind::SystemStarted(SystemStarted));
        bus.publish(Event::new(EventKind::AuthSuccess(AuthSuccess), Utc::now(), EventSource::Sdk));

        // Nothing published on the SystemStarted channel, so this must
        // time out rather than receive the AuthSuccess event.
        let result = tokio::time::timeout(std::time::Duration::from_millis(20), system_rx.recv()).await;
        assert!(result.is_err());
    }
}
