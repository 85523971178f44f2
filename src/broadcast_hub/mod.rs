//! BroadcastHub - Live Update Distribution
//!
//! ## Responsibilities
//!
//! - Subscriber registration / removal
//! - Fan-out of every published value to all live subscribers
//! - Replay of the last value to a newly joined subscriber
//! - Keep-alive signal for idle subscribers
//!
//! The subscriber map and the last value live under one lock so that a
//! subscriber joining while a publish is in flight sees that value exactly
//! once (as the replay or as a delivery) or not at all. The lock is never held
//! across an await, which lets `Subscription` unregister itself from `Drop`
//! when the transport drops the stream on disconnect.

use futures::Stream;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Default idle window before a keep-alive is emitted
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// What a subscriber observes
#[derive(Debug, Clone, PartialEq)]
pub enum HubEvent<T> {
    /// A published value (or the replay at subscribe time)
    Value(T),
    /// No value arrived within the idle window
    KeepAlive,
}

/// Delivery failed because the subscriber's receiving side is gone
#[derive(Debug)]
struct SubscriberGone;

struct HubState<T> {
    subscribers: HashMap<Uuid, mpsc::UnboundedSender<T>>,
    last_value: Option<T>,
}

/// BroadcastHub instance
pub struct BroadcastHub<T> {
    /// Stream name used in logs
    name: &'static str,
    state: Mutex<HubState<T>>,
    idle_timeout: Duration,
}

impl<T> BroadcastHub<T> {
    fn lock(&self) -> MutexGuard<'_, HubState<T>> {
        // State stays consistent across a panic in another holder
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove a subscriber; returns false if it was already gone
    pub fn unsubscribe(&self, id: &Uuid) -> bool {
        let removed = self.lock().subscribers.remove(id).is_some();
        if removed {
            tracing::info!(hub = self.name, subscriber_id = %id, "Subscriber removed");
        }
        removed
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T: Clone + Send + 'static> BroadcastHub<T> {
    /// Create new BroadcastHub
    pub fn new(name: &'static str, idle_timeout: Duration) -> Self {
        Self {
            name,
            state: Mutex::new(HubState {
                subscribers: HashMap::new(),
                last_value: None,
            }),
            idle_timeout,
        }
    }

    /// Register a new subscriber, replaying the last value first
    pub fn subscribe(self: &Arc<Self>) -> Subscription<T> {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        let (count, replayed) = {
            let mut state = self.lock();
            let replayed = match &state.last_value {
                Some(value) => deliver(&tx, value.clone()).is_ok(),
                None => false,
            };
            state.subscribers.insert(id, tx);
            (state.subscribers.len(), replayed)
        };

        tracing::info!(
            hub = self.name,
            subscriber_id = %id,
            subscriber_count = count,
            replayed,
            "Subscriber connected"
        );

        Subscription {
            id,
            rx,
            idle_timeout: self.idle_timeout,
            hub: Arc::clone(self),
        }
    }

    /// Store the value and deliver it to every live subscriber
    ///
    /// Returns the number of subscribers it was delivered to. Subscribers
    /// whose channel is closed are dropped from the set; no failure reaches
    /// the caller.
    pub fn publish(&self, value: T) -> usize {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.last_value = Some(value.clone());

        let mut gone = Vec::new();
        for (id, tx) in &state.subscribers {
            if let Err(SubscriberGone) = deliver(tx, value.clone()) {
                gone.push(*id);
            }
        }

        for id in &gone {
            state.subscribers.remove(id);
            tracing::warn!(hub = self.name, subscriber_id = %id, "Delivery failed, subscriber removed");
        }

        let delivered = state.subscribers.len();
        tracing::debug!(hub = self.name, delivered, removed = gone.len(), "Value published");
        delivered
    }

    /// Last published value, without affecting subscribers
    pub fn latest(&self) -> Option<T> {
        self.lock().last_value.clone()
    }
}

fn deliver<T>(tx: &mpsc::UnboundedSender<T>, value: T) -> std::result::Result<(), SubscriberGone> {
    tx.send(value).map_err(|_| SubscriberGone)
}

/// Handle for one live subscriber
///
/// Dropping it unregisters the subscriber.
pub struct Subscription<T> {
    id: Uuid,
    rx: mpsc::UnboundedReceiver<T>,
    idle_timeout: Duration,
    hub: Arc<BroadcastHub<T>>,
}

impl<T> Subscription<T> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Wait for the next value, or a keep-alive once the idle window passes
    ///
    /// Returns `None` once the subscriber has been removed from the hub.
    pub async fn next(&mut self) -> Option<HubEvent<T>> {
        match tokio::time::timeout(self.idle_timeout, self.rx.recv()).await {
            Ok(Some(value)) => Some(HubEvent::Value(value)),
            Ok(None) => None,
            Err(_) => {
                tracing::trace!(hub = self.hub.name, subscriber_id = %self.id, "Idle, keep-alive");
                Some(HubEvent::KeepAlive)
            }
        }
    }

    /// Explicitly leave the hub; later calls to `next` return `None`
    pub fn unsubscribe(&mut self) {
        self.hub.unsubscribe(&self.id);
        self.rx.close();
    }

    /// Turn the handle into an endless stream of hub events
    pub fn into_stream(self) -> impl Stream<Item = HubEvent<T>> {
        futures::stream::unfold(self, |mut sub| async move {
            sub.next().await.map(|event| (event, sub))
        })
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.hub.unsubscribe(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn hub(idle_ms: u64) -> Arc<BroadcastHub<u32>> {
        Arc::new(BroadcastHub::new("test", Duration::from_millis(idle_ms)))
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_replay_then_new_values() {
        let hub = hub(1_000);
        hub.publish(1);
        hub.publish(2);
        hub.publish(3);

        let mut sub = hub.subscribe();
        hub.publish(4);

        assert_eq!(sub.next().await, Some(HubEvent::Value(3)));
        assert_eq!(sub.next().await, Some(HubEvent::Value(4)));
    }

    #[tokio::test]
    async fn test_no_replay_before_first_publish() {
        let hub = hub(30);
        let mut sub = hub.subscribe();
        assert_eq!(sub.next().await, Some(HubEvent::KeepAlive));
        assert_eq!(hub.latest(), None);
    }

    #[tokio::test]
    async fn test_failed_delivery_removes_only_that_subscriber() {
        let hub = hub(1_000);
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 2);

        // Connection gone without an explicit unsubscribe
        a.rx.close();

        assert_eq!(hub.publish(7), 1);
        assert_eq!(b.next().await, Some(HubEvent::Value(7)));
        assert_eq!(hub.subscriber_count(), 1);

        // Cleanup of an already removed subscriber is a no-op
        assert!(!hub.unsubscribe(&a.id()));
        drop(a);
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_idle_emits_single_keepalive_without_touching_state() {
        let hub = hub(50);
        hub.publish(9);
        let mut sub = hub.subscribe();
        assert_eq!(sub.next().await, Some(HubEvent::Value(9)));

        assert_eq!(sub.next().await, Some(HubEvent::KeepAlive));
        assert_eq!(hub.latest(), Some(9));
        assert_eq!(hub.subscriber_count(), 1);

        hub.publish(10);
        assert_eq!(sub.next().await, Some(HubEvent::Value(10)));
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent_and_ends_stream() {
        let hub = hub(1_000);
        let mut sub = hub.subscribe();
        let id = sub.id();

        sub.unsubscribe();
        assert_eq!(hub.subscriber_count(), 0);
        assert!(!hub.unsubscribe(&id));
        assert_eq!(sub.next().await, None);

        // Publishing with no subscribers still records the value
        assert_eq!(hub.publish(5), 0);
        assert_eq!(hub.latest(), Some(5));
    }

    #[tokio::test]
    async fn test_drop_unregisters() {
        let hub = hub(1_000);
        {
            let _sub = hub.subscribe();
            assert_eq!(hub.subscriber_count(), 1);
        }
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_stream_yields_in_publish_order() {
        let hub = hub(1_000);
        let stream = hub.subscribe().into_stream();
        hub.publish(1);
        hub.publish(2);

        let events: Vec<_> = stream.take(2).collect().await;
        assert_eq!(events, vec![HubEvent::Value(1), HubEvent::Value(2)]);
    }

    #[tokio::test]
    async fn test_concurrent_subscribe_never_duplicates() {
        let hub = hub(50);
        let publisher = {
            let hub = hub.clone();
            tokio::spawn(async move {
                for i in 0..500 {
                    hub.publish(i);
                    if i % 10 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            })
        };

        let mut readers = Vec::new();
        for _ in 0..8 {
            let mut sub = hub.subscribe();
            readers.push(tokio::spawn(async move {
                let mut seen = Vec::new();
                while let Some(HubEvent::Value(v)) = sub.next().await {
                    seen.push(v);
                }
                seen
            }));
            tokio::task::yield_now().await;
        }

        publisher.await.unwrap();
        for reader in readers {
            let seen = reader.await.unwrap();
            assert!(seen.windows(2).all(|w| w[0] < w[1]), "out of order or duplicated: {:?}", seen);
            assert_eq!(seen.last(), Some(&499));
        }
    }
}
