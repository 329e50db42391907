use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use super::publisher::EventPublisher;
use crate::domain::order::StoredEvent;
use crate::error::EventError;
use crate::event_sourcing::core::{deserialize_event, serialize_event};

// ============================================================================
// In-Memory Broker
// ============================================================================
//
// Topic semantics modelled on Kafka consumer groups:
// - every topic keeps its full log of serialized events
// - each consumer group gets its own copy of the stream
// - each group has a committed offset, advanced by `InMemorySubscription::commit`
// - subscribing replays the log from the group's committed offset (0 for a
//   new group, i.e. earliest), then delivers live events
//
// One receiver per group: subscribing the same group again replaces the
// previous receiver. Events it received but never committed are delivered
// again to the new one.
//
// ============================================================================

type Delivery = (usize, String);

#[derive(Default)]
struct GroupState {
    sender: Option<mpsc::UnboundedSender<Delivery>>,
    committed: Arc<AtomicUsize>,
}

#[derive(Default)]
struct TopicState {
    log: Vec<String>,
    groups: HashMap<String, GroupState>,
}

pub struct InMemoryBroker {
    topics: Mutex<HashMap<String, TopicState>>,
    available: AtomicBool,
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub async fn subscribe(&self, topic: &str, group_id: &str) -> InMemorySubscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut topics = self.topics.lock().await;
        let state = topics.entry(topic.to_string()).or_default();
        let group = state.groups.entry(group_id.to_string()).or_default();

        let from = group.committed.load(Ordering::SeqCst);
        for (offset, payload) in state.log.iter().enumerate().skip(from) {
            // Receiver is alive right here, so this cannot fail
            let _ = sender.send((offset, payload.clone()));
        }
        group.sender = Some(sender);

        tracing::debug!(
            topic = %topic,
            group_id = %group_id,
            from_offset = from,
            replayed = state.log.len().saturating_sub(from),
            "Consumer group subscribed"
        );

        InMemorySubscription {
            topic: topic.to_string(),
            group_id: group_id.to_string(),
            receiver,
            committed: group.committed.clone(),
            last_offset: None,
        }
    }

    /// Offset of the next event `group_id` would be replayed from
    pub async fn committed_offset(&self, topic: &str, group_id: &str) -> usize {
        self.topics
            .lock()
            .await
            .get(topic)
            .and_then(|state| state.groups.get(group_id))
            .map(|group| group.committed.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Number of events ever published to `topic`
    pub async fn published_count(&self, topic: &str) -> usize {
        self.topics
            .lock()
            .await
            .get(topic)
            .map(|state| state.log.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl EventPublisher for InMemoryBroker {
    async fn publish(&self, topic: &str, event: &StoredEvent) -> Result<(), EventError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(EventError::BrokerUnavailable("in-memory broker offline".into()));
        }

        let payload = serialize_event(event)?;
        let mut topics = self.topics.lock().await;
        let state = topics.entry(topic.to_string()).or_default();

        let offset = state.log.len();
        state.log.push(payload.clone());
        for group in state.groups.values_mut() {
            let delivered = group
                .sender
                .as_ref()
                .is_some_and(|sender| sender.send((offset, payload.clone())).is_ok());
            if !delivered {
                // Offline group: it catches up from its committed offset on resubscribe
                group.sender = None;
            }
        }

        tracing::debug!(
            topic = %topic,
            event_id = %event.id,
            order_id = %event.order_id,
            "Published to in-memory broker"
        );
        Ok(())
    }
}

/// One consumer group's view of a topic
pub struct InMemorySubscription {
    pub topic: String,
    pub group_id: String,
    receiver: mpsc::UnboundedReceiver<Delivery>,
    committed: Arc<AtomicUsize>,
    last_offset: Option<usize>,
}

impl InMemorySubscription {
    /// Next delivered event; `None` once the broker is dropped
    pub async fn next(&mut self) -> Option<Result<StoredEvent, EventError>> {
        let (offset, payload) = self.receiver.recv().await?;
        self.last_offset = Some(offset);
        Some(deserialize_event(&payload))
    }

    /// Next event if one is already queued
    pub fn try_next(&mut self) -> Option<Result<StoredEvent, EventError>> {
        let (offset, payload) = self.receiver.try_recv().ok()?;
        self.last_offset = Some(offset);
        Some(deserialize_event(&payload))
    }

    /// Mark everything up to the last returned event as consumed by this group
    pub fn commit(&self) {
        if let Some(offset) = self.last_offset {
            self.committed.fetch_max(offset + 1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{OrderEvent, OrderId};
    use uuid::Uuid;

    fn stored(order_id: &str) -> StoredEvent {
        OrderEvent::created(OrderId::parse(order_id).unwrap()).into_stored(Uuid::new_v4())
    }

    #[tokio::test]
    async fn test_each_group_receives_every_event() {
        let broker = InMemoryBroker::new();
        let mut shipping = broker.subscribe("order-events", "shipping-service").await;
        let mut audit = broker.subscribe("order-events", "audit").await;

        let event = stored("aaaa1111");
        broker.publish("order-events", &event).await.unwrap();

        assert_eq!(shipping.next().await.unwrap().unwrap(), event);
        assert_eq!(audit.next().await.unwrap().unwrap(), event);
    }

    #[tokio::test]
    async fn test_late_group_replays_log_from_start() {
        let broker = InMemoryBroker::new();
        let first = stored("aaaa1111");
        let second = stored("bbbb2222");
        broker.publish("order-events", &first).await.unwrap();
        broker.publish("order-events", &second).await.unwrap();

        let mut late = broker.subscribe("order-events", "late").await;

        assert_eq!(late.try_next().unwrap().unwrap(), first);
        assert_eq!(late.try_next().unwrap().unwrap(), second);
        assert!(late.try_next().is_none());
    }

    #[tokio::test]
    async fn test_resubscribed_group_resumes_after_committed_offset() {
        let broker = InMemoryBroker::new();
        let events = [stored("aaaa1111"), stored("bbbb2222"), stored("cccc3333")];
        for event in &events {
            broker.publish("order-events", event).await.unwrap();
        }

        let mut first = broker.subscribe("order-events", "shipping-service").await;
        for expected in &events[..2] {
            assert_eq!(&first.next().await.unwrap().unwrap(), expected);
            first.commit();
        }
        drop(first);
        assert_eq!(broker.committed_offset("order-events", "shipping-service").await, 2);

        let mut second = broker.subscribe("order-events", "shipping-service").await;
        assert_eq!(second.try_next().unwrap().unwrap(), events[2]);
        assert!(second.try_next().is_none());
    }

    #[tokio::test]
    async fn test_uncommitted_event_is_delivered_again() {
        let broker = InMemoryBroker::new();
        let event = stored("aaaa1111");

        let mut first = broker.subscribe("order-events", "shipping-service").await;
        broker.publish("order-events", &event).await.unwrap();
        assert_eq!(first.next().await.unwrap().unwrap(), event);
        drop(first);

        // Published while the group has no receiver
        let later = stored("bbbb2222");
        broker.publish("order-events", &later).await.unwrap();

        let mut second = broker.subscribe("order-events", "shipping-service").await;
        assert_eq!(second.try_next().unwrap().unwrap(), event);
        assert_eq!(second.try_next().unwrap().unwrap(), later);
    }

    #[tokio::test]
    async fn test_commit_without_delivery_is_a_no_op() {
        let broker = InMemoryBroker::new();
        let subscription = broker.subscribe("order-events", "g").await;
        subscription.commit();
        assert_eq!(broker.committed_offset("order-events", "g").await, 0);
    }

    #[tokio::test]
    async fn test_topics_are_isolated() {
        let broker = InMemoryBroker::new();
        let mut other = broker.subscribe("other-topic", "g").await;

        broker.publish("order-events", &stored("aaaa1111")).await.unwrap();

        assert!(other.try_next().is_none());
        assert_eq!(broker.published_count("order-events").await, 1);
        assert_eq!(broker.published_count("other-topic").await, 0);
    }

    #[tokio::test]
    async fn test_offline_broker_rejects_publish() {
        let broker = InMemoryBroker::new();
        broker.set_available(false);

        let result = broker.publish("order-events", &stored("aaaa1111")).await;
        assert!(matches!(result, Err(EventError::BrokerUnavailable(_))));
        assert_eq!(broker.published_count("order-events").await, 0);
    }
}
