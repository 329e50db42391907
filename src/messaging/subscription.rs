use std::sync::Arc;
use tokio::task::JoinHandle;

use super::memory::{InMemoryBroker, InMemorySubscription};
use super::publisher::EventHandler;
use crate::domain::order::StoredEvent;
use crate::error::EventError;
use crate::utils::{retry_with_backoff, RetryConfig, RetryResult};

// ============================================================================
// Subscription Table
// ============================================================================
//
// Which handler consumes which topic under which consumer group, declared
// once at startup. The same table drives the Kafka runtime
// (messaging::redpanda) and the in-memory one below.
//
// ============================================================================

#[derive(Clone)]
pub struct Subscription {
    pub topic: String,
    pub group_id: String,
    pub handler: Arc<dyn EventHandler>,
}

#[derive(Clone, Default)]
pub struct SubscriptionTable {
    subscriptions: Vec<Subscription>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        mut self,
        topic: impl Into<String>,
        group_id: impl Into<String>,
        handler: Arc<dyn EventHandler>,
    ) -> Self {
        self.subscriptions.push(Subscription {
            topic: topic.into(),
            group_id: group_id.into(),
            handler,
        });
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Subscription> {
        self.subscriptions.iter()
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Spawn one dispatch task per entry against an in-memory broker
    pub async fn start_in_memory(&self, broker: &InMemoryBroker, retry: RetryConfig) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::with_capacity(self.subscriptions.len());
        for subscription in &self.subscriptions {
            let stream = broker
                .subscribe(&subscription.topic, &subscription.group_id)
                .await;
            let handler = subscription.handler.clone();
            let retry = retry.clone();
            handles.push(tokio::spawn(run_subscription(stream, handler, retry)));
        }
        handles
    }
}

/// Hand one event to `handler`, redelivering with backoff while it fails.
/// Returns the last error if every attempt failed.
pub async fn deliver_with_retry(
    handler: &Arc<dyn EventHandler>,
    event: &StoredEvent,
    retry: RetryConfig,
) -> Result<(), EventError> {
    let result = retry_with_backoff(retry, |attempt| {
        let handler = handler.clone();
        let event = event.clone();
        async move {
            if attempt > 1 {
                tracing::debug!(attempt = attempt, event_id = %event.id, "Redelivering event");
            }
            handler.handle(&event).await
        }
    })
    .await;

    match result {
        RetryResult::Success(()) => Ok(()),
        RetryResult::Failed(e) => Err(e),
    }
}

/// Drain an in-memory subscription until the broker goes away. Every event is
/// committed once it has been handled, dropped, or found undecodable.
pub async fn run_subscription(
    mut stream: InMemorySubscription,
    handler: Arc<dyn EventHandler>,
    retry: RetryConfig,
) {
    tracing::info!(topic = %stream.topic, group_id = %stream.group_id, "Subscription started");

    while let Some(delivery) = stream.next().await {
        let event = match delivery {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, topic = %stream.topic, "Skipping undecodable event");
                stream.commit();
                continue;
            }
        };

        if let Err(e) = deliver_with_retry(&handler, &event, retry.clone()).await {
            tracing::error!(
                error = %e,
                event_id = %event.id,
                order_id = %event.order_id,
                group_id = %stream.group_id,
                "❌ Event handling failed after retries, dropping"
            );
        }
        stream.commit();
    }

    tracing::info!(topic = %stream.topic, group_id = %stream.group_id, "Subscription closed");
}
