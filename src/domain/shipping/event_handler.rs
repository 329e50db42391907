use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::order::{OrderEvent, OrderId, OrderStatus, StoredEvent};
use crate::error::EventError;
use crate::event_sourcing::store::EventStore;
use crate::messaging::EventHandler;
use crate::metrics::Metrics;

// ============================================================================
// Shipping Subscriber - reacts to order events
// ============================================================================
//
// Transition table:
//   CONFIRMED → append SHIPPED ("Order Shipped")
//   anything else → ignored
//
// The SHIPPED event is stored only, never published, so nothing downstream
// reacts to it; DELIVERED is recorded only when something external calls
// `deliver_order`.
//
// Delivery is at-least-once and shipping is not idempotent by default: the
// same CONFIRMED event delivered twice yields two SHIPPED rows.
// `with_deduplication(true)` makes `ship_order` skip orders that already
// have a SHIPPED event.
//
// ============================================================================

pub struct OrderEventSubscriber {
    store: Arc<dyn EventStore>,
    metrics: Arc<Metrics>,
    deduplicate: bool,
}

impl OrderEventSubscriber {
    pub fn new(store: Arc<dyn EventStore>, metrics: Arc<Metrics>) -> Self {
        Self {
            store,
            metrics,
            deduplicate: false,
        }
    }

    pub fn with_deduplication(mut self, enabled: bool) -> Self {
        self.deduplicate = enabled;
        self
    }

    /// React to one delivered event. Returns the event appended in response, if any.
    pub async fn on_event(&self, event: &StoredEvent) -> Result<Option<StoredEvent>, EventError> {
        tracing::debug!(
            event_id = %event.id,
            order_id = %event.order_id,
            status = %event.status,
            "Received order event"
        );

        let outcome = match event.status {
            OrderStatus::Confirmed => self.ship_order(&event.order_id).await,
            OrderStatus::Created | OrderStatus::Shipped | OrderStatus::Delivered => {
                self.metrics.record_subscriber_event(event.status, "ignored");
                return Ok(None);
            }
        };

        match &outcome {
            Ok(Some(_)) => self.metrics.record_subscriber_event(event.status, "acted"),
            Ok(None) => self.metrics.record_subscriber_event(event.status, "duplicate"),
            Err(e) => {
                self.metrics.record_subscriber_event(event.status, "failed");
                self.metrics.record_failure("handle", e.kind());
            }
        }
        outcome
    }

    /// Append a SHIPPED event. `None` only when deduplication skipped it.
    pub async fn ship_order(&self, order_id: &OrderId) -> Result<Option<StoredEvent>, EventError> {
        if self.deduplicate && self.already_shipped(order_id).await? {
            tracing::info!(order_id = %order_id, "Order already shipped, skipping duplicate");
            return Ok(None);
        }

        let stored = self.store.append(OrderEvent::shipped(order_id.clone())).await?;
        self.metrics.record_appended(OrderStatus::Shipped);

        tracing::info!(event_id = %stored.id, order_id = %order_id, "🚚 Order shipped");
        Ok(Some(stored))
    }

    /// Append a DELIVERED event. Not triggered by any subscription.
    pub async fn deliver_order(&self, order_id: &OrderId) -> Result<StoredEvent, EventError> {
        let stored = self.store.append(OrderEvent::delivered(order_id.clone())).await?;
        self.metrics.record_appended(OrderStatus::Delivered);

        tracing::info!(event_id = %stored.id, order_id = %order_id, "📦 Order delivered");
        Ok(stored)
    }

    async fn already_shipped(&self, order_id: &OrderId) -> Result<bool, EventError> {
        Ok(self
            .store
            .load_events(order_id)
            .await?
            .iter()
            .any(|event| event.status == OrderStatus::Shipped))
    }
}

#[async_trait]
impl EventHandler for OrderEventSubscriber {
    async fn handle(&self, event: &StoredEvent) -> Result<(), EventError> {
        self.on_event(event).await.map(|_| ())
    }
}
