use std::sync::Arc;
use std::time::Instant;

use crate::event_sourcing::store::EventStore;
use crate::messaging::EventPublisher;
use crate::metrics::Metrics;

use super::aggregate::OrderAggregate;
use super::commands::{OrderCommand, OrderRequest, OrderResponse};
use super::errors::OrderError;
use super::events::{OrderEvent, StoredEvent};
use super::value_objects::{OrderId, OrderStatus};

// ============================================================================
// Order Command Processor
// ============================================================================
//
// Orchestrates: Command → OrderEvent → Event Store → Broker
//
// Append and publish are two independent steps. Once the append succeeded
// the event exists, whatever happens to the publish; a publish failure
// surfaces as OrderError::NotPublished and nothing is rolled back or retried.
//
// By default commands are not checked against the order's history, so
// confirming an unknown or already delivered order still records CONFIRMED.
// `with_transition_checks(true)` replays the order first and rejects moves
// that skip or repeat a stage.
//
// ============================================================================

pub struct OrderCommandProcessor {
    store: Arc<dyn EventStore>,
    publisher: Arc<dyn EventPublisher>,
    topic: String,
    metrics: Arc<Metrics>,
    check_transitions: bool,
}

impl OrderCommandProcessor {
    pub fn new(
        store: Arc<dyn EventStore>,
        publisher: Arc<dyn EventPublisher>,
        topic: impl Into<String>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            store,
            publisher,
            topic: topic.into(),
            metrics,
            check_transitions: false,
        }
    }

    pub fn with_transition_checks(mut self, enabled: bool) -> Self {
        self.check_transitions = enabled;
        self
    }

    pub async fn execute(&self, command: OrderCommand) -> Result<OrderResponse, OrderError> {
        match command {
            OrderCommand::CreateOrder(request) => self.create_order(request).await,
            OrderCommand::ConfirmOrder { order_id } => self.confirm_order(&order_id).await,
        }
    }

    pub async fn create_order(&self, request: OrderRequest) -> Result<OrderResponse, OrderError> {
        let started = Instant::now();
        let order_id = OrderId::generate();

        if let Some(supplied) = request.order_id.as_deref() {
            tracing::debug!(supplied = %supplied, order_id = %order_id, "Ignoring caller-supplied order id");
        }

        let result = self
            .record(OrderEvent::created(order_id))
            .await
            .map(|stored| OrderResponse {
                order_id: stored.order_id,
                status: OrderStatus::Created,
            });

        self.metrics
            .observe_command("create_order", started.elapsed().as_secs_f64());
        result
    }

    pub async fn confirm_order(&self, order_id: &str) -> Result<OrderResponse, OrderError> {
        let started = Instant::now();
        let order_id = OrderId::parse(order_id).map_err(OrderError::Malformed)?;

        let result = self
            .confirm_recorded(&order_id)
            .await
            .map(|stored| OrderResponse {
                order_id: stored.order_id,
                status: OrderStatus::Confirmed,
            });

        self.metrics
            .observe_command("confirm_order", started.elapsed().as_secs_f64());
        result
    }

    async fn confirm_recorded(&self, order_id: &OrderId) -> Result<StoredEvent, OrderError> {
        if self.check_transitions {
            self.ensure_transition(order_id, OrderStatus::Confirmed).await?;
        }
        self.record(OrderEvent::confirmed(order_id.clone())).await
    }

    /// Replay the order and reject `to` unless it directly follows the current status
    async fn ensure_transition(&self, order_id: &OrderId, to: OrderStatus) -> Result<(), OrderError> {
        let history = self
            .store
            .load_events(order_id)
            .await
            .map_err(OrderError::NotStored)?;
        let current = OrderAggregate::replay(history)?.map(|order| order.status);

        if to.can_follow(current) {
            Ok(())
        } else {
            tracing::warn!(order_id = %order_id, from = ?current, to = %to, "Rejected illegal transition");
            Err(OrderError::InvalidTransition {
                order_id: order_id.clone(),
                from: current,
                to,
            })
        }
    }

    /// Append, then publish. The two outcomes are reported separately.
    async fn record(&self, event: OrderEvent) -> Result<StoredEvent, OrderError> {
        let status = event.status;

        let stored = match self.store.append(event).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::error!(error = %e, status = %status, "❌ Failed to store order event");
                self.metrics.record_failure("append", e.kind());
                return Err(OrderError::NotStored(e));
            }
        };
        self.metrics.record_appended(status);

        if let Err(e) = self.publisher.publish(&self.topic, &stored).await {
            tracing::error!(
                error = %e,
                event_id = %stored.id,
                order_id = %stored.order_id,
                status = %status,
                topic = %self.topic,
                "❌ Order event stored but NOT published; subscribers will not see it"
            );
            self.metrics.record_failure("publish", e.kind());
            return Err(OrderError::NotPublished {
                event_id: stored.id,
                order_id: stored.order_id,
                source: e,
            });
        }
        self.metrics.record_published(status);

        tracing::info!(
            event_id = %stored.id,
            order_id = %stored.order_id,
            status = %status,
            "✅ Order event stored and published"
        );
        Ok(stored)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EventError;
    use crate::event_sourcing::store::InMemoryEventStore;
    use crate::messaging::InMemoryBroker;
    use crate::domain::order::event_clock;

    const TOPIC: &str = "order-events";

    struct Fixture {
        store: Arc<InMemoryEventStore>,
        broker: Arc<InMemoryBroker>,
        processor: OrderCommandProcessor,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryEventStore::new());
        let broker = Arc::new(InMemoryBroker::new());
        let processor = OrderCommandProcessor::new(
            store.clone(),
            broker.clone(),
            TOPIC,
            Arc::new(Metrics::new().unwrap()),
        );
        Fixture { store, broker, processor }
    }

    #[tokio::test]
    async fn test_create_order_stores_and_publishes_created() {
        let f = fixture();
        let started = event_clock();

        let response = f.processor.create_order(OrderRequest::default()).await.unwrap();

        assert_eq!(response.status, OrderStatus::Created);
        assert_eq!(response.order_id.as_str().len(), 8);

        let events = f.store.all_events().await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].order_id, response.order_id);
        assert_eq!(events[0].status, OrderStatus::Created);
        assert_eq!(events[0].details, "Order Created");
        assert!(events[0].event_timestamp >= started);
        assert_eq!(f.broker.published_count(TOPIC).await, 1);
    }

    #[tokio::test]
    async fn test_create_order_ignores_supplied_id() {
        let f = fixture();
        let request = OrderRequest {
            order_id: Some("chosen-by-caller".into()),
        };

        let response = f.processor.create_order(request).await.unwrap();
        assert_ne!(response.order_id.as_str(), "chosen-by-caller");
    }

    #[tokio::test]
    async fn test_confirm_unknown_order_still_succeeds() {
        let f = fixture();
        let started = event_clock();

        let response = f.processor.confirm_order("never-created").await.unwrap();

        assert_eq!(response.order_id.as_str(), "never-created");
        assert_eq!(response.status, OrderStatus::Confirmed);

        let events = f.store.all_events().await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, OrderStatus::Confirmed);
        assert!(events[0].event_timestamp >= started);
    }

    #[tokio::test]
    async fn test_confirm_delivered_order_still_succeeds_by_default() {
        let f = fixture();
        let order_id = OrderId::parse("done1234").unwrap();
        f.store.append(OrderEvent::created(order_id.clone())).await.unwrap();
        f.store.append(OrderEvent::delivered(order_id)).await.unwrap();

        let response = f.processor.confirm_order("done1234").await.unwrap();
        assert_eq!(response.status, OrderStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_confirm_accepts_any_non_blank_id() {
        let f = fixture();
        let long = "x".repeat(80);

        for id in ["order.1", "order~2", long.as_str()] {
            let response = f.processor.confirm_order(id).await.unwrap();
            assert_eq!(response.order_id.as_str(), id);
        }
        assert_eq!(f.store.len().await, 3);
    }

    #[tokio::test]
    async fn test_confirm_rejects_blank_id() {
        let f = fixture();

        let result = f.processor.confirm_order("   ").await;

        assert!(matches!(
            result,
            Err(OrderError::Malformed(EventError::MalformedCommand(_)))
        ));
        assert!(f.store.is_empty().await);
    }

    #[tokio::test]
    async fn test_store_failure_publishes_nothing() {
        let f = fixture();
        f.store.set_available(false);

        let result = f.processor.create_order(OrderRequest::default()).await;

        assert!(matches!(
            result,
            Err(OrderError::NotStored(EventError::StorageUnavailable(_)))
        ));
        assert_eq!(f.broker.published_count(TOPIC).await, 0);
    }

    #[tokio::test]
    async fn test_publish_failure_leaves_event_stored() {
        let f = fixture();
        f.broker.set_available(false);

        let result = f.processor.confirm_order("abc12345").await;

        match result {
            Err(OrderError::NotPublished { event_id, order_id, source }) => {
                assert_eq!(order_id.as_str(), "abc12345");
                assert!(matches!(source, EventError::BrokerUnavailable(_)));
                let events = f.store.all_events().await.unwrap();
                assert_eq!(events.len(), 1);
                assert_eq!(events[0].id, event_id);
            }
            other => panic!("expected NotPublished, got {:?}", other),
        }
        assert_eq!(f.broker.published_count(TOPIC).await, 0);
    }

    #[tokio::test]
    async fn test_transition_checks_reject_confirm_without_create() {
        let f = fixture();
        let processor = f.processor.with_transition_checks(true);

        let result = processor.confirm_order("ghost123").await;

        assert!(matches!(
            result,
            Err(OrderError::InvalidTransition { from: None, to: OrderStatus::Confirmed, .. })
        ));
        assert!(f.store.is_empty().await);
    }

    #[tokio::test]
    async fn test_transition_checks_allow_confirm_after_create() {
        let f = fixture();
        let processor = f.processor.with_transition_checks(true);

        let created = processor.create_order(OrderRequest::default()).await.unwrap();
        let confirmed = processor.confirm_order(created.order_id.as_str()).await.unwrap();
        assert_eq!(confirmed.status, OrderStatus::Confirmed);

        let again = processor.confirm_order(created.order_id.as_str()).await;
        assert!(matches!(
            again,
            Err(OrderError::InvalidTransition { from: Some(OrderStatus::Confirmed), .. })
        ));
    }

    #[tokio::test]
    async fn test_execute_dispatches_commands() {
        let f = fixture();

        let created = f
            .processor
            .execute(OrderCommand::CreateOrder(OrderRequest::default()))
            .await
            .unwrap();
        let confirmed = f
            .processor
            .execute(OrderCommand::ConfirmOrder {
                order_id: created.order_id.to_string(),
            })
            .await
            .unwrap();

        assert_eq!(confirmed.order_id, created.order_id);
        assert_eq!(f.store.len().await, 2);
    }
}
