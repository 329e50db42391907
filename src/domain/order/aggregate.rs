use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::event_sourcing::core::Aggregate;
use super::errors::OrderError;
use super::events::StoredEvent;
use super::value_objects::{OrderId, OrderStatus};

// ============================================================================
// Order Aggregate - State Derived by Replay
// ============================================================================
//
// An order has no stored row of its own. Its state is whatever the last
// event in timestamp order says, plus the trail that led there.
//
// Replay is permissive: it records the history exactly as stored, including
// out-of-order or duplicated stages. Only events for a different order id
// are rejected.
//
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAggregate {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub history: Vec<OrderStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl OrderAggregate {
    /// Fold a stored history; `None` when the order has no events
    pub fn replay(events: Vec<StoredEvent>) -> Result<Option<Self>, OrderError> {
        <Self as Aggregate>::load_from_events(events)
    }
}

impl Aggregate for OrderAggregate {
    type Event = StoredEvent;
    type Error = OrderError;

    fn apply_first_event(event: &Self::Event) -> Result<Self, Self::Error> {
        Ok(Self {
            order_id: event.order_id.clone(),
            status: event.status,
            history: vec![event.status],
            created_at: event.event_timestamp,
            updated_at: event.event_timestamp,
            version: 1,
        })
    }

    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error> {
        if event.order_id != self.order_id {
            return Err(OrderError::ForeignEvent {
                expected: self.order_id.clone(),
                found: event.order_id.clone(),
            });
        }

        self.status = event.status;
        self.history.push(event.status);
        self.updated_at = event.event_timestamp;
        self.version += 1;
        Ok(())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::OrderEvent;
    use chrono::Duration;
    use uuid::Uuid;

    fn stored_at(order_id: &OrderId, status: OrderStatus, at: DateTime<Utc>) -> StoredEvent {
        let mut event = OrderEvent::new(order_id.clone(), status, status.as_str());
        event.event_timestamp = at;
        event.into_stored(Uuid::new_v4())
    }

    #[test]
    fn test_replay_of_empty_history_is_none() {
        assert!(OrderAggregate::replay(vec![]).unwrap().is_none());
    }

    #[test]
    fn test_replay_reaches_terminal_status() {
        let order_id = OrderId::generate();
        let t0 = Utc::now();
        let events = vec![
            stored_at(&order_id, OrderStatus::Created, t0),
            stored_at(&order_id, OrderStatus::Confirmed, t0 + Duration::seconds(1)),
            stored_at(&order_id, OrderStatus::Shipped, t0 + Duration::seconds(2)),
        ];

        let order = OrderAggregate::replay(events).unwrap().unwrap();

        assert_eq!(order.status, OrderStatus::Shipped);
        assert_eq!(order.version, 3);
        assert_eq!(order.created_at, t0);
        assert_eq!(order.updated_at, t0 + Duration::seconds(2));
    }

    #[test]
    fn test_replay_orders_by_timestamp_not_input_order() {
        let order_id = OrderId::generate();
        let t0 = Utc::now();
        let events = vec![
            stored_at(&order_id, OrderStatus::Confirmed, t0 + Duration::seconds(1)),
            stored_at(&order_id, OrderStatus::Created, t0),
        ];

        let order = OrderAggregate::replay(events).unwrap().unwrap();

        assert_eq!(order.history, vec![OrderStatus::Created, OrderStatus::Confirmed]);
        assert_eq!(order.status, OrderStatus::Confirmed);
    }

    #[test]
    fn test_equal_timestamps_keep_append_order() {
        let order_id = OrderId::generate();
        let t0 = Utc::now();
        let events = vec![
            stored_at(&order_id, OrderStatus::Shipped, t0),
            stored_at(&order_id, OrderStatus::Shipped, t0),
            stored_at(&order_id, OrderStatus::Delivered, t0),
        ];

        let order = OrderAggregate::replay(events).unwrap().unwrap();
        assert_eq!(
            order.history,
            vec![OrderStatus::Shipped, OrderStatus::Shipped, OrderStatus::Delivered]
        );
    }

    #[test]
    fn test_replay_rejects_events_from_another_order() {
        let t0 = Utc::now();
        let events = vec![
            stored_at(&OrderId::parse("order-a").unwrap(), OrderStatus::Created, t0),
            stored_at(&OrderId::parse("order-b").unwrap(), OrderStatus::Confirmed, t0 + Duration::seconds(1)),
        ];

        let result = OrderAggregate::replay(events);
        assert!(matches!(result, Err(OrderError::ForeignEvent { .. })));
    }

    #[test]
    fn test_confirm_without_create_is_kept_as_is() {
        let order_id = OrderId::generate();
        let events = vec![stored_at(&order_id, OrderStatus::Confirmed, Utc::now())];

        let order = OrderAggregate::replay(events).unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.history, vec![OrderStatus::Confirmed]);
    }
}
