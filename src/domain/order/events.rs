use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event_sourcing::core::DomainEvent;
use super::value_objects::{OrderId, OrderStatus};

// ============================================================================
// Order Events
// ============================================================================
//
// One record type for every lifecycle stage. An OrderEvent is built by a
// processor and has no id yet; the store assigns one and hands back a
// StoredEvent, which is what gets published and consumed.
//
// ============================================================================

pub const DETAILS_CREATED: &str = "Order Created";
pub const DETAILS_CONFIRMED: &str = "Order Confirmed";
pub const DETAILS_SHIPPED: &str = "Order Shipped";
pub const DETAILS_DELIVERED: &str = "Order delivered";

/// Current time at millisecond resolution, the finest a CQL `timestamp`
/// keeps. Every copy of an event (returned, published, stored) carries the
/// same value.
pub fn event_clock() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEvent {
    pub id: Option<Uuid>,
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub details: String,
    pub event_timestamp: DateTime<Utc>,
}

impl OrderEvent {
    /// New, not-yet-stored event stamped with the current time
    pub fn new(order_id: OrderId, status: OrderStatus, details: impl Into<String>) -> Self {
        Self {
            id: None,
            order_id,
            status,
            details: details.into(),
            event_timestamp: event_clock(),
        }
    }

    pub fn created(order_id: OrderId) -> Self {
        Self::new(order_id, OrderStatus::Created, DETAILS_CREATED)
    }

    pub fn confirmed(order_id: OrderId) -> Self {
        Self::new(order_id, OrderStatus::Confirmed, DETAILS_CONFIRMED)
    }

    pub fn shipped(order_id: OrderId) -> Self {
        Self::new(order_id, OrderStatus::Shipped, DETAILS_SHIPPED)
    }

    pub fn delivered(order_id: OrderId) -> Self {
        Self::new(order_id, OrderStatus::Delivered, DETAILS_DELIVERED)
    }

    /// Seal the event with its store identifier, keeping an id that is already set
    pub fn into_stored(self, assigned: Uuid) -> StoredEvent {
        StoredEvent {
            id: self.id.unwrap_or(assigned),
            order_id: self.order_id,
            status: self.status,
            details: self.details,
            event_timestamp: self.event_timestamp,
        }
    }
}

/// An event as persisted: identical fields, identifier guaranteed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEvent {
    pub id: Uuid,
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub details: String,
    pub event_timestamp: DateTime<Utc>,
}

impl DomainEvent for StoredEvent {
    fn timestamp(&self) -> DateTime<Utc> {
        self.event_timestamp
    }
}
