use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::order::{OrderEvent, OrderId, StoredEvent};
use crate::error::EventError;

// ============================================================================
// Event Store - Append-Only Repository for Order Events
// ============================================================================
//
// Responsibilities:
// 1. Assign an identifier to each new event
// 2. Persist it durably, never updating or deleting existing records
// 3. Hand back every event of one order for replay
//
// Status progression is NOT checked here: any event for any order id is
// accepted.
//
// ============================================================================

/// Identifier for a newly stored event.
///
/// UUIDv7 ids lead with their creation time and are strictly increasing
/// within a process, so among events with the same millisecond timestamp
/// the id order is the append order.
pub fn new_event_id() -> Uuid {
    Uuid::now_v7()
}

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persist `event`, assigning an id if it has none, and return the stored form
    async fn append(&self, event: OrderEvent) -> Result<StoredEvent, EventError>;

    /// All events recorded for `order_id`, oldest first
    async fn load_events(&self, order_id: &OrderId) -> Result<Vec<StoredEvent>, EventError>;
}
