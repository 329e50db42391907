use async_trait::async_trait;

use crate::domain::order::StoredEvent;
use crate::error::EventError;

// ============================================================================
// Messaging Seams
// ============================================================================
//
// EventPublisher: producer side. `publish` returns once the broker has
// accepted the event, not once anyone has consumed it.
//
// EventHandler: consumer side. Returning Err asks the runtime to deliver the
// same event again later (at-least-once), so handlers must tolerate repeats.
//
// ============================================================================

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, event: &StoredEvent) -> Result<(), EventError>;
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &StoredEvent) -> Result<(), EventError>;
}
