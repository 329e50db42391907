use uuid::Uuid;

use crate::error::EventError;
use super::value_objects::{OrderId, OrderStatus};

// ============================================================================
// Order Command Errors
// ============================================================================
//
// NotStored: nothing was recorded.
// NotPublished: the event IS durable but subscribers will never see it.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("malformed command: {0}")]
    Malformed(EventError),

    #[error("event was not stored: {0}")]
    NotStored(EventError),

    #[error("event {event_id} for order {order_id} was stored but not published: {source}")]
    NotPublished {
        event_id: Uuid,
        order_id: OrderId,
        source: EventError,
    },

    #[error("order {order_id} cannot move from {} to {to}", .from.map(|s| s.as_str()).unwrap_or("nothing"))]
    InvalidTransition {
        order_id: OrderId,
        from: Option<OrderStatus>,
        to: OrderStatus,
    },

    #[error("event for order {found} replayed into order {expected}")]
    ForeignEvent { expected: OrderId, found: OrderId },
}

impl OrderError {
    /// The infrastructure failure underneath, if there is one
    pub fn source_kind(&self) -> Option<&EventError> {
        match self {
            OrderError::Malformed(e) | OrderError::NotStored(e) => Some(e),
            OrderError::NotPublished { source, .. } => Some(source),
            OrderError::InvalidTransition { .. } | OrderError::ForeignEvent { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            OrderError::InvalidTransition { .. } => "invalid_transition",
            OrderError::ForeignEvent { .. } => "foreign_event",
            _ => self.source_kind().map(EventError::kind).unwrap_or("internal"),
        }
    }
}
