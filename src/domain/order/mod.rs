// ============================================================================
// Order Domain
// ============================================================================
//
// - value_objects   - OrderId, OrderStatus
// - events          - OrderEvent (unstored) and StoredEvent (has its id)
// - commands        - CreateOrder / ConfirmOrder and their response
// - errors          - OrderError
// - aggregate       - replay of an order's history into its current state
// - command_handler - OrderCommandProcessor
//
// ============================================================================

pub mod value_objects;
pub mod events;
pub mod commands;
pub mod errors;
pub mod aggregate;
pub mod command_handler;

pub use value_objects::{OrderId, OrderStatus};
pub use events::{event_clock, OrderEvent, StoredEvent};
pub use commands::{OrderCommand, OrderRequest, OrderResponse};
pub use errors::OrderError;
pub use aggregate::OrderAggregate;
pub use command_handler::OrderCommandProcessor;
