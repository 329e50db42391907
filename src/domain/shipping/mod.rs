// ============================================================================
// Shipping Domain
// ============================================================================
//
// Consumes the order topic and records SHIPPED for every confirmed order.
// Shipping keeps its own event store; it never reads the order service's.
//
// ============================================================================

pub mod event_handler;

pub use event_handler::OrderEventSubscriber;
