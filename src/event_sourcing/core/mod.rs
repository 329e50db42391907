// ============================================================================
// Event Sourcing Core - Generic Infrastructure Abstractions
// ============================================================================
//
// Nothing in here knows about orders. Aggregates and events from the
// domain layer plug in through these traits.
//
// ============================================================================

pub mod aggregate;
pub mod event;

pub use aggregate::Aggregate;
pub use event::{deserialize_event, serialize_event, DomainEvent};
