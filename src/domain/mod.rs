// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// - order     - the order write model: events, commands, replay, and the
//               command processor behind the HTTP intake
// - shipping  - the subscriber that reacts to published order events
//
// Both sides share the OrderEvent/StoredEvent types and the EventStore seam;
// neither knows which store or broker backs it.
//
// ============================================================================

pub mod order;
pub mod shipping;
