// ============================================================================
// Event Sourcing Store - Append-Only Persistence Layer
// ============================================================================

pub mod event_store;
pub mod memory;
pub mod scylla_store;

pub use event_store::{new_event_id, EventStore};
pub use memory::InMemoryEventStore;
pub use scylla_store::ScyllaEventStore;
