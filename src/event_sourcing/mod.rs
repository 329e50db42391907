// ============================================================================
// Event Sourcing Infrastructure
// ============================================================================
//
// Replay abstractions and the append-only event store.
// Order-specific code is in src/domain/
//
// ============================================================================

pub mod core;
pub mod store;

pub use self::core::*;
pub use store::*;
