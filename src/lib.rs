// ============================================================================
// Order Event Sourcing
// ============================================================================
//
// Two services share this library:
// - order-service     - HTTP command intake; appends CREATED/CONFIRMED
//                       events and publishes them to the order topic
// - shipping-service  - consumes the topic and records SHIPPED for every
//                       confirmed order in its own event store
//
// Layers:
// - domain          - order write model and shipping subscriber
// - event_sourcing  - DomainEvent/Aggregate traits and event stores
// - messaging       - publisher/handler seams, Redpanda and in-memory brokers
// - api             - actix-web route table for the order service
// - config, telemetry, metrics, health, utils - ambient plumbing
//
// ============================================================================

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod event_sourcing;
pub mod health;
pub mod messaging;
pub mod metrics;
pub mod telemetry;
pub mod utils;

pub use config::Config;
pub use error::EventError;
