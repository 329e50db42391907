// ============================================================================
// Messaging - Event Topic Plumbing
// ============================================================================
//
// - publisher     - EventPublisher / EventHandler seams
// - redpanda      - Kafka-protocol producer and consumer (rdkafka)
// - memory        - in-process broker with consumer-group semantics
// - subscription  - startup subscription table and dispatch with redelivery
//
// ============================================================================

pub mod memory;
pub mod publisher;
pub mod redpanda;
pub mod subscription;

pub use memory::{InMemoryBroker, InMemorySubscription};
pub use publisher::{EventHandler, EventPublisher};
pub use redpanda::{supervise, RedpandaClient, RedpandaSubscriber};
pub use subscription::{deliver_with_retry, run_subscription, Subscription, SubscriptionTable};
