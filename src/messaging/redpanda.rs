use async_trait::async_trait;
use futures_util::StreamExt;
use rdkafka::{
    config::ClientConfig,
    consumer::{CommitMode, Consumer, StreamConsumer},
    error::KafkaError,
    message::Message,
    producer::{FutureProducer, FutureRecord},
    types::RDKafkaErrorCode,
    util::Timeout,
    Offset, TopicPartitionList,
};
use std::sync::Arc;
use std::time::Duration;

use super::publisher::{EventHandler, EventPublisher};
use super::subscription::{deliver_with_retry, Subscription};
use crate::domain::order::StoredEvent;
use crate::error::EventError;
use crate::event_sourcing::core::{deserialize_event, serialize_event};
use crate::utils::{
    retry_with_backoff, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState, RetryConfig,
    RetryResult,
};

// ============================================================================
// Redpanda (Kafka protocol) Producer
// ============================================================================
//
// Events are keyed by order id so one order's events share a partition.
// Delivery ordering across orders is not relied upon anywhere.
//
// ============================================================================

pub struct RedpandaClient {
    producer: FutureProducer,
    circuit_breaker: CircuitBreaker,
    timeout: Duration,
}

impl RedpandaClient {
    pub fn new(brokers: &str, timeout: Duration) -> Result<Self, EventError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", timeout.as_millis().to_string())
            .create()
            .map_err(broker_error)?;

        // Configure circuit breaker for Redpanda
        let cb_config = CircuitBreakerConfig {
            failure_threshold: 5,           // Open after 5 failures
            timeout: Duration::from_secs(30),  // Wait 30s before retry
            success_threshold: 3,           // Need 3 successes to close
        };

        Ok(Self {
            producer,
            circuit_breaker: CircuitBreaker::new(cb_config),
            timeout,
        })
    }

    pub async fn send(&self, topic: &str, key: &str, payload: &str) -> Result<(), EventError> {
        // Use circuit breaker to protect against Redpanda failures
        let result = self
            .circuit_breaker
            .call(async {
                let record = FutureRecord::to(topic).key(key).payload(payload);

                self.producer
                    .send(record, Timeout::After(self.timeout))
                    .await
                    .map_err(|(e, _)| e)?;

                Ok::<(), KafkaError>(())
            })
            .await;

        match result {
            Ok(()) => {
                tracing::info!(topic = %topic, key = %key, "Published to Redpanda");
                Ok(())
            }
            Err(CircuitBreakerError::CircuitOpen) => {
                tracing::error!(topic = %topic, "Circuit breaker open - Redpanda unavailable");
                Err(EventError::BrokerUnavailable("circuit breaker open for Redpanda".into()))
            }
            Err(CircuitBreakerError::OperationFailed(KafkaError::MessageProduction(
                RDKafkaErrorCode::MessageTimedOut,
            ))) => {
                tracing::error!(topic = %topic, key = %key, "Timed out publishing to Redpanda");
                Err(EventError::Timeout {
                    operation: "publish",
                    timeout_ms: self.timeout.as_millis() as u64,
                })
            }
            Err(CircuitBreakerError::OperationFailed(e)) => {
                tracing::error!(error = %e, topic = %topic, "Failed to publish to Redpanda");
                Err(broker_error(e))
            }
        }
    }

    pub async fn get_circuit_breaker_state(&self) -> CircuitState {
        self.circuit_breaker.get_state().await
    }
}

#[async_trait]
impl EventPublisher for RedpandaClient {
    async fn publish(&self, topic: &str, event: &StoredEvent) -> Result<(), EventError> {
        let payload = serialize_event(event)?;
        self.send(topic, event.order_id.as_str(), &payload).await
    }
}

// ============================================================================
// Redpanda Consumer - at-least-once dispatch
// ============================================================================
//
// Offsets are committed by hand, only after the handler succeeded. When the
// handler still fails after its retries, the consumer seeks back to the
// failed offset so the same message is fetched again. A handler that keeps
// failing blocks its partition.
//
// If the seek itself keeps failing, `run` returns without committing
// anything past the failed offset. `supervise` then builds a fresh consumer,
// which resumes from the group's last committed offset.
//
// Payloads that cannot be decoded are committed and skipped: fetching them
// again would not make them decodable.
//
// ============================================================================

const REDELIVERY_PAUSE: Duration = Duration::from_secs(1);
const SEEK_TIMEOUT: Duration = Duration::from_secs(5);
const RESTART_PAUSE: Duration = Duration::from_secs(5);

pub struct RedpandaSubscriber {
    consumer: StreamConsumer,
    topic: String,
    group_id: String,
    handler: Arc<dyn EventHandler>,
    retry: RetryConfig,
}

impl RedpandaSubscriber {
    pub fn new(brokers: &str, subscription: &Subscription, retry: RetryConfig) -> Result<Self, EventError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", &subscription.group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("enable.partition.eof", "false")
            .create()
            .map_err(broker_error)?;

        consumer
            .subscribe(&[subscription.topic.as_str()])
            .map_err(broker_error)?;

        Ok(Self {
            consumer,
            topic: subscription.topic.clone(),
            group_id: subscription.group_id.clone(),
            handler: subscription.handler.clone(),
            retry,
        })
    }

    /// Consume until the stream ends, or until a failed event can no longer be
    /// rewound to.
    pub async fn run(self) -> Result<(), EventError> {
        tracing::info!(topic = %self.topic, group_id = %self.group_id, "🎯 Consuming order events");

        let mut stream = self.consumer.stream();
        while let Some(delivery) = stream.next().await {
            let message = match delivery {
                Ok(message) => message.detach(),
                Err(e) => {
                    tracing::warn!(error = %e, topic = %self.topic, "Error receiving from Redpanda");
                    tokio::time::sleep(REDELIVERY_PAUSE).await;
                    continue;
                }
            };

            let partition = message.partition();
            let offset = message.offset();

            let event: StoredEvent = match message.payload_view::<str>() {
                Some(Ok(payload)) => match deserialize_event(payload) {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!(error = %e, partition, offset, "Skipping undecodable order event");
                        self.commit(partition, offset);
                        continue;
                    }
                },
                _ => {
                    tracing::warn!(partition, offset, "Skipping message without a UTF-8 payload");
                    self.commit(partition, offset);
                    continue;
                }
            };

            match deliver_with_retry(&self.handler, &event, self.retry.clone()).await {
                Ok(()) => self.commit(partition, offset),
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        event_id = %event.id,
                        order_id = %event.order_id,
                        partition,
                        offset,
                        "❌ Handler failed, rewinding for redelivery"
                    );
                    let seek = || {
                        self.consumer
                            .seek(&self.topic, partition, Offset::Offset(offset), SEEK_TIMEOUT)
                    };
                    if let Err(seek_err) = rewind(seek, self.retry.clone()).await {
                        tracing::error!(
                            error = %seek_err,
                            partition,
                            offset,
                            "Seek for redelivery failed, stopping consumer"
                        );
                        return Err(seek_err);
                    }
                    tokio::time::sleep(REDELIVERY_PAUSE).await;
                }
            }
        }

        Ok(())
    }

    fn commit(&self, partition: i32, offset: i64) {
        let mut tpl = TopicPartitionList::new();
        let result = tpl
            .add_partition_offset(&self.topic, partition, Offset::Offset(offset + 1))
            .and_then(|_| self.consumer.commit(&tpl, CommitMode::Async));

        if let Err(e) = result {
            // Uncommitted offsets are simply consumed again after a rebalance
            tracing::warn!(error = %e, partition, offset, "Offset commit failed");
        }
    }
}

/// Run one consumer per call, replacing it whenever it stops. Never returns.
pub async fn supervise(brokers: String, subscription: Subscription, retry: RetryConfig) {
    loop {
        match RedpandaSubscriber::new(&brokers, &subscription, retry.clone()) {
            Ok(consumer) => match consumer.run().await {
                Ok(()) => tracing::warn!(topic = %subscription.topic, "Consumer stream ended"),
                Err(e) => tracing::error!(
                    error = %e,
                    topic = %subscription.topic,
                    group_id = %subscription.group_id,
                    "Consumer stopped"
                ),
            },
            Err(e) => tracing::error!(error = %e, topic = %subscription.topic, "Could not create consumer"),
        }

        tracing::info!(delay_ms = RESTART_PAUSE.as_millis() as u64, "Restarting consumer");
        tokio::time::sleep(RESTART_PAUSE).await;
    }
}

/// Seek back to a failed offset, retrying on the given schedule.
async fn rewind<F>(mut seek: F, retry: RetryConfig) -> Result<(), EventError>
where
    F: FnMut() -> Result<(), KafkaError>,
{
    match retry_with_backoff(retry, |_attempt| std::future::ready(seek())).await {
        RetryResult::Success(()) => Ok(()),
        RetryResult::Failed(e) => Err(broker_error(e)),
    }
}

fn broker_error(err: KafkaError) -> EventError {
    EventError::BrokerUnavailable(err.to_string())
}
