use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::statement::prepared::PreparedStatement;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::event_store::{new_event_id, EventStore};
use crate::domain::order::{OrderEvent, OrderId, OrderStatus, StoredEvent};
use crate::error::EventError;
use crate::utils::{retry_with_backoff, with_timeout, RetryConfig, RetryResult};

// ============================================================================
// ScyllaDB Event Store
// ============================================================================
//
// Layout: one `order_events` table per service keyspace, one row per event.
//
//   PRIMARY KEY ((order_id), event_timestamp, id)
//
// Partitioning by order id lets a replay read a single partition in
// timestamp order without any secondary index. Rows are only ever INSERTed.
//
// `event_timestamp` holds milliseconds, so events of one order can tie on
// it. Ids are UUIDv7 (see `new_event_id`); Scylla compares non-time UUIDs
// bytewise, which for v7 is creation order, so ties come back in append
// order.
//
// ============================================================================

const TABLE: &str = "order_events";

/// Column order of `select_by_order`
type EventRow = (Uuid, String, String, String, DateTime<Utc>);

pub struct ScyllaEventStore {
    session: Arc<Session>,
    insert: PreparedStatement,
    select_by_order: PreparedStatement,
    timeout: Duration,
}

impl ScyllaEventStore {
    /// Connect (with backoff), create the keyspace/table if missing, prepare statements
    pub async fn connect(
        nodes: &[String],
        keyspace: &str,
        timeout: Duration,
        retry: RetryConfig,
    ) -> Result<Self, EventError> {
        let session = match retry_with_backoff(retry, |attempt| async move {
            tracing::info!(attempt = attempt, nodes = ?nodes, "Connecting to ScyllaDB");
            SessionBuilder::new().known_nodes(nodes).build().await
        })
        .await
        {
            RetryResult::Success(session) => session,
            RetryResult::Failed(e) => {
                return Err(EventError::StorageUnavailable(format!(
                    "could not connect to ScyllaDB: {}",
                    e
                )))
            }
        };

        Self::ensure_schema(&session, keyspace).await?;
        session
            .use_keyspace(keyspace, false)
            .await
            .map_err(storage_error)?;

        let insert = session
            .prepare(format!(
                "INSERT INTO {} (order_id, event_timestamp, id, status, details) VALUES (?, ?, ?, ?, ?)",
                TABLE
            ))
            .await
            .map_err(storage_error)?;

        let select_by_order = session
            .prepare(format!(
                "SELECT id, order_id, status, details, event_timestamp FROM {} WHERE order_id = ?",
                TABLE
            ))
            .await
            .map_err(storage_error)?;

        tracing::info!(keyspace = %keyspace, table = TABLE, "✅ Event store ready");

        Ok(Self {
            session: Arc::new(session),
            insert,
            select_by_order,
            timeout,
        })
    }

    async fn ensure_schema(session: &Session, keyspace: &str) -> Result<(), EventError> {
        session
            .query_unpaged(
                format!(
                    "CREATE KEYSPACE IF NOT EXISTS {} WITH REPLICATION = \
                     {{'class': 'SimpleStrategy', 'replication_factor': 1}}",
                    keyspace
                ),
                &[],
            )
            .await
            .map_err(storage_error)?;

        session
            .query_unpaged(
                format!(
                    "CREATE TABLE IF NOT EXISTS {}.{} (
                        order_id text,
                        event_timestamp timestamp,
                        id uuid,
                        status text,
                        details text,
                        PRIMARY KEY ((order_id), event_timestamp, id)
                    ) WITH CLUSTERING ORDER BY (event_timestamp ASC, id ASC)",
                    keyspace, TABLE
                ),
                &[],
            )
            .await
            .map_err(storage_error)?;

        Ok(())
    }
}

#[async_trait]
impl EventStore for ScyllaEventStore {
    async fn append(&self, event: OrderEvent) -> Result<StoredEvent, EventError> {
        let stored = event.into_stored(new_event_id());

        with_timeout("append", self.timeout, async {
            self.session
                .execute_unpaged(
                    &self.insert,
                    (
                        stored.order_id.as_str(),
                        stored.event_timestamp,
                        stored.id,
                        stored.status.as_str(),
                        stored.details.as_str(),
                    ),
                )
                .await
                .map_err(storage_error)?;
            Ok(())
        })
        .await?;

        tracing::debug!(
            event_id = %stored.id,
            order_id = %stored.order_id,
            status = %stored.status,
            "Appended event to ScyllaDB"
        );

        Ok(stored)
    }

    async fn load_events(&self, order_id: &OrderId) -> Result<Vec<StoredEvent>, EventError> {
        let result = with_timeout("load", self.timeout, async {
            self.session
                .execute_unpaged(&self.select_by_order, (order_id.as_str(),))
                .await
                .map_err(storage_error)
        })
        .await?;

        // A SELECT always answers with rows; anything else means the driver
        // and the table disagree, which must not look like an empty history.
        let rows_result = result
            .into_rows_result()
            .map_err(|e| EventError::Serialization(e.to_string()))?;

        let events = rows_result
            .rows::<EventRow>()
            .map_err(|e| EventError::Serialization(e.to_string()))?
            .map(|row| event_from_row(row.map_err(|e| EventError::Serialization(e.to_string()))?))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(order_id = %order_id, count = events.len(), "Loaded events from ScyllaDB");
        Ok(events)
    }
}

fn event_from_row(
    (id, order_id, status, details, event_timestamp): EventRow,
) -> Result<StoredEvent, EventError> {
    let status = OrderStatus::parse(&status)
        .ok_or_else(|| EventError::Serialization(format!("unknown status in store: {}", status)))?;
    let order_id = OrderId::parse(&order_id)
        .map_err(|_| EventError::Serialization(format!("blank order id in row {}", id)))?;

    Ok(StoredEvent {
        id,
        order_id,
        status,
        details,
        event_timestamp,
    })
}

fn storage_error<E: std::fmt::Display>(err: E) -> EventError {
    EventError::StorageUnavailable(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::event_clock;

    fn row(order_id: &str, status: &str) -> EventRow {
        (new_event_id(), order_id.to_string(), status.to_string(), "details".to_string(), event_clock())
    }

    #[test]
    fn test_row_decodes_into_stored_event() {
        let (id, _, _, _, at) = row("abc12345", "CONFIRMED");
        let event = event_from_row((id, "abc12345".into(), "CONFIRMED".into(), "details".into(), at)).unwrap();

        assert_eq!(event.id, id);
        assert_eq!(event.order_id.as_str(), "abc12345");
        assert_eq!(event.status, OrderStatus::Confirmed);
        assert_eq!(event.event_timestamp, at);
    }

    #[test]
    fn test_unreadable_rows_are_serialization_errors() {
        assert!(matches!(
            event_from_row(row("abc12345", "LOST")),
            Err(EventError::Serialization(_))
        ));
        assert!(matches!(
            event_from_row(row("  ", "CREATED")),
            Err(EventError::Serialization(_))
        ));
    }
}
