use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::event_store::{new_event_id, EventStore};
use crate::domain::order::{OrderEvent, OrderId, StoredEvent};
use crate::error::EventError;
use crate::event_sourcing::core::{deserialize_event, serialize_event};

// ============================================================================
// In-Memory Event Store
// ============================================================================
//
// Keeps each event as its serialized JSON document, in append order, so the
// encode/decode path matches what a durable store sees. `set_available(false)`
// makes every call fail with StorageUnavailable.
//
// ============================================================================

pub struct InMemoryEventStore {
    documents: RwLock<Vec<String>>,
    available: AtomicBool,
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(Vec::new()),
            available: AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Every stored event across all orders, in append order
    pub async fn all_events(&self) -> Result<Vec<StoredEvent>, EventError> {
        self.documents
            .read()
            .await
            .iter()
            .map(|doc| deserialize_event(doc))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    fn check_available(&self) -> Result<(), EventError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(EventError::StorageUnavailable("in-memory store offline".into()))
        }
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, event: OrderEvent) -> Result<StoredEvent, EventError> {
        self.check_available()?;

        let stored = event.into_stored(new_event_id());
        let document = serialize_event(&stored)?;
        self.documents.write().await.push(document);

        tracing::debug!(
            event_id = %stored.id,
            order_id = %stored.order_id,
            status = %stored.status,
            "Appended event to in-memory store"
        );

        Ok(stored)
    }

    async fn load_events(&self, order_id: &OrderId) -> Result<Vec<StoredEvent>, EventError> {
        self.check_available()?;

        Ok(self
            .all_events()
            .await?
            .into_iter()
            .filter(|event| &event.order_id == order_id)
            .collect())
    }
}
