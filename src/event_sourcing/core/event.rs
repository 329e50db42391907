use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EventError;

// ============================================================================
// Domain Event Trait
// ============================================================================

/// What the replay machinery needs to know about any stored event:
/// `timestamp` orders the events of one aggregate.
pub trait DomainEvent: Serialize + for<'de> Deserialize<'de> + Clone + Send + Sync {
    fn timestamp(&self) -> DateTime<Utc>;
}

// ============================================================================
// Event Serialization Helpers
// ============================================================================

pub fn serialize_event<E: Serialize>(event: &E) -> Result<String, EventError> {
    Ok(serde_json::to_string(event)?)
}

pub fn deserialize_event<E: for<'de> Deserialize<'de>>(json: &str) -> Result<E, EventError> {
    Ok(serde_json::from_str(json)?)
}
