use thiserror::Error;

// ============================================================================
// Infrastructure Error Kinds
// ============================================================================
//
// Every failure the store, the broker or command intake can produce.
// Domain-level errors (OrderError) wrap these.
//
// ============================================================================

#[derive(Debug, Error)]
pub enum EventError {
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("broker unavailable: {0}")]
    BrokerUnavailable(String),

    #[error("malformed command: {0}")]
    MalformedCommand(String),

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },
}

impl EventError {
    /// Short, stable label used in logs, metrics and HTTP error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            EventError::StorageUnavailable(_) => "storage_unavailable",
            EventError::Serialization(_) => "serialization_error",
            EventError::BrokerUnavailable(_) => "broker_unavailable",
            EventError::MalformedCommand(_) => "malformed_command",
            EventError::Timeout { .. } => "timeout",
        }
    }
}

impl From<serde_json::Error> for EventError {
    fn from(err: serde_json::Error) -> Self {
        EventError::Serialization(err.to_string())
    }
}
