use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::EventError;

// ============================================================================
// Order Value Objects
// ============================================================================

/// Lifecycle stage carried by every order event.
///
/// Variants are declared in lifecycle order, so `Ord` follows the
/// CREATED → CONFIRMED → SHIPPED → DELIVERED progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Created,
    Confirmed,
    Shipped,
    Delivered,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "CREATED",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "CREATED" => Some(OrderStatus::Created),
            "CONFIRMED" => Some(OrderStatus::Confirmed),
            "SHIPPED" => Some(OrderStatus::Shipped),
            "DELIVERED" => Some(OrderStatus::Delivered),
            _ => None,
        }
    }

    /// The stage that legally follows this one, if any
    pub fn next(&self) -> Option<Self> {
        match self {
            OrderStatus::Created => Some(OrderStatus::Confirmed),
            OrderStatus::Confirmed => Some(OrderStatus::Shipped),
            OrderStatus::Shipped => Some(OrderStatus::Delivered),
            OrderStatus::Delivered => None,
        }
    }

    /// Whether an order currently at `current` (None = never created) may move to `self`
    pub fn can_follow(&self, current: Option<OrderStatus>) -> bool {
        match current {
            None => *self == OrderStatus::Created,
            Some(status) => status.next() == Some(*self),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Correlation key shared by all events of one order. Opaque beyond equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Fresh short id: the first group of a random UUID (8 hex chars).
    /// No uniqueness check is made.
    pub fn generate() -> Self {
        let uuid = Uuid::new_v4().simple().to_string();
        Self(uuid[..8].to_string())
    }

    /// Accept any caller-supplied id that is not blank. The id is only ever
    /// compared for equality, so its characters carry no meaning.
    pub fn parse(value: &str) -> Result<Self, EventError> {
        if value.trim().is_empty() {
            return Err(EventError::MalformedCommand("orderId must not be blank".into()));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
