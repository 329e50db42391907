use serde::{Deserialize, Serialize};

use super::value_objects::{OrderId, OrderStatus};

// ============================================================================
// Order Commands - Represent caller intent
// ============================================================================

/// Body of a create request. The service always generates the order id; one
/// supplied by the caller is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    #[serde(default)]
    pub order_id: Option<String>,
}

#[derive(Debug, Clone)]
pub enum OrderCommand {
    CreateOrder(OrderRequest),
    ConfirmOrder { order_id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_id: OrderId,
    pub status: OrderStatus,
}
