use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::OrderStatus;

/// Immutable audit record, written exactly once per successful cancellation.
/// A unique index on `order_id` makes the once-per-order guarantee hold even
/// under concurrent duplicate requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCancellation {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub reason: String,
    pub previous_status: OrderStatus,
    pub items_count: i64,
    pub units_restored: i64,
    pub cancelled_at: DateTime,
}
