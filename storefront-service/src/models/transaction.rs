use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Success,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// Both `COMPLETED` and `SUCCESS` mean money was captured; the upstream
    /// payment gateway reports either depending on the method used.
    pub fn is_paid(&self) -> bool {
        matches!(self, PaymentStatus::Completed | PaymentStatus::Success)
    }
}

/// Payment record, one-to-one with an order. The cancellation flow is the
/// only writer here (to `REFUNDED`); gateway webhooks live elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentTransaction {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount: f64,
    pub currency: String,
    pub status: PaymentStatus,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}
