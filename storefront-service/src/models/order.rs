//! Order document and its status state machine.

use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle states of an order.
///
/// The admin status endpoint only accepts the first five; `Returned` and
/// `Completed` exist so the cancellation eligibility check can recognize
/// orders that already left the normal flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
    Completed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Returned => "RETURNED",
            OrderStatus::Completed => "COMPLETED",
        }
    }

    /// Parse a status supplied through the admin API. Only the five
    /// admin-settable values are recognized.
    pub fn parse_admin(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(OrderStatus::Pending),
            "PROCESSING" => Some(OrderStatus::Processing),
            "SHIPPED" => Some(OrderStatus::Shipped),
            "DELIVERED" => Some(OrderStatus::Delivered),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// Parse any stored status value, for filtering.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "RETURNED" => Some(OrderStatus::Returned),
            "COMPLETED" => Some(OrderStatus::Completed),
            other => OrderStatus::parse_admin(other),
        }
    }

    /// Whether a customer may still cancel an order in this state.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Processing)
    }

    /// Status-specific rejection message for a cancellation attempt, or
    /// `None` when cancellation is allowed.
    pub fn cancellation_rejection(&self) -> Option<&'static str> {
        match self {
            OrderStatus::Pending | OrderStatus::Processing => None,
            OrderStatus::Shipped => Some(
                "This order has already been shipped. Please contact support to arrange a return.",
            ),
            OrderStatus::Delivered => Some(
                "This order has been delivered. Please request a return within the return window instead.",
            ),
            OrderStatus::Cancelled => Some("This order has already been cancelled."),
            OrderStatus::Returned => {
                Some("This order has already been returned and cannot be cancelled.")
            }
            OrderStatus::Completed => {
                Some("This order is already completed and cannot be cancelled.")
            }
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of an order. Name and unit price are captured at order time and
/// deliberately decoupled from the live product document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub currency: String,
}

/// Shipping destination snapshotted into the order at checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub phone: Option<String>,
}

/// Append-only status audit trail entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub status: OrderStatus,
    pub note: String,
    pub timestamp: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub total_amount: f64,
    pub currency: String,
    pub status: OrderStatus,
    pub cancellation_reason: Option<String>,
    pub admin_notes: Option<String>,
    pub status_history: Vec<StatusHistoryEntry>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Order {
    /// Human-readable order number: `ORD-` plus the last eight characters of
    /// the id, upper-cased.
    pub fn display_number(&self) -> String {
        display_number(&self.id)
    }

    pub fn units_total(&self) -> i64 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

pub fn display_number(id: &Uuid) -> String {
    let id = id.to_string();
    let suffix = &id[id.len().saturating_sub(8)..];
    format!("ORD-{}", suffix.to_uppercase())
}
