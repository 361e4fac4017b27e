//! Request/response shapes for the order endpoints.
//!
//! The wire format is camelCase; internal models stay snake_case.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::rfc3339;
use crate::models::{Order, OrderItem, ShippingAddress, StatusHistoryEntry, User};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusRequest {
    pub status: String,
    #[validate(length(max = 1000))]
    pub admin_notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderRequest {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[validate(nested)]
    pub shipping_address: ShippingAddressRequest,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddressRequest {
    #[validate(length(min = 1, max = 200))]
    pub full_name: String,
    #[validate(length(min = 1, max = 200))]
    pub line1: String,
    pub line2: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(min = 1, max = 100))]
    pub state: String,
    #[validate(length(min = 1, max = 20))]
    pub postal_code: String,
    #[validate(length(min = 1, max = 100))]
    pub country: String,
    pub phone: Option<String>,
}

impl From<ShippingAddressRequest> for ShippingAddress {
    fn from(req: ShippingAddressRequest) -> Self {
        ShippingAddress {
            full_name: req.full_name,
            line1: req.line1,
            line2: req.line2,
            city: req.city,
            state: req.state,
            postal_code: req.postal_code,
            country: req.country,
            phone: req.phone,
        }
    }
}

/// Query parameters of the admin order list.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrderQuery {
    pub status: Option<String>,
    pub date_range: Option<String>,
    pub search: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub limit: i64,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<&User> for CustomerSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemView {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub currency: String,
}

impl From<&OrderItem> for OrderItemView {
    fn from(item: &OrderItem) -> Self {
        Self {
            product_id: item.product_id,
            name: item.name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            currency: item.currency.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryView {
    pub status: String,
    pub note: String,
    pub timestamp: String,
}

impl From<&StatusHistoryEntry> for StatusHistoryView {
    fn from(entry: &StatusHistoryEntry) -> Self {
        Self {
            status: entry.status.as_str().to_string(),
            note: entry.note.clone(),
            timestamp: rfc3339(&entry.timestamp),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: Uuid,
    pub order_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<CustomerSummary>,
    pub items: Vec<OrderItemView>,
    pub total_amount: f64,
    pub currency: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    pub status_history: Vec<StatusHistoryView>,
    pub created_at: String,
    pub updated_at: String,
}

impl OrderView {
    pub fn from_order(order: &Order, customer: Option<&User>) -> Self {
        Self {
            id: order.id,
            order_number: order.display_number(),
            customer: customer.map(CustomerSummary::from),
            items: order.items.iter().map(OrderItemView::from).collect(),
            total_amount: order.total_amount,
            currency: order.currency.clone(),
            status: order.status.as_str().to_string(),
            cancellation_reason: order.cancellation_reason.clone(),
            admin_notes: order.admin_notes.clone(),
            status_history: order
                .status_history
                .iter()
                .map(StatusHistoryView::from)
                .collect(),
            created_at: rfc3339(&order.created_at),
            updated_at: rfc3339(&order.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListData {
    pub orders: Vec<OrderView>,
    pub pagination: Pagination,
}

/// Per-line inventory restoration detail in the cancellation response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoredItemView {
    pub product_id: Uuid,
    pub name: String,
    pub quantity_restored: i64,
    pub inventory: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundStatus {
    NotRequired,
    Pending,
    Processing,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationResponse {
    pub order_id: Uuid,
    pub order_number: String,
    pub previous_status: String,
    pub status: String,
    pub cancelled_at: String,
    pub reason: String,
    pub items: Vec<RestoredItemView>,
    pub units_restored: i64,
    pub refund_status: RefundStatus,
    pub refund_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_amount: Option<f64>,
}
