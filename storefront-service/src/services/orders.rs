//! Order lifecycle manager.
//!
//! Owns the status state machine, the cancellation transaction, checkout,
//! and the admin order views. Everything that must be atomic runs inside a
//! single MongoDB session transaction; optional side effects (customer
//! notification, metrics) happen after commit and never fail the operation.

use chrono::{Datelike, Duration, NaiveTime, TimeZone, Utc};
use mongodb::bson::{doc, DateTime, Document};
use mongodb::ClientSession;
use std::sync::Arc;
use store_core::error::AppError;
use uuid::Uuid;

use crate::dtos::orders::{
    AdminOrderQuery, CancelOrderRequest, CancellationResponse, OrderListData, OrderView,
    Pagination, RefundStatus, RestoredItemView, UpdateOrderStatusRequest,
};
use crate::models::{
    Order, OrderCancellation, OrderItem, OrderStatus, ShippingAddress, StatusHistoryEntry, User,
};
use crate::services::metrics::{record_order_cancelled, record_order_placed};
use crate::services::notification::Notifier;
use crate::services::repository::{regex_escape, StoreRepository};

const DEFAULT_CANCELLATION_REASON: &str = "Customer request";
const DEFAULT_PAGE_LIMIT: i64 = 20;
const MAX_PAGE_LIMIT: i64 = 100;

#[derive(Clone)]
pub struct OrderService {
    repository: StoreRepository,
    notifier: Arc<dyn Notifier>,
}

impl OrderService {
    pub fn new(repository: StoreRepository, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            repository,
            notifier,
        }
    }

    // ==================== Admin status transition ====================

    /// Admin-driven status update. A cancelled order is immutable except for
    /// an idempotent re-cancel; this path never touches inventory or the
    /// cancellation audit trail (the customer cancellation endpoint does).
    pub async fn update_status(
        &self,
        order_id: Uuid,
        request: &UpdateOrderStatusRequest,
    ) -> Result<OrderView, AppError> {
        let status = OrderStatus::parse_admin(&request.status).ok_or_else(|| {
            AppError::InvalidInput(anyhow::anyhow!(
                "Invalid order status: {}",
                request.status
            ))
        })?;

        let order = self
            .repository
            .find_order(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Order not found")))?;

        if order.status == OrderStatus::Cancelled && status != OrderStatus::Cancelled {
            return Err(AppError::InvalidState(anyhow::anyhow!(
                "Cannot update a cancelled order"
            )));
        }

        let note = request
            .admin_notes
            .clone()
            .unwrap_or_else(|| format!("Status changed to {}", status));
        let entry = StatusHistoryEntry {
            status,
            note,
            timestamp: DateTime::now(),
        };

        // The write filter re-checks the cancelled guard, so the order read
        // above matching zero documents means a cancellation landed in
        // between, not that the order vanished.
        let matched = self
            .repository
            .update_order_status(order_id, status, request.admin_notes.as_deref(), &entry)
            .await?;
        if !matched {
            return Err(AppError::InvalidState(anyhow::anyhow!(
                "Cannot update a cancelled order"
            )));
        }

        let updated = self
            .repository
            .find_order(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Order not found")))?;
        let owner = self.repository.find_user(updated.user_id).await?;

        tracing::info!(
            order_id = %order_id,
            status = %status,
            "order status updated"
        );

        self.notify_status_change(owner.clone(), updated.display_number(), status);

        Ok(OrderView::from_order(&updated, owner.as_ref()))
    }

    // ==================== Customer cancellation ====================

    /// Customer-driven cancellation: status change, inventory restoration,
    /// refund bookkeeping, and the audit record as one all-or-nothing unit.
    pub async fn cancel_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        request: CancelOrderRequest,
    ) -> Result<CancellationResponse, AppError> {
        let reason = request
            .reason
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CANCELLATION_REASON.to_string());

        let mut session = self.repository.start_session().await?;
        session.start_transaction(None).await?;

        let result = self
            .cancel_order_in_session(user_id, order_id, &reason, &mut session)
            .await;

        match result {
            Ok(response) => {
                session.commit_transaction().await?;
                record_order_cancelled(&response.previous_status);
                tracing::info!(
                    order_id = %order_id,
                    user_id = %user_id,
                    units_restored = response.units_restored,
                    "order cancelled"
                );
                Ok(response)
            }
            Err(err) => {
                if let Err(abort_err) = session.abort_transaction().await {
                    tracing::warn!(error = %abort_err, "failed to abort cancellation transaction");
                }
                Err(err)
            }
        }
    }

    async fn cancel_order_in_session(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        reason: &str,
        session: &mut ClientSession,
    ) -> Result<CancellationResponse, AppError> {
        let order = self
            .repository
            .find_order_session(order_id, session)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Order not found")))?;

        if order.user_id != user_id {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "You do not have permission to cancel this order"
            )));
        }

        if let Some(message) = order.status.cancellation_rejection() {
            return Err(AppError::InvalidState(anyhow::anyhow!(message)));
        }

        let previous_status = order.status;
        let cancelled_at = DateTime::now();
        let entry = StatusHistoryEntry {
            status: OrderStatus::Cancelled,
            note: format!("Order cancelled: {}", reason),
            timestamp: cancelled_at,
        };

        // The status guard is inside the filter: a racing cancellation that
        // committed first makes this match zero documents.
        let marked = self
            .repository
            .mark_order_cancelled_session(order_id, reason, &entry, session)
            .await?;
        if !marked {
            return Err(AppError::InvalidState(anyhow::anyhow!(
                "This order can no longer be cancelled."
            )));
        }

        let mut restored_items = Vec::with_capacity(order.items.len());
        let mut units_restored: i64 = 0;
        for item in &order.items {
            let product = self
                .repository
                .restore_inventory_session(item.product_id, item.quantity, session)
                .await?
                .ok_or_else(|| {
                    AppError::InternalError(anyhow::anyhow!(
                        "Product {} missing during inventory restoration",
                        item.product_id
                    ))
                })?;
            units_restored += item.quantity;
            restored_items.push(RestoredItemView {
                product_id: item.product_id,
                name: item.name.clone(),
                quantity_restored: item.quantity,
                inventory: product.inventory,
            });
        }

        let transaction = self
            .repository
            .find_transaction_for_order_session(order_id, session)
            .await?;
        let (refund_status, refund_message, refund_amount) = match transaction {
            Some(t) if t.status.is_paid() => {
                self.repository
                    .mark_transaction_refunded_session(t.id, session)
                    .await?;
                (
                    RefundStatus::Processing,
                    format!(
                        "A refund of {:.2} {} has been initiated and will be returned to your original payment method.",
                        t.amount, t.currency
                    ),
                    Some(t.amount),
                )
            }
            Some(_) => (
                RefundStatus::Pending,
                "Payment was not completed for this order; any pending authorization will be released.".to_string(),
                None,
            ),
            None => (
                RefundStatus::NotRequired,
                "No payment was captured for this order; no refund is required.".to_string(),
                None,
            ),
        };

        let cancellation = OrderCancellation {
            id: Uuid::new_v4(),
            order_id,
            user_id,
            reason: reason.to_string(),
            previous_status,
            items_count: order.items.len() as i64,
            units_restored,
            cancelled_at,
        };
        self.repository
            .insert_cancellation_session(&cancellation, session)
            .await?;

        Ok(CancellationResponse {
            order_id,
            order_number: order.display_number(),
            previous_status: previous_status.as_str().to_string(),
            status: OrderStatus::Cancelled.as_str().to_string(),
            cancelled_at: crate::dtos::rfc3339(&cancelled_at),
            reason: reason.to_string(),
            items: restored_items,
            units_restored,
            refund_status,
            refund_message,
            refund_amount,
        })
    }

    // ==================== Checkout ====================

    /// Place an order from the user's cart. Inventory is taken with a
    /// guarded decrement per product; any shortfall rolls the whole
    /// checkout back.
    pub async fn checkout(
        &self,
        user_id: Uuid,
        address: ShippingAddress,
    ) -> Result<OrderView, AppError> {
        let cart = self.repository.cart_items_for_user(user_id).await?;
        if cart.is_empty() {
            return Err(AppError::InvalidInput(anyhow::anyhow!("Cart is empty")));
        }

        let mut session = self.repository.start_session().await?;
        session.start_transaction(None).await?;

        let result = self
            .checkout_in_session(user_id, address, &cart, &mut session)
            .await;

        match result {
            Ok(order) => {
                session.commit_transaction().await?;
                record_order_placed(&order.currency);
                tracing::info!(
                    order_id = %order.id,
                    user_id = %user_id,
                    total_amount = order.total_amount,
                    "order placed"
                );
                Ok(OrderView::from_order(&order, None))
            }
            Err(err) => {
                if let Err(abort_err) = session.abort_transaction().await {
                    tracing::warn!(error = %abort_err, "failed to abort checkout transaction");
                }
                Err(err)
            }
        }
    }

    async fn checkout_in_session(
        &self,
        user_id: Uuid,
        address: ShippingAddress,
        cart: &[crate::models::CartItem],
        session: &mut ClientSession,
    ) -> Result<Order, AppError> {
        let mut items = Vec::with_capacity(cart.len());
        let mut total = 0.0;
        let mut currency = "USD".to_string();

        for line in cart {
            let product = self
                .repository
                .reserve_inventory_session(line.product_id, line.quantity, session)
                .await?;
            let product = match product {
                Some(p) => p,
                None => {
                    let name = self
                        .repository
                        .find_product(line.product_id)
                        .await?
                        .map(|p| p.name)
                        .unwrap_or_else(|| line.product_id.to_string());
                    return Err(AppError::InvalidState(anyhow::anyhow!(
                        "Insufficient inventory for {}",
                        name
                    )));
                }
            };

            total += product.price * line.quantity as f64;
            currency = product.currency.clone();
            items.push(OrderItem {
                product_id: product.id,
                name: product.name,
                quantity: line.quantity,
                unit_price: product.price,
                currency: product.currency,
            });
        }

        let now = DateTime::now();
        let order = Order {
            id: Uuid::new_v4(),
            user_id,
            items,
            shipping_address: address,
            total_amount: total,
            currency,
            status: OrderStatus::Pending,
            cancellation_reason: None,
            admin_notes: None,
            status_history: vec![StatusHistoryEntry {
                status: OrderStatus::Pending,
                note: "Order placed".to_string(),
                timestamp: now,
            }],
            created_at: now,
            updated_at: now,
        };

        self.repository.insert_order_session(&order, session).await?;
        self.repository.clear_cart_session(user_id, session).await?;

        Ok(order)
    }

    // ==================== Customer views ====================

    pub async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<OrderView>, AppError> {
        let orders = self.repository.orders_for_user(user_id).await?;
        Ok(orders
            .iter()
            .map(|order| OrderView::from_order(order, None))
            .collect())
    }

    pub async fn order_for_user(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<OrderView, AppError> {
        let order = self
            .repository
            .find_order(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Order not found")))?;
        if order.user_id != user_id {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "You do not have permission to view this order"
            )));
        }
        Ok(OrderView::from_order(&order, None))
    }

    // ==================== Admin views ====================

    pub async fn admin_get(&self, order_id: Uuid) -> Result<OrderView, AppError> {
        let order = self
            .repository
            .find_order(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Order not found")))?;
        let owner = self.repository.find_user(order.user_id).await?;
        Ok(OrderView::from_order(&order, owner.as_ref()))
    }

    pub async fn admin_list(&self, query: &AdminOrderQuery) -> Result<OrderListData, AppError> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query
            .limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT);
        let skip = (page - 1) * limit as u64;

        let filter = self.build_admin_filter(query).await?;

        let total = self.repository.count_orders(filter.clone()).await?;
        let orders = self.repository.list_orders(filter, skip, limit).await?;

        let owner_ids: Vec<Uuid> = orders.iter().map(|o| o.user_id).collect();
        let owners = self.repository.users_by_ids(&owner_ids).await?;

        let views = orders
            .iter()
            .map(|order| OrderView::from_order(order, owners.get(&order.user_id)))
            .collect();

        let total_pages = (total + limit as u64 - 1) / limit as u64;
        Ok(OrderListData {
            orders: views,
            pagination: Pagination {
                page,
                limit,
                total,
                total_pages,
            },
        })
    }

    async fn build_admin_filter(&self, query: &AdminOrderQuery) -> Result<Document, AppError> {
        let mut filter = doc! {};

        if let Some(status) = query.status.as_deref() {
            let status = OrderStatus::parse(status).ok_or_else(|| {
                AppError::InvalidInput(anyhow::anyhow!("Invalid order status: {}", status))
            })?;
            filter.insert("status", status.as_str());
        }

        if let Some(range) = query.date_range.as_deref() {
            let range = DateRange::parse(range).ok_or_else(|| {
                AppError::InvalidInput(anyhow::anyhow!("Unknown date range: {}", range))
            })?;
            if let Some((start, end)) = range.bounds(Utc::now()) {
                let mut created = doc! { "$gte": DateTime::from_chrono(start) };
                if let Some(end) = end {
                    created.insert("$lt", DateTime::from_chrono(end));
                }
                filter.insert("created_at", created);
            }
        }

        if let Some(term) = query.search.as_deref().filter(|t| !t.trim().is_empty()) {
            let matching_users = self.repository.user_ids_matching_email(term).await?;
            filter.insert(
                "$or",
                vec![
                    doc! { "_id": { "$regex": regex_escape(term), "$options": "i" } },
                    doc! { "user_id": { "$in": matching_users } },
                ],
            );
        }

        Ok(filter)
    }

    // ==================== Notification ====================

    /// Fire-and-forget; a delivery failure is logged and swallowed.
    fn notify_status_change(&self, owner: Option<User>, order_number: String, status: OrderStatus) {
        let Some(owner) = owner else {
            return;
        };
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            let subject = format!("Your order {} was updated", order_number);
            let body = format!(
                "Hi {},\n\nYour order {} is now {}.\n",
                owner.name, order_number, status
            );
            if let Err(e) = notifier.send(&owner.email, &subject, &body).await {
                tracing::warn!(
                    error = %e,
                    email = %owner.email,
                    "failed to send status notification"
                );
            }
        });
    }
}

/// Date-range presets of the admin order list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRange {
    Today,
    Yesterday,
    Last7Days,
    Last30Days,
    ThisMonth,
    LastMonth,
    All,
}

impl DateRange {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "TODAY" => Some(DateRange::Today),
            "YESTERDAY" => Some(DateRange::Yesterday),
            "LAST_7_DAYS" => Some(DateRange::Last7Days),
            "LAST_30_DAYS" => Some(DateRange::Last30Days),
            "THIS_MONTH" => Some(DateRange::ThisMonth),
            "LAST_MONTH" => Some(DateRange::LastMonth),
            "ALL" => Some(DateRange::All),
            _ => None,
        }
    }

    /// Half-open `[start, end)` bounds in UTC; `None` means unbounded.
    pub fn bounds(
        &self,
        now: chrono::DateTime<Utc>,
    ) -> Option<(chrono::DateTime<Utc>, Option<chrono::DateTime<Utc>>)> {
        let today = now.date_naive();
        let start_of = |d: chrono::NaiveDate| Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN));

        match self {
            DateRange::Today => Some((start_of(today), None)),
            DateRange::Yesterday => {
                let yesterday = today - Duration::days(1);
                Some((start_of(yesterday), Some(start_of(today))))
            }
            DateRange::Last7Days => Some((now - Duration::days(7), None)),
            DateRange::Last30Days => Some((now - Duration::days(30), None)),
            DateRange::ThisMonth => {
                let first = today.with_day(1).unwrap_or(today);
                Some((start_of(first), None))
            }
            DateRange::LastMonth => {
                let first_this = today.with_day(1).unwrap_or(today);
                let last_prev = first_this.pred_opt().unwrap_or(first_this);
                let first_prev = last_prev.with_day(1).unwrap_or(last_prev);
                Some((start_of(first_prev), Some(start_of(first_this))))
            }
            DateRange::All => None,
        }
    }
}
