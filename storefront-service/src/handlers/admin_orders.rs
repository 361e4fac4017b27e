//! Admin order-management endpoints. All routes here sit behind the
//! admin-role middleware.

use axum::{
    extract::{Query, State},
    Json,
};
use store_core::error::AppError;
use store_core::extract::Path;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::orders::{AdminOrderQuery, UpdateOrderStatusRequest};
use crate::dtos::ApiResponse;
use crate::AppState;

pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<AdminOrderQuery>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let data = state.orders.admin_list(&query).await?;
    Ok(Json(ApiResponse::success(data)))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let order = state.orders.admin_get(order_id).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// PATCH /admin/orders/:id/status
pub async fn update_status(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    payload.validate()?;

    tracing::info!(
        order_id = %order_id,
        status = %payload.status,
        "admin status update requested"
    );

    let order = state.orders.update_status(order_id, &payload).await?;

    Ok(Json(ApiResponse::success_with_message(
        "Order status updated",
        order,
    )))
}
