//! Customer-facing order endpoints.

use axum::{extract::State, http::StatusCode, Json};
use store_core::error::AppError;
use store_core::extract::Path;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::orders::{CancelOrderRequest, CheckoutRequest};
use crate::dtos::ApiResponse;
use crate::middleware::AuthUser;
use crate::AppState;

pub async fn list_my_orders(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let orders = state.orders.orders_for_user(caller.user_id).await?;
    Ok(Json(ApiResponse::success(orders)))
}

pub async fn get_my_order(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let order = state
        .orders
        .order_for_user(caller.user_id, order_id)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn checkout(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(payload): Json<CheckoutRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    payload.validate()?;

    tracing::info!(user_id = %caller.user_id, "checkout requested");

    let order = state
        .orders
        .checkout(caller.user_id, payload.shipping_address.into())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message("Order placed", order)),
    ))
}

/// DELETE /orders/:id — the customer cancellation flow.
pub async fn cancel_order(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(order_id): Path<Uuid>,
    payload: Option<Json<CancelOrderRequest>>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let request = payload.map(|Json(p)| p).unwrap_or_default();
    request.validate()?;

    tracing::info!(
        order_id = %order_id,
        user_id = %caller.user_id,
        "cancellation requested"
    );

    let summary = state
        .orders
        .cancel_order(caller.user_id, order_id, request)
        .await?;

    Ok(Json(ApiResponse::success_with_message(
        "Order cancelled",
        summary,
    )))
}
