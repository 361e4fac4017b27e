//! Cart endpoints: ownership-checked CRUD over the caller's cart lines.

use axum::{extract::State, http::StatusCode, Json};
use store_core::error::AppError;
use store_core::extract::Path;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::cart::{AddCartItemRequest, CartItemView, CartView, UpdateCartItemRequest};
use crate::dtos::ApiResponse;
use crate::middleware::AuthUser;
use crate::AppState;

pub async fn get_cart(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let items = state.repository.cart_items_for_user(caller.user_id).await?;

    let mut views = Vec::with_capacity(items.len());
    let mut subtotal = 0.0;
    for item in &items {
        // Lines whose product has been removed from the catalog are skipped
        // rather than failing the whole cart.
        if let Some(product) = state.repository.find_product(item.product_id).await? {
            subtotal += product.price * item.quantity as f64;
            views.push(CartItemView::new(item, &product));
        }
    }

    Ok(Json(ApiResponse::success(CartView {
        items: views,
        subtotal,
    })))
}

pub async fn add_item(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(payload): Json<AddCartItemRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    payload.validate()?;

    state
        .repository
        .find_product(payload.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Product not found")))?;

    state
        .repository
        .upsert_cart_item(
            caller.user_id,
            payload.product_id,
            payload.quantity,
            payload.size.as_deref(),
            payload.color.as_deref(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message("Item added to cart", ())),
    ))
}

pub async fn update_item(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<UpdateCartItemRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    payload.validate()?;

    let item = state
        .repository
        .find_cart_item(item_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Cart item not found")))?;
    if item.user_id != caller.user_id {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "You do not have permission to modify this cart item"
        )));
    }

    state
        .repository
        .set_cart_item_quantity(item_id, payload.quantity)
        .await?;

    Ok(Json(ApiResponse::success_with_message("Cart item updated", ())))
}

pub async fn remove_item(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(item_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let item = state
        .repository
        .find_cart_item(item_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Cart item not found")))?;
    if item.user_id != caller.user_id {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "You do not have permission to modify this cart item"
        )));
    }

    state.repository.delete_cart_item(item_id).await?;

    Ok(Json(ApiResponse::success_with_message(
        "Item removed from cart",
        (),
    )))
}

pub async fn clear_cart(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<impl axum::response::IntoResponse, AppError> {
    state.repository.clear_cart(caller.user_id).await?;
    Ok(Json(ApiResponse::success_with_message("Cart cleared", ())))
}
