//! Wishlist endpoints.

use axum::{extract::State, http::StatusCode, Json};
use mongodb::bson::DateTime;
use store_core::error::AppError;
use store_core::extract::Path;
use uuid::Uuid;

use crate::dtos::cart::{AddWishlistItemRequest, WishlistItemView};
use crate::dtos::ApiResponse;
use crate::middleware::AuthUser;
use crate::models::WishlistItem;
use crate::AppState;

pub async fn get_wishlist(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let items = state.repository.wishlist_for_user(caller.user_id).await?;

    let mut views = Vec::with_capacity(items.len());
    for item in &items {
        if let Some(product) = state.repository.find_product(item.product_id).await? {
            views.push(WishlistItemView::new(item, &product));
        }
    }

    Ok(Json(ApiResponse::success(views)))
}

pub async fn add_item(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(payload): Json<AddWishlistItemRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    state
        .repository
        .find_product(payload.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Product not found")))?;

    let item = WishlistItem {
        id: Uuid::new_v4(),
        user_id: caller.user_id,
        product_id: payload.product_id,
        created_at: DateTime::now(),
    };

    // Unique (user, product) index turns a duplicate add into 409.
    state
        .repository
        .insert_wishlist_item(&item)
        .await
        .map_err(|err| match err {
            AppError::Conflict(_) => {
                AppError::Conflict(anyhow::anyhow!("Product is already on your wishlist"))
            }
            other => other,
        })?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(
            "Product added to wishlist",
            (),
        )),
    ))
}

pub async fn remove_item(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(product_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let removed = state
        .repository
        .delete_wishlist_item(caller.user_id, product_id)
        .await?;
    if !removed {
        return Err(AppError::NotFound(anyhow::anyhow!(
            "Product is not on your wishlist"
        )));
    }

    Ok(Json(ApiResponse::success_with_message(
        "Product removed from wishlist",
        (),
    )))
}
