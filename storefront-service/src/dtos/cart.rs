use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::rfc3339;
use crate::models::{CartItem, Product, WishlistItem};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddCartItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 99))]
    pub quantity: i64,
    pub size: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartItemRequest {
    #[validate(range(min = 1, max = 99))]
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddWishlistItemRequest {
    pub product_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub currency: String,
    pub inventory: i64,
}

impl From<&Product> for ProductSummary {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: product.price,
            currency: product.currency.clone(),
            inventory: product.inventory,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    pub id: Uuid,
    pub product: ProductSummary,
    pub quantity: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl CartItemView {
    pub fn new(item: &CartItem, product: &Product) -> Self {
        Self {
            id: item.id,
            product: ProductSummary::from(product),
            quantity: item.quantity,
            size: item.size.clone(),
            color: item.color.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItemView {
    pub product: ProductSummary,
    pub added_at: String,
}

impl WishlistItemView {
    pub fn new(item: &WishlistItem, product: &Product) -> Self {
        Self {
            product: ProductSummary::from(product),
            added_at: rfc3339(&item.created_at),
        }
    }
}
