use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wishlist entry, unique per (user, product).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WishlistItem {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub created_at: DateTime,
}
