use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cart line, unique per (user, product, size, color). Adding the same
/// combination again merges quantities instead of creating a duplicate row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    pub size: Option<String>,
    pub color: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}
