use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Catalog entry. `inventory` must never go negative: checkout decrements it
/// behind an `inventory >= quantity` guard and cancellation restores it with
/// an atomic `$inc`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub currency: String,
    pub category: String,
    pub inventory: i64,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Product {
    pub fn new(name: &str, price: f64, category: &str, inventory: i64) -> Self {
        let now = DateTime::now();
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: String::new(),
            price,
            currency: "USD".to_string(),
            category: category.to_string(),
            inventory,
            created_at: now,
            updated_at: now,
        }
    }
}
