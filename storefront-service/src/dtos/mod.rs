pub mod cart;
pub mod orders;

use mongodb::bson::DateTime;
use serde::Serialize;

/// Success envelope. Failures are rendered by `store_core::error::AppError`.
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success",
            message: None,
            data,
        }
    }

    pub fn success_with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            status: "success",
            message: Some(message.into()),
            data,
        }
    }
}

/// BSON timestamps leave the API as RFC 3339 strings.
pub fn rfc3339(dt: &DateTime) -> String {
    dt.try_to_rfc3339_string().unwrap_or_default()
}
