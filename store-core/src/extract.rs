//! Extractors that reject with the shared error envelope.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// `axum::extract::Path` with the rejection mapped onto [`AppError`], so a
/// malformed path parameter comes back as the standard fail envelope rather
/// than axum's plain-text response.
pub struct Path<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for Path<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Path::<T>::from_request_parts(parts, state).await {
            Ok(axum::extract::Path(value)) => Ok(Path(value)),
            Err(rejection) => Err(AppError::InvalidInput(anyhow::anyhow!(
                "{}",
                rejection.body_text()
            ))),
        }
    }
}
