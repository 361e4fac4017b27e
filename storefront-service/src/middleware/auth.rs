//! Cookie-session authentication.
//!
//! Every protected route goes through `auth_middleware`, which verifies the
//! JWT in the session cookie and stores an `AuthContext` in the request
//! extensions. Admin routes stack `require_admin` on top.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use store_core::error::AppError;
use uuid::Uuid;

use crate::models::Role;
use crate::AppState;

#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = jar
        .get(&state.config.auth.token_cookie)
        .map(|cookie| cookie.value().to_string())
        .ok_or_else(|| AppError::Unauthenticated(anyhow::anyhow!("Missing session token")))?;

    let claims = state
        .jwt
        .verify(&token)
        .map_err(|_| AppError::Unauthenticated(anyhow::anyhow!("Invalid or expired session token")))?;

    let user_id: Uuid = claims
        .sub
        .parse()
        .map_err(|_| AppError::Unauthenticated(anyhow::anyhow!("Invalid session token")))?;
    let role = Role::parse(&claims.role)
        .ok_or_else(|| AppError::Unauthenticated(anyhow::anyhow!("Invalid session token")))?;

    req.extensions_mut().insert(AuthContext {
        user_id,
        email: claims.email,
        role,
    });

    Ok(next.run(req).await)
}

/// Gate for the admin surface; runs after `auth_middleware`.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    let context = req
        .extensions()
        .get::<AuthContext>()
        .ok_or_else(|| AppError::Unauthenticated(anyhow::anyhow!("Missing session token")))?;

    if context.role != Role::Admin {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Admin access required"
        )));
    }

    Ok(next.run(req).await)
}

/// Extractor handing the authenticated caller to handlers.
pub struct AuthUser(pub AuthContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let context = parts.extensions.get::<AuthContext>().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Auth context missing from request extensions"
            ))
        })?;
        Ok(AuthUser(context.clone()))
    }
}
