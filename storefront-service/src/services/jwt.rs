//! Session token service.
//!
//! Tokens are HS256 JWTs carried in a cookie. The storefront only needs to
//! verify tokens issued by the auth layer, but signing lives here too so the
//! test harness (and a future login endpoint) can mint sessions.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::models::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user id).
    pub sub: String,
    pub email: String,
    pub role: String,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issued at (Unix timestamp).
    pub iat: i64,
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_hours: i64,
}

impl JwtService {
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            expiry_hours: config.token_expiry_hours,
        }
    }

    pub fn issue(&self, user_id: Uuid, email: &str, role: Role) -> anyhow::Result<String> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            role: role.as_str().to_string(),
            exp: (now + Duration::hours(self.expiry_hours)).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to sign session token: {}", e))
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<SessionClaims> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| anyhow::anyhow!("Invalid session token: {}", e))?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;

    fn test_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: Secret::new("unit-test-secret".to_string()),
            token_cookie: "token".to_string(),
            token_expiry_hours: 1,
        }
    }

    #[test]
    fn issued_token_round_trips() {
        let jwt = JwtService::new(&test_config());
        let user_id = Uuid::new_v4();
        let token = jwt.issue(user_id, "a@b.com", Role::Admin).unwrap();
        let claims = jwt.verify(&token).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.role, "admin");
    }

    #[test]
    fn tampered_token_is_rejected() {
        let jwt = JwtService::new(&test_config());
        let token = jwt.issue(Uuid::new_v4(), "a@b.com", Role::User).unwrap();
        let mut tampered = token.clone();
        tampered.push('x');
        assert!(jwt.verify(&tampered).is_err());
    }
}
