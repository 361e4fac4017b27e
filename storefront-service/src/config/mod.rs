use anyhow::Result;
use dotenvy::dotenv;
use secrecy::Secret;
use serde::Deserialize;
use std::env;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub smtp: SmtpConfig,
    pub service_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub db_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: Secret<String>,
    /// Cookie the session token is read from.
    pub token_cookie: String,
    pub token_expiry_hours: i64,
}

#[derive(Deserialize, Clone, Debug)]
pub struct SmtpConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Secret<String>,
    pub from_email: String,
    pub from_name: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let host = env::var("STORE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("STORE_PORT")
            .unwrap_or_else(|_| "3005".to_string())
            .parse()?;

        let db_url = env::var("STORE_DATABASE_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        let db_name = env::var("STORE_DATABASE_NAME").unwrap_or_else(|_| "store_db".to_string());

        let jwt_secret = env::var("STORE_JWT_SECRET").unwrap_or_else(|_| "dev-secret".to_string());
        let token_cookie = env::var("STORE_TOKEN_COOKIE").unwrap_or_else(|_| "token".to_string());
        let token_expiry_hours = env::var("STORE_TOKEN_EXPIRY_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()
            .unwrap_or(24);

        let smtp_enabled = env::var("STORE_SMTP_ENABLED")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);
        let smtp_host = env::var("STORE_SMTP_HOST").unwrap_or_else(|_| "localhost".to_string());
        let smtp_port = env::var("STORE_SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse()
            .unwrap_or(587);
        let smtp_user = env::var("STORE_SMTP_USER").unwrap_or_default();
        let smtp_password = env::var("STORE_SMTP_PASSWORD").unwrap_or_default();
        let from_email =
            env::var("STORE_SMTP_FROM").unwrap_or_else(|_| "orders@store.local".to_string());
        let from_name =
            env::var("STORE_SMTP_FROM_NAME").unwrap_or_else(|_| "Storefront".to_string());

        Ok(Self {
            server: ServerConfig { host, port },
            database: DatabaseConfig {
                url: Secret::new(db_url),
                db_name,
            },
            auth: AuthConfig {
                jwt_secret: Secret::new(jwt_secret),
                token_cookie,
                token_expiry_hours,
            },
            smtp: SmtpConfig {
                enabled: smtp_enabled,
                host: smtp_host,
                port: smtp_port,
                user: smtp_user,
                password: Secret::new(smtp_password),
                from_email,
                from_name,
            },
            service_name: "storefront-service".to_string(),
        })
    }
}
