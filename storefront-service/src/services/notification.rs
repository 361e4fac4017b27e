//! Customer notification port.
//!
//! Order flows treat notification as an optional side effect: they spawn the
//! send and move on, and a delivery failure is logged rather than propagated.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use secrecy::ExposeSecret;
use std::sync::Arc;
use thiserror::Error;

use crate::config::SmtpConfig;

#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Send failed: {0}")]
    SendFailed(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifierError>;
}

/// SMTP-backed notifier.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self, NotifierError> {
        let creds = Credentials::new(
            config.user.clone(),
            config.password.expose_secret().clone(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| NotifierError::Configuration(format!("Failed to create SMTP relay: {}", e)))?
            .port(config.port)
            .credentials(creds)
            .build();

        let from: Mailbox = format!("{} <{}>", config.from_name, config.from_email)
            .parse()
            .map_err(|e| NotifierError::Configuration(format!("Invalid from address: {}", e)))?;

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifierError> {
        let to_mailbox: Mailbox = to
            .parse()
            .map_err(|e| NotifierError::SendFailed(format!("Invalid recipient: {}", e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| NotifierError::SendFailed(format!("Failed to build message: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotifierError::SendFailed(e.to_string()))?;

        Ok(())
    }
}

/// Notifier used when SMTP is disabled. Logs and succeeds.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), NotifierError> {
        tracing::debug!(to, subject, "notifications disabled, skipping send");
        Ok(())
    }
}

/// Build the notifier the configuration asks for.
pub fn from_config(config: &SmtpConfig) -> Result<Arc<dyn Notifier>, NotifierError> {
    if config.enabled {
        Ok(Arc::new(SmtpNotifier::new(config)?))
    } else {
        Ok(Arc::new(NoopNotifier))
    }
}
