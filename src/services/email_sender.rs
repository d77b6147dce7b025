//! Outbound email delivery behind a trait so the import pipeline can be
//! exercised without touching a real provider.

use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use tracing::info;

/// A rendered message ready for delivery.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Logs messages instead of sending them. Default for local development.
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(to = %message.to, subject = %message.subject, "email (log only)");
        info!("{}", message.text);
        Ok(())
    }
}

/// Records messages for assertions in tests.
pub struct FakeEmailSender {
    sent: Mutex<Vec<EmailMessage>>,
}

impl FakeEmailSender {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent_messages(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last_message(&self) -> Option<EmailMessage> {
        self.sent.lock().unwrap().last().cloned()
    }
}

impl Default for FakeEmailSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmailSender for FakeEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Sends through the Resend HTTP API.
pub struct ResendEmailSender {
    client: reqwest::Client,
    api_key: String,
    from_address: String,
}

impl ResendEmailSender {
    pub fn new(api_key: String, from_address: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            from_address,
        }
    }

    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("RESEND_API_KEY").context("RESEND_API_KEY must be set")?;
        let from_address = std::env::var("EMAIL_FROM_ADDRESS")
            .unwrap_or_else(|_| "noreply@rosterline.io".to_string());
        Ok(Self::new(api_key, from_address))
    }
}

#[async_trait]
impl EmailSender for ResendEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let response = self
            .client
            .post("https://api.resend.com/emails")
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from_address,
                "to": [message.to],
                "subject": message.subject,
                "html": message.html,
                "text": message.text,
            }))
            .send()
            .await
            .context("failed to reach resend")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("resend rejected email: {} {}", status, body);
        }

        info!(to = %message.to, subject = %message.subject, "email sent via resend");
        Ok(())
    }
}

/// Picks the sender from the environment: Resend when an API key is
/// configured, otherwise log-only.
pub fn create_email_sender() -> Result<std::sync::Arc<dyn EmailSender>> {
    if std::env::var("RESEND_API_KEY").is_ok() {
        Ok(std::sync::Arc::new(ResendEmailSender::from_env()?))
    } else {
        info!("RESEND_API_KEY not set, emails will be logged only");
        Ok(std::sync::Arc::new(LogEmailSender))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EmailMessage {
        EmailMessage {
            to: "ana@example.com".to_string(),
            subject: "Hello".to_string(),
            html: "<p>Hi</p>".to_string(),
            text: "Hi".to_string(),
        }
    }

    #[tokio::test]
    async fn fake_sender_records_messages() {
        let sender = FakeEmailSender::new();
        sender.send(&sample()).await.unwrap();
        sender.send(&sample()).await.unwrap();

        assert_eq!(sender.sent_messages().len(), 2);
        assert_eq!(sender.last_message().unwrap().to, "ana@example.com");
    }

    #[tokio::test]
    async fn log_sender_always_succeeds() {
        assert!(LogEmailSender.send(&sample()).await.is_ok());
    }
}
