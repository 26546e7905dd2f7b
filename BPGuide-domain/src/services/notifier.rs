use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from delivering a message
#[derive(Debug, Error)]
pub enum NotifierError {
    /// The relay could not be reached
    #[error("Mail transport error: {0}")]
    Transport(String),

    /// The relay answered with a non-success status
    #[error("Mail relay rejected the message with status {status}")]
    Rejected { status: u16 },

    /// The message cannot be sent as built
    #[error("Invalid message: {0}")]
    InvalidMessage(String),
}

/// A binary attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// A formatted email ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
    pub attachment: Option<EmailAttachment>,
}

/// Delivers report emails
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send one message; failures are reported, never retried
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifierError>;

    /// Short name for health output
    fn kind(&self) -> &'static str;
}

/// Logs messages instead of sending them
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifierError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            attachment = message.attachment.is_some(),
            "No mail relay configured, report logged instead of sent"
        );
        debug!("Report body:\n{}", message.text);
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "log"
    }
}

#[derive(Debug, Serialize)]
struct RelayAttachment<'a> {
    filename: &'a str,
    content_type: &'a str,
    /// Base64 encoded
    content: String,
}

#[derive(Debug, Serialize)]
struct RelayPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
    html: &'a str,
    attachments: Vec<RelayAttachment<'a>>,
}

/// Posts messages as JSON to an HTTP mail relay
#[derive(Debug, Clone)]
pub struct HttpMailNotifier {
    http: Client,
    relay_url: String,
    token: Option<String>,
    from: String,
}

impl HttpMailNotifier {
    pub fn new(
        relay_url: impl Into<String>,
        token: Option<String>,
        from: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NotifierError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifierError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            relay_url: relay_url.into(),
            token,
            from: from.into(),
        })
    }

    fn payload<'a>(&'a self, message: &'a EmailMessage) -> RelayPayload<'a> {
        RelayPayload {
            from: &self.from,
            to: &message.to,
            subject: &message.subject,
            text: &message.text,
            html: &message.html,
            attachments: message
                .attachment
                .iter()
                .map(|attachment| RelayAttachment {
                    filename: &attachment.filename,
                    content_type: &attachment.content_type,
                    content: STANDARD.encode(&attachment.data),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl Notifier for HttpMailNotifier {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifierError> {
        let mut request = self.http.post(&self.relay_url).json(&self.payload(message));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NotifierError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Mail relay answered {} for {}", status, message.to);
            return Err(NotifierError::Rejected {
                status: status.as_u16(),
            });
        }

        info!("Report sent to {}", message.to);
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "http-relay"
    }
}
