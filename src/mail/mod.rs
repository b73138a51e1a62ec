//! Mail module - composes invoice emails and hands them to a delivery channel.
//!
//! - `composer` - builds subject, text/HTML bodies and the PDF attachment
//! - `sendgrid` - transactional HTTP delivery channel

pub mod composer;
pub mod sendgrid;

pub use composer::{CustomEmailData, EmailComposer};
pub use sendgrid::SendGridChannel;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Provider rejected the message (status {status}): {message}")]
    Rejected { status: u16, message: String },
}

impl DeliveryError {
    /// Provider status code, when the provider answered at all.
    pub fn provider_status(&self) -> Option<u16> {
        match self {
            DeliveryError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sender {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailAttachment {
    /// Base64-encoded file body.
    pub content: String,
    pub filename: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub disposition: String,
}

/// Message handed to a delivery channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundEmail {
    pub to: String,
    pub from: Sender,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    pub subject: String,
    pub text: String,
    pub html: String,
    pub attachments: Vec<EmailAttachment>,
}

#[derive(Debug, Clone, Default)]
pub struct DeliveryReceipt {
    pub message_id: Option<String>,
}

#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<DeliveryReceipt, DeliveryError>;
    fn name(&self) -> &'static str;
}
