use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{DeliveryChannel, DeliveryError, DeliveryReceipt, OutboundEmail};

const SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// SendGrid v3 `mail/send` delivery channel.
pub struct SendGridChannel {
    api_key: String,
    endpoint: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct SgAddress<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct SgPersonalization<'a> {
    to: Vec<SgAddress<'a>>,
}

#[derive(Debug, Serialize)]
struct SgContent<'a> {
    #[serde(rename = "type")]
    content_type: &'a str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct SgAttachment<'a> {
    content: &'a str,
    filename: &'a str,
    #[serde(rename = "type")]
    content_type: &'a str,
    disposition: &'a str,
}

#[derive(Debug, Serialize)]
struct SgRequest<'a> {
    personalizations: Vec<SgPersonalization<'a>>,
    from: SgAddress<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<SgAddress<'a>>,
    subject: &'a str,
    content: Vec<SgContent<'a>>,
    attachments: Vec<SgAttachment<'a>>,
}

#[derive(Debug, Deserialize)]
struct SgErrorBody {
    #[serde(default)]
    errors: Vec<SgErrorItem>,
}

#[derive(Debug, Deserialize)]
struct SgErrorItem {
    message: Option<String>,
}

fn build_request(email: &OutboundEmail) -> SgRequest<'_> {
    SgRequest {
        personalizations: vec![SgPersonalization {
            to: vec![SgAddress {
                email: &email.to,
                name: None,
            }],
        }],
        from: SgAddress {
            email: &email.from.email,
            name: Some(email.from.name.as_str()).filter(|n| !n.is_empty()),
        },
        reply_to: email.reply_to.as_deref().map(|addr| SgAddress {
            email: addr,
            name: None,
        }),
        subject: &email.subject,
        content: vec![
            SgContent {
                content_type: "text/plain",
                value: &email.text,
            },
            SgContent {
                content_type: "text/html",
                value: &email.html,
            },
        ],
        attachments: email
            .attachments
            .iter()
            .map(|a| SgAttachment {
                content: &a.content,
                filename: &a.filename,
                content_type: &a.content_type,
                disposition: &a.disposition,
            })
            .collect(),
    }
}

/// Joined `errors[].message` entries, or the raw body when it is not the documented shape.
fn error_message(body: &str) -> String {
    let messages: Vec<String> = serde_json::from_str::<SgErrorBody>(body)
        .map(|parsed| parsed.errors.into_iter().filter_map(|e| e.message).collect())
        .unwrap_or_default();

    if messages.is_empty() {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            "empty response body".to_string()
        } else {
            trimmed.to_string()
        }
    } else {
        messages.join("; ")
    }
}

impl SendGridChannel {
    pub fn new(api_key: impl Into<String>, client: Client) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: SENDGRID_API_URL.to_string(),
            client,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl DeliveryChannel for SendGridChannel {
    async fn send(&self, email: &OutboundEmail) -> Result<DeliveryReceipt, DeliveryError> {
        if self.api_key.trim().is_empty() {
            return Err(DeliveryError::Configuration(
                "SendGrid API key is not configured".to_string(),
            ));
        }
        if email.to.trim().is_empty() {
            return Err(DeliveryError::Configuration(
                "recipient has no email address".to_string(),
            ));
        }

        let request = build_request(email);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| DeliveryError::Connection(format!("Failed to reach SendGrid: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let message_id = response
            .headers()
            .get("x-message-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        log::info!(
            "Email sent via SendGrid to {} (message id {:?})",
            email.to,
            message_id
        );

        Ok(DeliveryReceipt { message_id })
    }

    fn name(&self) -> &'static str {
        "sendgrid"
    }
}
