//! Invoice delivery pipeline.
//!
//! One call runs the stages strictly in order:
//! validating → aggregating → rendering_primary → rendering_fallback →
//! composing → dispatching → updating_status → done.
//! Any stage may end the run in `error`; every transition is logged.

use actix_web::http::StatusCode;
use chrono::NaiveDate;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use super::models::{DeliveryInfo, FailureResponse, SendInvoiceRequest, SendInvoiceResponse};
use crate::config::AppConfig;
use crate::db::{InvoiceStore, StoreError};
use crate::document::{InvoiceLayout, RenderDispatcher, RenderError, RenderMethod, RenderOutcome};
use crate::invoice::{
    resolve_amount_with_source, AmountSource, Client, CompanyProfile, Invoice, InvoiceStatus, Service, User,
};
use crate::mail::{DeliveryChannel, DeliveryError, EmailComposer};
use crate::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Validating,
    Aggregating,
    RenderingPrimary,
    RenderingFallback,
    Composing,
    Dispatching,
    UpdatingStatus,
    Done,
    Error,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Validating => "validating",
            PipelineStage::Aggregating => "aggregating",
            PipelineStage::RenderingPrimary => "rendering_primary",
            PipelineStage::RenderingFallback => "rendering_fallback",
            PipelineStage::Composing => "composing",
            PipelineStage::Dispatching => "dispatching",
            PipelineStage::UpdatingStatus => "updating_status",
            PipelineStage::Done => "done",
            PipelineStage::Error => "error",
        };
        f.write_str(name)
    }
}

const CREDENTIALS_HINT: &str =
    "Check the SendGrid API key and that the sender address is a verified sender identity.";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Missing configuration: {}", .0.join(", "))]
    Configuration(Vec<&'static str>),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Data store error: {0}")]
    Store(#[from] StoreError),

    #[error("PDF generation failed: {0}")]
    Render(#[from] RenderError),

    #[error("Email delivery failed: {0}")]
    Delivery(#[from] DeliveryError),
}

impl PipelineError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
            PipelineError::NotFound(_) => StatusCode::NOT_FOUND,
            PipelineError::Configuration(_)
            | PipelineError::Store(_)
            | PipelineError::Render(_)
            | PipelineError::Delivery(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error name used in response bodies.
    pub fn error_name(&self) -> &'static str {
        match self {
            PipelineError::Configuration(_) => "ConfigurationError",
            PipelineError::Validation(_) => "ValidationError",
            PipelineError::NotFound(_) => "NotFound",
            PipelineError::Store(_) => "DataStoreError",
            PipelineError::Render(_) => "PdfGenerationFailed",
            PipelineError::Delivery(_) => "EmailDeliveryFailed",
        }
    }

    pub fn to_failure(&self) -> FailureResponse {
        let (details, hint) = match self {
            PipelineError::Configuration(missing) => (
                Some(json!({ "missing": missing })),
                Some("Set the missing environment variables and restart the service.".to_string()),
            ),
            PipelineError::Render(RenderError::Combined { primary, fallback }) => (
                Some(json!({ "primaryError": primary, "fallbackError": fallback })),
                None,
            ),
            PipelineError::Delivery(err) => (
                Some(json!({ "providerStatus": err.provider_status(), "providerMessage": err.to_string() })),
                Some(CREDENTIALS_HINT.to_string()),
            ),
            PipelineError::Store(err) => (Some(json!({ "cause": err.to_string() })), None),
            _ => (None, None),
        };

        FailureResponse {
            success: false,
            error: self.error_name().to_string(),
            message: self.to_string(),
            details,
            hint,
        }
    }
}

/// Everything gathered for one invoice before rendering.
#[derive(Debug, Clone)]
pub struct PreparedInvoice {
    pub invoice: Invoice,
    pub user: User,
    pub client: Client,
    pub services: Vec<Service>,
    pub profile: CompanyProfile,
    pub amount: f64,
    pub amount_source: AmountSource,
    pub layout: InvoiceLayout,
}

#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub invoice_number: String,
    pub method: RenderMethod,
    pub message_id: Option<String>,
    pub recipient: String,
    pub amount: f64,
    pub degraded: bool,
    pub primary_error: Option<String>,
    pub status_updated: bool,
    pub pdf_bytes: usize,
}

impl From<DeliveryOutcome> for SendInvoiceResponse {
    fn from(outcome: DeliveryOutcome) -> Self {
        let message = if outcome.degraded {
            format!(
                "Facture {} envoyée à {} (PDF généré en mode dégradé)",
                outcome.invoice_number, outcome.recipient
            )
        } else {
            format!("Facture {} envoyée à {}", outcome.invoice_number, outcome.recipient)
        };

        SendInvoiceResponse {
            success: true,
            message,
            email_status: "sent".to_string(),
            pdf_method: outcome.method,
            info: DeliveryInfo {
                message_id: outcome.message_id,
                recipient: outcome.recipient,
                amount: outcome.amount,
                degraded: outcome.degraded,
                primary_error: outcome.primary_error,
                status_updated: outcome.status_updated,
            },
        }
    }
}

/// Fill blank issuer fields from the owning user so documents never lose the sender identity.
fn resolve_profile(user: &User, requested: Option<&CompanyProfile>) -> CompanyProfile {
    let mut profile = requested
        .cloned()
        .or_else(|| user.company_settings.clone())
        .unwrap_or_default();

    if profile.owner_name.trim().is_empty() {
        profile.owner_name = user.full_name();
    }
    if profile.company_name.trim().is_empty() {
        profile.company_name = profile.owner_name.clone();
    }
    if profile.email.trim().is_empty() {
        profile.email = user.email.clone().unwrap_or_default();
    }
    profile
}

pub struct DeliveryOrchestrator {
    config: AppConfig,
    store: Arc<dyn InvoiceStore>,
    channel: Arc<dyn DeliveryChannel>,
    dispatcher: RenderDispatcher,
    composer: EmailComposer,
}

impl DeliveryOrchestrator {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn InvoiceStore>,
        channel: Arc<dyn DeliveryChannel>,
        dispatcher: RenderDispatcher,
        composer: EmailComposer,
    ) -> Self {
        Self {
            config,
            store,
            channel,
            dispatcher,
            composer,
        }
    }

    fn enter(&self, stage: PipelineStage, invoice_id: &str) {
        log::info!("[{}] invoice {}", stage, invoice_id);
    }

    fn fail(&self, stage: PipelineStage, invoice_id: &str, err: PipelineError) -> PipelineError {
        log::error!(
            "[{}] invoice {} failed during {}: {}",
            PipelineStage::Error,
            invoice_id,
            stage,
            err
        );
        err
    }

    /// Credential check for read-only operations (preview, download).
    fn check_store_config(&self) -> Result<(), PipelineError> {
        let missing: Vec<&'static str> = self
            .config
            .missing_credentials()
            .into_iter()
            .filter(|name| name.starts_with("SUPABASE"))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::Configuration(missing))
        }
    }

    /// Fetch records, pick the service list, resolve the amount once and build the layout.
    pub async fn prepare(
        &self,
        invoice_id: &str,
        requested_profile: Option<&CompanyProfile>,
        requested_services: Option<&[Service]>,
    ) -> Result<PreparedInvoice, PipelineError> {
        let invoice_id = invoice_id.trim();
        if invoice_id.is_empty() {
            return Err(PipelineError::Validation("invoiceId is required".to_string()));
        }

        let mut invoice = self
            .store
            .fetch_invoice(invoice_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("Invoice {} not found", invoice_id)))?;

        let user = self
            .store
            .fetch_user(&invoice.user_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("User {} not found", invoice.user_id)))?;

        let client = self
            .store
            .fetch_client(&invoice.client_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("Client {} not found", invoice.client_id)))?;

        let mut client_services = Vec::new();
        let services = match requested_services.filter(|s| !s.is_empty()) {
            Some(requested) => {
                invoice.services = requested.to_vec();
                invoice.services.clone()
            }
            None if !invoice.services.is_empty() => invoice.services.clone(),
            None => {
                client_services = self.store.fetch_services_for_client(&invoice.client_id).await?;
                client_services.clone()
            }
        };

        if services.is_empty() {
            return Err(PipelineError::Validation(format!(
                "Invoice {} has no services; add services to the invoice first",
                invoice.invoice_number
            )));
        }

        let (amount, amount_source) = resolve_amount_with_source(&invoice, &client_services);
        log::info!(
            "Invoice {} amount {:.2} resolved from {} ({} service rows)",
            invoice.invoice_number,
            amount,
            amount_source.as_str(),
            services.len()
        );

        let profile = resolve_profile(&user, requested_profile);
        let layout = InvoiceLayout::build(&invoice, &client, &services, &profile, amount);

        Ok(PreparedInvoice {
            invoice,
            user,
            client,
            services,
            profile,
            amount,
            amount_source,
            layout,
        })
    }

    /// Layout for the preview endpoint.
    pub async fn preview(&self, invoice_id: &str) -> Result<PreparedInvoice, PipelineError> {
        self.check_store_config()?;
        self.prepare(invoice_id, None, None).await
    }

    /// Render an invoice without sending it.
    pub async fn render_pdf(&self, invoice_id: &str) -> Result<(PreparedInvoice, RenderOutcome), PipelineError> {
        self.check_store_config()?;
        let prepared = self.prepare(invoice_id, None, None).await?;
        let outcome = self.dispatcher.render(&prepared.layout).await?;
        Ok((prepared, outcome))
    }

    pub async fn send_invoice(
        &self,
        request: &SendInvoiceRequest,
        today: NaiveDate,
    ) -> Result<DeliveryOutcome, PipelineError> {
        let result = self.run(request, today).await;
        match &result {
            Ok(outcome) if outcome.degraded => metrics::record_delivery("degraded"),
            Ok(_) => metrics::record_delivery("sent"),
            Err(_) => metrics::record_delivery("failed"),
        }
        result
    }

    async fn run(&self, request: &SendInvoiceRequest, today: NaiveDate) -> Result<DeliveryOutcome, PipelineError> {
        let id = request.invoice_id.trim();

        self.enter(PipelineStage::Validating, id);
        let missing = self.config.missing_credentials();
        if !missing.is_empty() {
            return Err(self.fail(PipelineStage::Validating, id, PipelineError::Configuration(missing)));
        }

        self.enter(PipelineStage::Aggregating, id);
        let prepared = self
            .prepare(
                id,
                request.company_settings.as_ref(),
                request.services.as_deref(),
            )
            .await
            .map_err(|e| self.fail(PipelineStage::Aggregating, id, e))?;

        if prepared.layout.recipient.email.is_empty() {
            return Err(self.fail(
                PipelineStage::Aggregating,
                id,
                PipelineError::Validation(format!(
                    "Client {} has no email address",
                    prepared.client.name
                )),
            ));
        }

        self.enter(PipelineStage::RenderingPrimary, id);
        let rendered = self
            .dispatcher
            .render_with(&prepared.layout, |_| self.enter(PipelineStage::RenderingFallback, id))
            .await
            .map_err(|e| self.fail(PipelineStage::RenderingFallback, id, e.into()))?;
        log::debug!(
            "Invoice {} PDF ready: {} bytes via {}",
            prepared.invoice.invoice_number,
            rendered.byte_length,
            rendered.method.as_str()
        );

        self.enter(PipelineStage::Composing, id);
        let reply_to = prepared
            .user
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .unwrap_or(prepared.profile.email.as_str());
        let email = self.composer.compose(
            &prepared.layout,
            &rendered.pdf,
            Some(reply_to),
            request.custom_email_data.as_ref(),
            today,
        );

        self.enter(PipelineStage::Dispatching, id);
        let receipt = self
            .channel
            .send(&email)
            .await
            .map_err(|e| self.fail(PipelineStage::Dispatching, id, e.into()))?;
        log::info!(
            "Invoice {} sent to {} through {}",
            prepared.invoice.invoice_number,
            email.to,
            self.channel.name()
        );

        self.enter(PipelineStage::UpdatingStatus, id);
        let status_updated = match self.store.update_invoice_status(id, InvoiceStatus::Sent).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Invoice {} was sent but its status could not be updated: {}", id, e);
                false
            }
        };

        self.enter(PipelineStage::Done, id);
        Ok(DeliveryOutcome {
            invoice_number: prepared.invoice.invoice_number,
            method: rendered.method,
            message_id: receipt.message_id,
            recipient: email.to,
            amount: prepared.amount,
            degraded: rendered.degraded,
            primary_error: rendered.primary_error,
            status_updated,
            pdf_bytes: rendered.byte_length,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(PipelineStage::RenderingPrimary.to_string(), "rendering_primary");
        assert_eq!(PipelineStage::UpdatingStatus.to_string(), "updating_status");
        assert_eq!(PipelineStage::Error.to_string(), "error");
    }

    #[test]
    fn test_error_mapping() {
        let config = PipelineError::Configuration(vec!["SENDGRID_API_KEY"]);
        assert_eq!(config.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(config.error_name(), "ConfigurationError");
        assert_eq!(config.to_failure().details.unwrap()["missing"][0], "SENDGRID_API_KEY");

        let validation = PipelineError::Validation("add services".to_string());
        assert_eq!(validation.status_code(), StatusCode::BAD_REQUEST);

        let missing = PipelineError::NotFound("Invoice x not found".to_string());
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(missing.to_failure().message, "Invoice x not found");
    }

    #[test]
    fn test_delivery_failure_passes_provider_error_through() {
        let err = PipelineError::from(DeliveryError::Rejected {
            status: 403,
            message: "The from address does not match a verified Sender Identity.".to_string(),
        });
        let failure = err.to_failure();

        assert!(!failure.success);
        assert_eq!(failure.error, "EmailDeliveryFailed");
        assert!(failure.message.contains("verified Sender Identity"));
        assert_eq!(failure.details.unwrap()["providerStatus"], 403);
        assert!(failure.hint.unwrap().contains("API key"));
    }

    #[test]
    fn test_profile_filled_from_user() {
        let user = User {
            id: "u1".to_string(),
            email: Some("claire@example.com".to_string()),
            first_name: Some("Claire".to_string()),
            last_name: Some("Martin".to_string()),
            company_settings: None,
        };

        let profile = resolve_profile(&user, None);
        assert_eq!(profile.owner_name, "Claire Martin");
        assert_eq!(profile.company_name, "Claire Martin");
        assert_eq!(profile.email, "claire@example.com");

        let requested = CompanyProfile {
            company_name: "Studio Martin".to_string(),
            ..Default::default()
        };
        let profile = resolve_profile(&user, Some(&requested));
        assert_eq!(profile.company_name, "Studio Martin");
    }
}
