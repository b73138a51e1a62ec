//! Database module - AppState and invoice record access
//!
//! - `supabase` - PostgREST-backed store for invoices, users, clients and services

pub mod supabase;

pub use supabase::SupabaseStore;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::AppConfig;
use crate::delivery::DeliveryOrchestrator;
use crate::document::{ChromiumEngine, PrimitiveRenderer, RenderDispatcher};
use crate::invoice::{Client, Invoice, InvoiceStatus, Service, User};
use crate::mail::{DeliveryChannel, EmailComposer, SendGridChannel};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("data store request failed: {0}")]
    Transport(String),

    #[error("data store returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode {table} row: {message}")]
    Decode { table: &'static str, message: String },
}

/// Read access to invoice records plus the single status write the pipeline needs.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    async fn fetch_invoice(&self, id: &str) -> Result<Option<Invoice>, StoreError>;
    async fn fetch_user(&self, id: &str) -> Result<Option<User>, StoreError>;
    async fn fetch_client(&self, id: &str) -> Result<Option<Client>, StoreError>;
    async fn fetch_services_for_client(&self, client_id: &str) -> Result<Vec<Service>, StoreError>;
    async fn update_invoice_status(&self, id: &str, status: InvoiceStatus) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub orchestrator: Arc<DeliveryOrchestrator>,
}

impl AppState {
    /// Wire the production store, delivery channel and renderers from configuration.
    pub fn new(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let http_client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(900))
            .timeout(Duration::from_secs(30))
            .user_agent("facture-dispatch-server/0.3")
            .build()?;

        let store: Arc<dyn InvoiceStore> = Arc::new(SupabaseStore::new(&config.supabase));
        let channel: Arc<dyn DeliveryChannel> =
            Arc::new(SendGridChannel::new(config.sendgrid.api_key.clone(), http_client));
        let dispatcher = RenderDispatcher::new(
            Arc::new(ChromiumEngine::new(
                config.render.chromium_path.clone(),
                config.render.load_timeout,
                config.render.settle,
            )),
            Arc::new(PrimitiveRenderer::new()),
        );

        Ok(Self::with_parts(config, store, channel, dispatcher))
    }

    /// Assemble state from explicit parts; used by tests to inject mocks.
    pub fn with_parts(
        config: AppConfig,
        store: Arc<dyn InvoiceStore>,
        channel: Arc<dyn DeliveryChannel>,
        dispatcher: RenderDispatcher,
    ) -> Self {
        let composer = EmailComposer::new(
            config.sendgrid.from_email.clone(),
            config.sendgrid.from_name.clone(),
        );
        let orchestrator = DeliveryOrchestrator::new(
            config.clone(),
            store,
            channel,
            dispatcher,
            composer,
        );

        Self {
            config,
            orchestrator: Arc::new(orchestrator),
        }
    }
}
