#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use facture_dispatch_server::config::{AppConfig, SendGridConfig, SupabaseConfig};
use facture_dispatch_server::db::{InvoiceStore, StoreError};
use facture_dispatch_server::delivery::DeliveryOrchestrator;
use facture_dispatch_server::document::{
    DocumentRenderer, InvoiceLayout, PrimitiveRenderer, RenderDispatcher, RenderError, RenderMethod,
};
use facture_dispatch_server::invoice::{
    Client, CompanyProfile, Invoice, InvoiceStatus, PricingType, Service, User,
};
use facture_dispatch_server::mail::{
    DeliveryChannel, DeliveryError, DeliveryReceipt, EmailComposer, OutboundEmail,
};
use facture_dispatch_server::AppState;

/// In-memory implementation of InvoiceStore for testing
#[derive(Default)]
pub struct MockStore {
    invoices: Mutex<HashMap<String, Invoice>>,
    users: Mutex<HashMap<String, User>>,
    clients: Mutex<HashMap<String, Client>>,
    services: Mutex<Vec<Service>>,
    status_updates: Mutex<Vec<(String, InvoiceStatus)>>,
    fail_status_update: bool,
    reads: AtomicUsize,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_status_update() -> Self {
        Self {
            fail_status_update: true,
            ..Self::default()
        }
    }

    pub async fn put_invoice(&self, invoice: Invoice) {
        self.invoices.lock().await.insert(invoice.id.clone(), invoice);
    }

    pub async fn put_user(&self, user: User) {
        self.users.lock().await.insert(user.id.clone(), user);
    }

    pub async fn put_client(&self, client: Client) {
        self.clients.lock().await.insert(client.id.clone(), client);
    }

    pub async fn put_service(&self, service: Service) {
        self.services.lock().await.push(service);
    }

    pub async fn status_updates(&self) -> Vec<(String, InvoiceStatus)> {
        self.status_updates.lock().await.clone()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InvoiceStore for MockStore {
    async fn fetch_invoice(&self, id: &str) -> Result<Option<Invoice>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.invoices.lock().await.get(id).cloned())
    }

    async fn fetch_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.users.lock().await.get(id).cloned())
    }

    async fn fetch_client(&self, id: &str) -> Result<Option<Client>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.clients.lock().await.get(id).cloned())
    }

    async fn fetch_services_for_client(&self, client_id: &str) -> Result<Vec<Service>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .services
            .lock()
            .await
            .iter()
            .filter(|s| s.client_id.as_deref() == Some(client_id))
            .cloned()
            .collect())
    }

    async fn update_invoice_status(&self, id: &str, status: InvoiceStatus) -> Result<(), StoreError> {
        if self.fail_status_update {
            return Err(StoreError::Status {
                status: 503,
                body: "service unavailable".to_string(),
            });
        }
        if let Some(invoice) = self.invoices.lock().await.get_mut(id) {
            invoice.status = status;
        }
        self.status_updates.lock().await.push((id.to_string(), status));
        Ok(())
    }
}

/// Delivery channel that records messages instead of sending them
#[derive(Default)]
pub struct MockChannel {
    sent: Mutex<Vec<OutboundEmail>>,
    reject_with: Option<(u16, String)>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(status: u16, message: &str) -> Self {
        Self {
            reject_with: Some((status, message.to_string())),
            ..Self::default()
        }
    }

    pub async fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl DeliveryChannel for MockChannel {
    async fn send(&self, email: &OutboundEmail) -> Result<DeliveryReceipt, DeliveryError> {
        if let Some((status, message)) = &self.reject_with {
            return Err(DeliveryError::Rejected {
                status: *status,
                message: message.clone(),
            });
        }
        let mut sent = self.sent.lock().await;
        sent.push(email.clone());
        Ok(DeliveryReceipt {
            message_id: Some(format!("mock-message-{}", sent.len())),
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Renderer with a fixed answer that counts how often it was asked.
pub struct ScriptedRenderer {
    method: RenderMethod,
    result: Result<Vec<u8>, String>,
    calls: AtomicUsize,
}

impl ScriptedRenderer {
    pub fn failing(method: RenderMethod, message: &str) -> Self {
        Self {
            method,
            result: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn returning(method: RenderMethod, pdf: &[u8]) -> Self {
        Self {
            method,
            result: Ok(pdf.to_vec()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentRenderer for ScriptedRenderer {
    fn method(&self) -> RenderMethod {
        self.method
    }

    async fn render(&self, _layout: &InvoiceLayout) -> Result<Vec<u8>, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone().map_err(RenderError::Drawing)
    }
}

pub fn full_config() -> AppConfig {
    AppConfig {
        supabase: SupabaseConfig {
            supabase_url: "https://demo.supabase.co".to_string(),
            supabase_key: "service-role".to_string(),
        },
        sendgrid: SendGridConfig {
            api_key: "SG.test".to_string(),
            from_email: "factures@example.com".to_string(),
            from_name: "Facturation".to_string(),
        },
        ..AppConfig::default()
    }
}

pub fn sample_invoice() -> Invoice {
    Invoice {
        id: "inv-1".to_string(),
        invoice_number: "FAC-2024-001".to_string(),
        issue_date: Some("2024-01-01".to_string()),
        due_date: Some("2024-01-31".to_string()),
        payment_method: Some("transfer".to_string()),
        client_id: "client-1".to_string(),
        user_id: "user-1".to_string(),
        ..Default::default()
    }
}

pub fn sample_service() -> Service {
    Service {
        id: Some("svc-1".to_string()),
        client_id: Some("client-1".to_string()),
        date: Some("2024-01-15".to_string()),
        description: Some("Développement site vitrine".to_string()),
        pricing_type: PricingType::Hourly,
        hours: Some(8.0),
        rate: Some(150.0),
        ..Default::default()
    }
}

pub fn sample_client() -> Client {
    Client {
        id: "client-1".to_string(),
        name: "Jean Dupont".to_string(),
        email: Some("jean.dupont@example.com".to_string()),
        phone: Some("06 12 34 56 78".to_string()),
        address: Some("12 rue des Lilas".to_string()),
        postal_code: Some("75011".to_string()),
        city: Some("Paris".to_string()),
        ..Default::default()
    }
}

pub fn sample_user() -> User {
    User {
        id: "user-1".to_string(),
        email: Some("claire@studio-martin.fr".to_string()),
        first_name: Some("Claire".to_string()),
        last_name: Some("Martin".to_string()),
        company_settings: Some(CompanyProfile {
            company_name: "Studio Martin".to_string(),
            siret: "123 456 789 00012".to_string(),
            iban: "FR76 3000 6000 0112 3456 7890 189".to_string(),
            bic: "AGRIFRPP".to_string(),
            ..Default::default()
        }),
    }
}

/// Store seeded with the FAC-2024-001 scenario; the one service is owned by the client.
pub async fn seeded_store(store: MockStore) -> Arc<MockStore> {
    store.put_invoice(sample_invoice()).await;
    store.put_user(sample_user()).await;
    store.put_client(sample_client()).await;
    store.put_service(sample_service()).await;
    Arc::new(store)
}

pub fn dispatcher(primary: Arc<dyn DocumentRenderer>, fallback: Arc<dyn DocumentRenderer>) -> RenderDispatcher {
    RenderDispatcher::new(primary, fallback)
}

/// Dispatcher whose engine always fails, so the real primitive renderer produces the PDF.
pub fn degraded_dispatcher() -> RenderDispatcher {
    dispatcher(
        Arc::new(ScriptedRenderer::failing(RenderMethod::Engine, "browser failed to launch")),
        Arc::new(PrimitiveRenderer::new()),
    )
}

pub fn orchestrator(
    config: AppConfig,
    store: Arc<MockStore>,
    channel: Arc<MockChannel>,
    dispatcher: RenderDispatcher,
) -> DeliveryOrchestrator {
    let composer = EmailComposer::new(
        config.sendgrid.from_email.clone(),
        config.sendgrid.from_name.clone(),
    );
    DeliveryOrchestrator::new(config, store, channel, dispatcher, composer)
}

pub fn app_state(
    config: AppConfig,
    store: Arc<MockStore>,
    channel: Arc<MockChannel>,
    dispatcher: RenderDispatcher,
) -> AppState {
    AppState::with_parts(config, store, channel, dispatcher)
}
