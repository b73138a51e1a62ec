use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// Accepts numbers, numeric strings and null. Anything unparseable becomes `None`
/// so that stale or hand-edited rows never abort a pipeline run.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite()))
}

/// Lifecycle of an invoice as stored by the issuing user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
    Partial,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
            InvoiceStatus::Partial => "partial",
        }
    }
}

/// How a service is billed; drives the quantity/rate suffixes on the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum PricingType {
    #[default]
    Hourly,
    Daily,
    Project,
}

/// Detailed invoices list one dated row per service, summary invoices drop the date column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    #[default]
    Detailed,
    Summary,
}

/// Billable line item owned by a client.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct Service {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub pricing_type: PricingType,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub hours: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub quantity: Option<f64>,
    #[serde(default, alias = "hourly_rate", deserialize_with = "lenient_f64")]
    pub rate: Option<f64>,
}

impl Service {
    /// Hours for hourly services, generic quantity otherwise; each falls back to the other.
    pub fn effective_quantity(&self) -> f64 {
        let primary = match self.pricing_type {
            PricingType::Hourly => self.hours.or(self.quantity),
            PricingType::Daily | PricingType::Project => self.quantity.or(self.hours),
        };
        primary.unwrap_or(0.0)
    }

    pub fn effective_rate(&self) -> f64 {
        self.rate.unwrap_or(0.0)
    }

    pub fn line_total(&self) -> f64 {
        self.effective_quantity() * self.effective_rate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct Invoice {
    pub id: String,
    #[serde(default)]
    pub invoice_number: String,
    #[serde(default)]
    pub issue_date: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub status: InvoiceStatus,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub subtotal: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub net_amount: Option<f64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub services: Vec<Service>,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default, alias = "invoice_type")]
    pub kind: DocumentKind,
    #[serde(default)]
    pub show_late_penalty: Option<bool>,
    #[serde(default)]
    pub show_recovery_fee: Option<bool>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Service>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Service>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct Client {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub vat_number: Option<String>,
}

/// Owner of the invoice; its email becomes the Reply-To of delivered messages.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub company_settings: Option<CompanyProfile>,
}

impl User {
    pub fn full_name(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn default_payment_terms() -> u32 {
    30
}

fn default_true() -> bool {
    true
}

/// Issuer identity printed on every document.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CompanyProfile {
    #[serde(default, alias = "companyName")]
    pub company_name: String,
    #[serde(default, alias = "ownerName")]
    pub owner_name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default, alias = "postalCode")]
    pub postal_code: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub siret: String,
    #[serde(default, alias = "vatNumber")]
    pub vat_number: String,
    #[serde(default, alias = "logoUrl")]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub iban: String,
    #[serde(default)]
    pub bic: String,
    #[serde(default, alias = "bankName")]
    pub bank_name: String,
    #[serde(default = "default_payment_terms", alias = "paymentTermsDays")]
    pub payment_terms_days: u32,
    #[serde(default = "default_true", alias = "showLatePenalty")]
    pub show_late_penalty: bool,
    #[serde(default = "default_true", alias = "showRecoveryFee")]
    pub show_recovery_fee: bool,
    #[serde(default, alias = "vatExemptionNotice")]
    pub vat_exemption_notice: Option<String>,
}

impl Default for CompanyProfile {
    fn default() -> Self {
        Self {
            company_name: String::new(),
            owner_name: String::new(),
            address: String::new(),
            postal_code: String::new(),
            city: String::new(),
            email: String::new(),
            phone: String::new(),
            siret: String::new(),
            vat_number: String::new(),
            logo_url: None,
            iban: String::new(),
            bic: String::new(),
            bank_name: String::new(),
            payment_terms_days: default_payment_terms(),
            show_late_penalty: true,
            show_recovery_fee: true,
            vat_exemption_notice: None,
        }
    }
}

impl CompanyProfile {
    /// Postal code and city joined on one line, empty parts skipped.
    pub fn locality(&self) -> String {
        [self.postal_code.trim(), self.city.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
