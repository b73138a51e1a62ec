//! Renderer-agnostic description of a printable invoice.
//!
//! Both the engine renderer and the primitive renderer consume an
//! [`InvoiceLayout`]; nothing in here knows about colours, fonts or units.

use serde::Serialize;

use super::common::{display_date, format_money, format_number, parse_instant};
use crate::invoice::{Client, CompanyProfile, DocumentKind, Invoice, PricingType, Service};

pub const LATE_PENALTY_TEXT: &str = "En cas de retard de paiement, une pénalité égale à trois fois le taux d'intérêt légal sera exigible (article L441-10 du Code de commerce).";
pub const RECOVERY_FEE_TEXT: &str = "Une indemnité forfaitaire pour frais de recouvrement de 40 € sera due en cas de retard de paiement (article D441-5 du Code de commerce).";

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Column {
    Date,
    Description,
    Quantity,
    Rate,
    Amount,
}

impl Column {
    pub fn label(&self) -> &'static str {
        match self {
            Column::Date => "Date",
            Column::Description => "Description",
            Column::Quantity => "Quantité",
            Column::Rate => "Tarif",
            Column::Amount => "Total",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Column::Quantity | Column::Rate | Column::Amount)
    }
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct IssuerBlock {
    pub name: String,
    pub owner_name: String,
    pub address_lines: Vec<String>,
    pub email: String,
    pub phone: String,
    pub siret: String,
    pub vat_number: String,
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct MetadataBlock {
    pub number: String,
    pub issue_date: String,
    pub due_date: String,
    pub payment_method: String,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct RecipientBlock {
    pub name: String,
    pub company: String,
    pub address_lines: Vec<String>,
    pub email: String,
    pub phone: String,
    pub vat_number: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LineRow {
    pub date: Option<String>,
    pub description: String,
    pub quantity: String,
    pub rate: String,
    pub amount: String,
    pub amount_value: f64,
}

impl LineRow {
    pub fn cell(&self, column: Column) -> &str {
        match column {
            Column::Date => self.date.as_deref().unwrap_or(""),
            Column::Description => &self.description,
            Column::Quantity => &self.quantity,
            Column::Rate => &self.rate,
            Column::Amount => &self.amount,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LineTable {
    pub columns: Vec<Column>,
    pub rows: Vec<LineRow>,
}

impl LineTable {
    pub fn has_date_column(&self) -> bool {
        self.columns.contains(&Column::Date)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TotalsBlock {
    pub amount: f64,
    pub subtotal_label: String,
    pub total_label: String,
    pub formatted: String,
    pub vat_notice: Option<String>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct BankDetails {
    pub bank_name: String,
    pub iban: String,
    pub bic: String,
}

impl BankDetails {
    pub fn is_empty(&self) -> bool {
        self.iban.trim().is_empty() && self.bic.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TermsBlock {
    pub due_in_days: i64,
    pub payment_terms: String,
    pub late_penalty: Option<String>,
    pub recovery_fee: Option<String>,
    pub bank: BankDetails,
}

impl TermsBlock {
    /// Disclosure lines that survived the invoice/issuer flags, in print order.
    pub fn disclosures(&self) -> Vec<&str> {
        [self.late_penalty.as_deref(), self.recovery_fee.as_deref()]
            .into_iter()
            .flatten()
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceLayout {
    pub kind: DocumentKind,
    pub title: String,
    pub issuer: IssuerBlock,
    pub meta: MetadataBlock,
    pub recipient: RecipientBlock,
    pub table: LineTable,
    pub totals: TotalsBlock,
    pub terms: TermsBlock,
    pub notes: Option<String>,
    pub footer: String,
    /// Stable seed for document metadata (ids, dates) so identical input renders identically.
    pub issue_date_raw: Option<String>,
}

/// Days between issue and due date, rounded up; non-positive or unknown gaps use the default terms.
pub fn due_in_days(issue_date: Option<&str>, due_date: Option<&str>, default_days: u32) -> i64 {
    let issue = issue_date.and_then(parse_instant);
    let due = due_date.and_then(parse_instant);

    match (issue, due) {
        (Some(issue), Some(due)) => {
            let seconds = (due - issue).num_seconds() as f64;
            let days = (seconds / SECONDS_PER_DAY).ceil() as i64;
            if days > 0 {
                days
            } else {
                i64::from(default_days)
            }
        }
        _ => i64::from(default_days),
    }
}

/// An explicit invoice flag always wins; otherwise the issuer default applies.
pub fn disclosure_enabled(invoice_flag: Option<bool>, issuer_default: bool) -> bool {
    invoice_flag.unwrap_or(issuer_default)
}

fn format_quantity(service: &Service) -> String {
    let qty = format_number(service.effective_quantity());
    match service.pricing_type {
        PricingType::Hourly => format!("{qty}h"),
        PricingType::Daily => format!("{qty}j"),
        PricingType::Project => qty,
    }
}

fn format_rate(service: &Service) -> String {
    let rate = format_number(service.effective_rate());
    match service.pricing_type {
        PricingType::Hourly => format!("{rate}€/h"),
        PricingType::Daily => format!("{rate}€/jour"),
        PricingType::Project => format!("{rate}€"),
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn opt_text(value: Option<&str>) -> String {
    value.map(str::trim).unwrap_or("").to_string()
}

fn payment_method_label(raw: Option<&str>) -> String {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("transfer") | Some("bank_transfer") | Some("virement") => "Virement bancaire".to_string(),
        Some("check") | Some("cheque") | Some("chèque") => "Chèque".to_string(),
        Some("cash") | Some("especes") | Some("espèces") => "Espèces".to_string(),
        Some("card") | Some("carte") => "Carte bancaire".to_string(),
        Some("") | None => String::new(),
        Some(_) => opt_text(raw),
    }
}

impl InvoiceLayout {
    /// Assemble the layout. `amount` must be the single value resolved for this run.
    pub fn build(
        invoice: &Invoice,
        client: &Client,
        services: &[Service],
        profile: &CompanyProfile,
        amount: f64,
    ) -> Self {
        let kind = invoice.kind;

        let issuer = IssuerBlock {
            name: profile.company_name.trim().to_string(),
            owner_name: profile.owner_name.trim().to_string(),
            address_lines: [non_empty(&profile.address), non_empty(&profile.locality())]
                .into_iter()
                .flatten()
                .collect(),
            email: profile.email.trim().to_string(),
            phone: profile.phone.trim().to_string(),
            siret: profile.siret.trim().to_string(),
            vat_number: profile.vat_number.trim().to_string(),
            logo_url: profile
                .logo_url
                .as_deref()
                .and_then(non_empty),
        };

        let client_locality = [
            opt_text(client.postal_code.as_deref()),
            opt_text(client.city.as_deref()),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        let recipient = RecipientBlock {
            name: client.name.trim().to_string(),
            company: opt_text(client.company.as_deref()),
            address_lines: [non_empty(&opt_text(client.address.as_deref())), non_empty(&client_locality)]
                .into_iter()
                .flatten()
                .collect(),
            email: opt_text(client.email.as_deref()),
            phone: opt_text(client.phone.as_deref()),
            vat_number: opt_text(client.vat_number.as_deref()),
        };

        let meta = MetadataBlock {
            number: invoice.invoice_number.trim().to_string(),
            issue_date: display_date(invoice.issue_date.as_deref()),
            due_date: display_date(invoice.due_date.as_deref()),
            payment_method: payment_method_label(invoice.payment_method.as_deref()),
        };

        let columns = match kind {
            DocumentKind::Detailed => vec![
                Column::Date,
                Column::Description,
                Column::Quantity,
                Column::Rate,
                Column::Amount,
            ],
            DocumentKind::Summary => vec![
                Column::Description,
                Column::Quantity,
                Column::Rate,
                Column::Amount,
            ],
        };

        let rows = services
            .iter()
            .map(|service| {
                let line_total = service.line_total();
                LineRow {
                    date: match kind {
                        DocumentKind::Detailed => Some(display_date(service.date.as_deref())),
                        DocumentKind::Summary => None,
                    },
                    description: opt_text(service.description.as_deref()),
                    quantity: format_quantity(service),
                    rate: format_rate(service),
                    amount: format_money(line_total),
                    amount_value: line_total,
                }
            })
            .collect();

        let totals = TotalsBlock {
            amount,
            subtotal_label: "Sous-total HT".to_string(),
            total_label: "Total à payer".to_string(),
            formatted: format_money(amount),
            vat_notice: profile.vat_exemption_notice.as_deref().and_then(non_empty),
        };

        let days = due_in_days(
            invoice.issue_date.as_deref(),
            invoice.due_date.as_deref(),
            profile.payment_terms_days,
        );

        let terms = TermsBlock {
            due_in_days: days,
            payment_terms: format!("Paiement à {days} jours à compter de la date d'émission."),
            late_penalty: disclosure_enabled(invoice.show_late_penalty, profile.show_late_penalty)
                .then(|| LATE_PENALTY_TEXT.to_string()),
            recovery_fee: disclosure_enabled(invoice.show_recovery_fee, profile.show_recovery_fee)
                .then(|| RECOVERY_FEE_TEXT.to_string()),
            bank: BankDetails {
                bank_name: profile.bank_name.trim().to_string(),
                iban: profile.iban.trim().to_string(),
                bic: profile.bic.trim().to_string(),
            },
        };

        let footer = [
            non_empty(&issuer.name),
            non_empty(&issuer.siret).map(|s| format!("SIRET {s}")),
            non_empty(&issuer.address_lines.join(", ")),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" - ");

        Self {
            kind,
            title: "FACTURE".to_string(),
            issuer,
            meta,
            recipient,
            table: LineTable { columns, rows },
            totals,
            terms,
            notes: invoice.notes.as_deref().and_then(non_empty),
            footer,
            issue_date_raw: invoice.issue_date.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_service() -> Service {
        Service {
            id: Some("s1".to_string()),
            client_id: Some("c1".to_string()),
            date: Some("2024-01-15".to_string()),
            description: Some("Développement".to_string()),
            hours: Some(8.0),
            rate: Some(150.0),
            ..Default::default()
        }
    }

    fn sample_invoice(kind: DocumentKind) -> Invoice {
        Invoice {
            id: "inv-1".to_string(),
            invoice_number: "FAC-2024-001".to_string(),
            issue_date: Some("2024-01-01".to_string()),
            due_date: Some("2024-01-31".to_string()),
            client_id: "c1".to_string(),
            kind,
            ..Default::default()
        }
    }

    fn sample_client() -> Client {
        Client {
            id: "c1".to_string(),
            name: "Jean Dupont".to_string(),
            email: Some("jean.dupont@example.com".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_due_in_days() {
        assert_eq!(due_in_days(Some("2024-01-01"), Some("2024-01-31"), 30), 30);
        assert_eq!(due_in_days(Some("2024-01-31"), Some("2024-01-31"), 30), 30);
        assert_eq!(due_in_days(Some("2024-02-10"), Some("2024-01-31"), 45), 45);
        assert_eq!(due_in_days(None, Some("2024-01-31"), 30), 30);
    }

    #[test]
    fn test_due_in_days_rounds_up_partial_days() {
        assert_eq!(
            due_in_days(Some("2024-01-01T00:00:00Z"), Some("2024-01-02T06:00:00Z"), 30),
            2
        );
    }

    #[test]
    fn test_disclosure_precedence() {
        assert!(!disclosure_enabled(Some(false), true));
        assert!(disclosure_enabled(Some(true), false));
        assert!(disclosure_enabled(None, true));
        assert!(!disclosure_enabled(None, false));
    }

    #[test]
    fn test_detailed_layout_has_date_column() {
        let services = vec![sample_service()];
        let layout = InvoiceLayout::build(
            &sample_invoice(DocumentKind::Detailed),
            &sample_client(),
            &services,
            &CompanyProfile::default(),
            1200.0,
        );

        assert!(layout.table.has_date_column());
        assert_eq!(layout.table.columns[0], Column::Date);
        assert_eq!(layout.table.rows[0].date.as_deref(), Some("15/01/2024"));
        assert_eq!(layout.table.rows[0].quantity, "8h");
        assert_eq!(layout.table.rows[0].rate, "150€/h");
        assert_eq!(layout.totals.formatted, "1 200,00 €");
        assert_eq!(layout.terms.due_in_days, 30);
    }

    #[test]
    fn test_summary_layout_omits_date_column() {
        let services = vec![sample_service()];
        let layout = InvoiceLayout::build(
            &sample_invoice(DocumentKind::Summary),
            &sample_client(),
            &services,
            &CompanyProfile::default(),
            1200.0,
        );

        assert!(!layout.table.has_date_column());
        assert!(layout.table.rows.iter().all(|r| r.date.is_none()));
        assert_eq!(layout.table.columns.len(), 4);
    }

    #[test]
    fn test_pricing_type_suffixes() {
        let daily = Service {
            pricing_type: PricingType::Daily,
            quantity: Some(3.0),
            rate: Some(450.0),
            ..Default::default()
        };
        let project = Service {
            pricing_type: PricingType::Project,
            quantity: Some(1.0),
            rate: Some(2500.0),
            ..Default::default()
        };
        let layout = InvoiceLayout::build(
            &sample_invoice(DocumentKind::Summary),
            &sample_client(),
            &[daily, project],
            &CompanyProfile::default(),
            3850.0,
        );

        assert_eq!(layout.table.rows[0].quantity, "3j");
        assert_eq!(layout.table.rows[0].rate, "450€/jour");
        assert_eq!(layout.table.rows[1].quantity, "1");
        assert_eq!(layout.table.rows[1].rate, "2500€");
    }

    #[test]
    fn test_invoice_flag_disables_disclosure() {
        let mut invoice = sample_invoice(DocumentKind::Detailed);
        invoice.show_late_penalty = Some(false);
        let profile = CompanyProfile::default();

        let layout = InvoiceLayout::build(&invoice, &sample_client(), &[], &profile, 0.0);
        assert!(layout.terms.late_penalty.is_none());
        assert!(layout.terms.recovery_fee.is_some());
        assert_eq!(layout.terms.disclosures().len(), 1);
    }

    #[test]
    fn test_missing_optionals_are_blank() {
        let invoice = Invoice {
            id: "inv-x".to_string(),
            ..Default::default()
        };
        let client = Client {
            id: "c".to_string(),
            ..Default::default()
        };
        let layout = InvoiceLayout::build(&invoice, &client, &[Service::default()], &CompanyProfile::default(), 0.0);

        assert_eq!(layout.meta.issue_date, "");
        assert_eq!(layout.meta.payment_method, "");
        assert_eq!(layout.recipient.email, "");
        assert_eq!(layout.table.rows[0].description, "");
        assert_eq!(layout.footer, "");
    }
}
