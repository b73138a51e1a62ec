//! Invoice email composition.
//!
//! The HTML body is table-based with inline styles only so it survives
//! restrictive mail clients.

use base64::{engine::general_purpose, Engine as _};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;

use super::{EmailAttachment, OutboundEmail, Sender};
use crate::document::common::{escape_html, format_french_date, sanitize_filename};
use crate::document::layout::InvoiceLayout;

/// Caller overrides for the subject line and the plain-text message.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CustomEmailData {
    pub subject: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EmailComposer {
    from_email: String,
    from_name: String,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

pub fn attachment_filename(invoice_number: &str) -> String {
    format!("facture-{}.pdf", sanitize_filename(invoice_number, "facture"))
}

pub fn default_subject(invoice_number: &str, today: NaiveDate) -> String {
    format!("Facture N° {} - {}", invoice_number, format_french_date(today))
}

impl EmailComposer {
    pub fn new(from_email: impl Into<String>, from_name: impl Into<String>) -> Self {
        Self {
            from_email: from_email.into(),
            from_name: from_name.into(),
        }
    }

    /// Build the full message for one invoice. `reply_to` is the issuer's own address;
    /// the From identity is always the configured sender.
    pub fn compose(
        &self,
        layout: &InvoiceLayout,
        pdf: &[u8],
        reply_to: Option<&str>,
        custom: Option<&CustomEmailData>,
        today: NaiveDate,
    ) -> OutboundEmail {
        let number = layout.meta.number.as_str();

        let subject = non_blank(custom.and_then(|c| c.subject.as_deref()))
            .map(str::to_string)
            .unwrap_or_else(|| default_subject(number, today));

        let text = non_blank(custom.and_then(|c| c.message.as_deref()))
            .map(str::to_string)
            .unwrap_or_else(|| default_letter(layout));

        let html = render_html(layout, &text);

        let sender_name = if layout.issuer.name.trim().is_empty() {
            self.from_name.clone()
        } else {
            layout.issuer.name.clone()
        };

        OutboundEmail {
            to: layout.recipient.email.clone(),
            from: Sender {
                email: self.from_email.clone(),
                name: sender_name,
            },
            reply_to: non_blank(reply_to).map(str::to_string),
            subject,
            text,
            html,
            attachments: vec![EmailAttachment {
                content: general_purpose::STANDARD.encode(pdf),
                filename: attachment_filename(number),
                content_type: "application/pdf".to_string(),
                disposition: "attachment".to_string(),
            }],
        }
    }
}

/// Acknowledgement-of-receipt letter used when the caller sends no message.
fn default_letter(layout: &InvoiceLayout) -> String {
    let greeting = if layout.recipient.name.is_empty() {
        "Bonjour,".to_string()
    } else {
        format!("Bonjour {},", layout.recipient.name)
    };

    let mut issued = format!(
        "Veuillez trouver ci-joint la facture N° {} d'un montant de {}",
        layout.meta.number, layout.totals.formatted
    );
    if !layout.meta.issue_date.is_empty() {
        issued.push_str(&format!(", émise le {}", layout.meta.issue_date));
    }
    issued.push('.');

    let mut due = format!("Le règlement est attendu sous {} jours", layout.terms.due_in_days);
    if !layout.meta.due_date.is_empty() {
        due.push_str(&format!(", au plus tard le {}", layout.meta.due_date));
    }
    due.push('.');

    let signature = [layout.issuer.owner_name.as_str(), layout.issuer.name.as_str()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .fold(Vec::<&str>::new(), |mut acc, s| {
            if !acc.contains(&s) {
                acc.push(s);
            }
            acc
        })
        .join("\n");

    let mut letter = format!(
        "{greeting}\n\n{issued}\n\n{due}\n\nNous vous remercions de bien vouloir nous accuser réception de ce document.\n\nCordialement,"
    );
    if !signature.is_empty() {
        letter.push('\n');
        letter.push_str(&signature);
    }
    letter
}

const CELL: &str = "padding:8px;border-bottom:1px solid #e5e7eb;font-size:13px;color:#111827;";
const HEAD_CELL: &str = "padding:8px;background:#1e3a8a;color:#ffffff;font-size:12px;text-align:left;";

fn render_html(layout: &InvoiceLayout, message: &str) -> String {
    let mut html = String::with_capacity(4 * 1024);
    html.push_str("<!doctype html><html><body style=\"margin:0;padding:0;background:#f3f4f6;font-family:Arial,Helvetica,sans-serif;\">");
    html.push_str("<table role=\"presentation\" width=\"100%\" cellpadding=\"0\" cellspacing=\"0\" style=\"background:#f3f4f6;padding:24px 0;\"><tr><td align=\"center\">");
    html.push_str("<table role=\"presentation\" width=\"640\" cellpadding=\"0\" cellspacing=\"0\" style=\"background:#ffffff;border-radius:6px;overflow:hidden;\">");

    // Header
    html.push_str(&format!(
        "<tr><td style=\"background:#1e3a8a;color:#ffffff;padding:20px 24px;\"><div style=\"font-size:20px;font-weight:bold;\">{}</div><div style=\"font-size:13px;margin-top:4px;\">N° {} - {}</div></td></tr>",
        escape_html(&layout.title),
        escape_html(&layout.meta.number),
        escape_html(&layout.meta.issue_date)
    ));

    // Message
    let paragraphs = message
        .split("\n\n")
        .map(|p| format!(
            "<p style=\"margin:0 0 12px 0;\">{}</p>",
            escape_html(p).replace('\n', "<br>")
        ))
        .collect::<String>();
    html.push_str(&format!(
        "<tr><td style=\"padding:20px 24px;font-size:14px;line-height:1.5;color:#111827;\">{}</td></tr>",
        paragraphs
    ));

    // Issuer / recipient
    let recipient = &layout.recipient;
    let mut recipient_lines = vec![recipient.name.clone()];
    if !recipient.company.is_empty() {
        recipient_lines.push(recipient.company.clone());
    }
    recipient_lines.extend(recipient.address_lines.iter().cloned());
    recipient_lines.push(recipient.email.clone());
    let mut issuer_lines = vec![layout.issuer.name.clone()];
    issuer_lines.extend(layout.issuer.address_lines.iter().cloned());
    if !layout.issuer.siret.is_empty() {
        issuer_lines.push(format!("SIRET {}", layout.issuer.siret));
    }
    html.push_str("<tr><td style=\"padding:0 24px 16px 24px;\"><table role=\"presentation\" width=\"100%\" cellpadding=\"0\" cellspacing=\"0\"><tr>");
    for (caption, lines) in [("Émetteur", &issuer_lines), ("Destinataire", &recipient_lines)] {
        html.push_str(&format!(
            "<td valign=\"top\" width=\"50%\" style=\"font-size:13px;color:#111827;\"><div style=\"font-size:11px;color:#6b7280;text-transform:uppercase;margin-bottom:4px;\">{}</div>{}</td>",
            caption,
            lines
                .iter()
                .filter(|l| !l.trim().is_empty())
                .map(|l| format!("<div>{}</div>", escape_html(l)))
                .collect::<String>()
        ));
    }
    html.push_str("</tr></table></td></tr>");

    // Line items
    html.push_str("<tr><td style=\"padding:0 24px;\"><table role=\"presentation\" width=\"100%\" cellpadding=\"0\" cellspacing=\"0\" style=\"border-collapse:collapse;\"><tr>");
    for column in &layout.table.columns {
        let align = if column.is_numeric() { "text-align:right;" } else { "" };
        html.push_str(&format!(
            "<th style=\"{HEAD_CELL}{align}\">{}</th>",
            escape_html(column.label())
        ));
    }
    html.push_str("</tr>");
    for row in &layout.table.rows {
        html.push_str("<tr>");
        for column in &layout.table.columns {
            let align = if column.is_numeric() { "text-align:right;white-space:nowrap;" } else { "" };
            html.push_str(&format!(
                "<td style=\"{CELL}{align}\">{}</td>",
                escape_html(row.cell(*column))
            ));
        }
        html.push_str("</tr>");
    }
    html.push_str("</table></td></tr>");

    // Totals
    html.push_str(&format!(
        "<tr><td style=\"padding:12px 24px;text-align:right;font-size:16px;font-weight:bold;color:#111827;\">{} : {}</td></tr>",
        escape_html(&layout.totals.total_label),
        escape_html(&layout.totals.formatted)
    ));
    if let Some(notice) = layout.totals.vat_notice.as_deref() {
        html.push_str(&format!(
            "<tr><td style=\"padding:0 24px 8px 24px;text-align:right;font-size:11px;color:#6b7280;\">{}</td></tr>",
            escape_html(notice)
        ));
    }

    // Bank details
    let bank = &layout.terms.bank;
    if !bank.is_empty() {
        let mut rows = String::new();
        for (label, value) in [("Banque", &bank.bank_name), ("IBAN", &bank.iban), ("BIC", &bank.bic)] {
            if !value.trim().is_empty() {
                rows.push_str(&format!(
                    "<tr><td style=\"{CELL}color:#6b7280;\">{}</td><td style=\"{CELL}\">{}</td></tr>",
                    label,
                    escape_html(value)
                ));
            }
        }
        html.push_str(&format!(
            "<tr><td style=\"padding:8px 24px;\"><div style=\"font-size:12px;font-weight:bold;margin-bottom:4px;\">Coordonnées bancaires</div><table role=\"presentation\" cellpadding=\"0\" cellspacing=\"0\" style=\"border-collapse:collapse;\">{}</table></td></tr>",
            rows
        ));
    }

    if let Some(notes) = layout.notes.as_deref() {
        html.push_str(&format!(
            "<tr><td style=\"padding:8px 24px;font-size:13px;color:#374151;\">{}</td></tr>",
            escape_html(notes).replace('\n', "<br>")
        ));
    }

    html.push_str(&format!(
        "<tr><td style=\"padding:16px 24px;font-size:11px;color:#6b7280;border-top:1px solid #e5e7eb;\">{}</td></tr>",
        escape_html(&layout.footer)
    ));
    html.push_str("</table></td></tr></table></body></html>");
    html
}
