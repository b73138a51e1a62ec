//! HTML/CSS invoice template.
//!
//! The same markup is served for on-screen preview and handed to the engine
//! renderer, so the emailed PDF matches what the user saw.

use super::common::escape_html;
use super::layout::InvoiceLayout;

const STYLESHEET: &str = r#"
@page {
  size: A4;
  margin: 0 0 16mm 0;
  @bottom-center {
    content: "Page " counter(page) " / " counter(pages);
    font-family: Helvetica, Arial, sans-serif;
    font-size: 8pt;
    color: #6b7280;
  }
}
* { box-sizing: border-box; }
html, body {
  margin: 0;
  padding: 0;
  -webkit-print-color-adjust: exact;
  print-color-adjust: exact;
}
body { font-family: Helvetica, Arial, sans-serif; font-size: 10pt; color: #111827; }
.page { padding: 14mm 15mm 0 15mm; }
.header { display: flex; justify-content: space-between; align-items: flex-start; background: #1e3a8a; color: #ffffff; padding: 8mm 15mm; margin: -14mm -15mm 8mm -15mm; }
.header h1 { margin: 0; font-size: 22pt; letter-spacing: 0.08em; }
.header .number { font-size: 11pt; margin-top: 2mm; }
.header img { max-height: 18mm; max-width: 50mm; background: #ffffff; padding: 1mm; }
.parties { display: flex; justify-content: space-between; gap: 10mm; margin-bottom: 8mm; }
.party { flex: 1; }
.party h2 { font-size: 9pt; text-transform: uppercase; color: #6b7280; margin: 0 0 2mm 0; }
.party .name { font-weight: 700; font-size: 11pt; }
.box { border: 1px solid #d1d5db; border-radius: 2mm; padding: 3mm 4mm; }
.meta { display: flex; gap: 6mm; margin-bottom: 8mm; }
.meta div { flex: 1; }
.meta .label { font-size: 8pt; color: #6b7280; text-transform: uppercase; }
table.lines { width: 100%; border-collapse: collapse; margin-bottom: 6mm; }
table.lines th { background: #1e3a8a; color: #ffffff; text-align: left; padding: 2mm; font-size: 9pt; }
table.lines td { padding: 2mm; border-bottom: 1px solid #e5e7eb; vertical-align: top; }
table.lines tr:nth-child(even) td { background: #f3f4f6; }
table.lines .num { text-align: right; white-space: nowrap; }
.totals { margin-left: auto; width: 75mm; border-top: 2px solid #1e3a8a; padding-top: 2mm; }
.totals .row { display: flex; justify-content: space-between; padding: 1mm 0; }
.totals .grand { font-weight: 700; font-size: 12pt; }
.vat { font-size: 8pt; color: #6b7280; margin-top: 1mm; text-align: right; }
.terms { margin-top: 8mm; font-size: 8.5pt; color: #374151; }
.terms h3 { font-size: 9pt; margin: 0 0 2mm 0; }
.terms p { margin: 0 0 1.5mm 0; }
.notes { margin-top: 6mm; font-size: 9pt; white-space: pre-wrap; }
.footer { margin-top: 10mm; font-size: 7.5pt; color: #6b7280; text-align: center; border-top: 1px solid #e5e7eb; padding-top: 2mm; }
"#;

fn push_lines(html: &mut String, lines: &[String]) {
    for line in lines.iter().filter(|l| !l.trim().is_empty()) {
        html.push_str(&format!("<div>{}</div>", escape_html(line)));
    }
}

fn push_labeled(html: &mut String, label: &str, value: &str) {
    if !value.trim().is_empty() {
        html.push_str(&format!(
            "<div>{} : {}</div>",
            escape_html(label),
            escape_html(value)
        ));
    }
}

/// Render the full standalone HTML document for a layout.
pub fn render_document(layout: &InvoiceLayout) -> String {
    let mut html = String::with_capacity(8 * 1024);
    html.push_str("<!doctype html><html lang=\"fr\"><head><meta charset=\"utf-8\">");
    html.push_str(&format!(
        "<title>{} {}</title>",
        escape_html(&layout.title),
        escape_html(&layout.meta.number)
    ));
    html.push_str("<style>");
    html.push_str(STYLESHEET);
    html.push_str("</style></head><body><div class=\"page\">");

    // Header band
    html.push_str("<div class=\"header\"><div>");
    html.push_str(&format!("<h1>{}</h1>", escape_html(&layout.title)));
    html.push_str(&format!(
        "<div class=\"number\">N° {}</div>",
        escape_html(&layout.meta.number)
    ));
    html.push_str("</div>");
    if let Some(logo) = layout.issuer.logo_url.as_deref() {
        html.push_str(&format!("<img src=\"{}\" alt=\"\">", escape_html(logo)));
    }
    html.push_str("</div>");

    // Parties
    let issuer = &layout.issuer;
    html.push_str("<div class=\"parties\"><div class=\"party\"><h2>Émetteur</h2>");
    html.push_str(&format!("<div class=\"name\">{}</div>", escape_html(&issuer.name)));
    if !issuer.owner_name.is_empty() && issuer.owner_name != issuer.name {
        html.push_str(&format!("<div>{}</div>", escape_html(&issuer.owner_name)));
    }
    push_lines(&mut html, &issuer.address_lines);
    push_labeled(&mut html, "Email", &issuer.email);
    push_labeled(&mut html, "Tél.", &issuer.phone);
    push_labeled(&mut html, "SIRET", &issuer.siret);
    push_labeled(&mut html, "N° TVA", &issuer.vat_number);
    html.push_str("</div>");

    let recipient = &layout.recipient;
    html.push_str("<div class=\"party box\"><h2>Destinataire</h2>");
    html.push_str(&format!("<div class=\"name\">{}</div>", escape_html(&recipient.name)));
    if !recipient.company.is_empty() {
        html.push_str(&format!("<div>{}</div>", escape_html(&recipient.company)));
    }
    push_lines(&mut html, &recipient.address_lines);
    push_labeled(&mut html, "Email", &recipient.email);
    push_labeled(&mut html, "Tél.", &recipient.phone);
    push_labeled(&mut html, "N° TVA", &recipient.vat_number);
    html.push_str("</div></div>");

    // Metadata
    let meta = &layout.meta;
    html.push_str("<div class=\"meta\">");
    for (label, value) in [
        ("Numéro", meta.number.as_str()),
        ("Date d'émission", meta.issue_date.as_str()),
        ("Date d'échéance", meta.due_date.as_str()),
        ("Mode de paiement", meta.payment_method.as_str()),
    ] {
        html.push_str(&format!(
            "<div class=\"box\"><div class=\"label\">{}</div><div>{}</div></div>",
            escape_html(label),
            escape_html(value)
        ));
    }
    html.push_str("</div>");

    // Line items
    html.push_str("<table class=\"lines\"><thead><tr>");
    for column in &layout.table.columns {
        let class = if column.is_numeric() { " class=\"num\"" } else { "" };
        html.push_str(&format!("<th{}>{}</th>", class, escape_html(column.label())));
    }
    html.push_str("</tr></thead><tbody>");
    for row in &layout.table.rows {
        html.push_str("<tr>");
        for column in &layout.table.columns {
            let class = if column.is_numeric() { " class=\"num\"" } else { "" };
            html.push_str(&format!("<td{}>{}</td>", class, escape_html(row.cell(*column))));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");

    // Totals
    let totals = &layout.totals;
    html.push_str("<div class=\"totals\">");
    html.push_str(&format!(
        "<div class=\"row\"><span>{}</span><span>{}</span></div>",
        escape_html(&totals.subtotal_label),
        escape_html(&totals.formatted)
    ));
    html.push_str(&format!(
        "<div class=\"row grand\"><span>{}</span><span>{}</span></div>",
        escape_html(&totals.total_label),
        escape_html(&totals.formatted)
    ));
    if let Some(notice) = totals.vat_notice.as_deref() {
        html.push_str(&format!("<div class=\"vat\">{}</div>", escape_html(notice)));
    }
    html.push_str("</div>");

    if let Some(notes) = layout.notes.as_deref() {
        html.push_str(&format!("<div class=\"notes\">{}</div>", escape_html(notes)));
    }

    // Terms
    let terms = &layout.terms;
    html.push_str("<div class=\"terms\"><h3>Conditions de paiement</h3>");
    html.push_str(&format!("<p>{}</p>", escape_html(&terms.payment_terms)));
    if !terms.bank.is_empty() {
        let mut bank = Vec::new();
        if !terms.bank.bank_name.is_empty() {
            bank.push(terms.bank.bank_name.clone());
        }
        if !terms.bank.iban.is_empty() {
            bank.push(format!("IBAN {}", terms.bank.iban));
        }
        if !terms.bank.bic.is_empty() {
            bank.push(format!("BIC {}", terms.bank.bic));
        }
        html.push_str(&format!("<p>{}</p>", escape_html(&bank.join(" - "))));
    }
    for line in terms.disclosures() {
        html.push_str(&format!("<p>{}</p>", escape_html(line)));
    }
    html.push_str("</div>");

    if !layout.footer.is_empty() {
        html.push_str(&format!("<div class=\"footer\">{}</div>", escape_html(&layout.footer)));
    }

    html.push_str("</div></body></html>");
    html
}
