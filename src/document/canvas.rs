//! Primitive-drawing PDF renderer.
//!
//! Draws an approximation of the HTML template straight onto a printpdf canvas
//! with a running top-down cursor. Used only when the engine renderer fails.

use async_trait::async_trait;
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, CustomPdfConformance, IndirectFontRef, Line, Mm, PdfConformance,
    PdfDocument, PdfDocumentReference, PdfLayerReference, Point, Rect, Rgb,
};
use std::io::BufWriter;

use super::common::{parse_instant, sanitize_filename, to_pdf_text, wrap_text_lines};
use super::layout::{Column, InvoiceLayout};
use super::traits::{DocumentRenderer, RenderMethod};
use super::RenderError;

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN_X: f32 = 15.0;
const MARGIN_TOP: f32 = 15.0;
const CONTENT_BOTTOM: f32 = 24.0;
const FOOTER_Y: f32 = 10.0;
const LINE_H: f32 = 4.4;
const PT_TO_MM: f32 = 25.4 / 72.0;
// Average Helvetica advance as a fraction of the em; close enough for right alignment.
const AVG_CHAR_EM: f32 = 0.52;

const ACCENT: (f32, f32, f32) = (0.118, 0.227, 0.541);
const SHADE: (f32, f32, f32) = (0.953, 0.957, 0.965);
const MUTED: (f32, f32, f32) = (0.42, 0.45, 0.5);
const BLACK: (f32, f32, f32) = (0.067, 0.094, 0.153);
const WHITE: (f32, f32, f32) = (1.0, 1.0, 1.0);

fn rgb(c: (f32, f32, f32)) -> Color {
    Color::Rgb(Rgb::new(c.0, c.1, c.2, None))
}

fn text_width_mm(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * AVG_CHAR_EM * PT_TO_MM
}

fn chars_for_width(width_mm: f32, size: f32) -> usize {
    ((width_mm / (size * AVG_CHAR_EM * PT_TO_MM)).floor() as usize).max(4)
}

fn column_width(column: Column, has_date: bool) -> f32 {
    match column {
        Column::Date => 22.0,
        Column::Description => {
            if has_date {
                78.0
            } else {
                100.0
            }
        }
        Column::Quantity => 18.0,
        Column::Rate => 30.0,
        Column::Amount => 32.0,
    }
}

/// Drawing state for one document: current page, fonts and the vertical cursor.
struct Canvas {
    doc: PdfDocumentReference,
    pages: Vec<PdfLayerReference>,
    font: IndirectFontRef,
    bold: IndirectFontRef,
    document_id: String,
    y: f32,
}

impl Canvas {
    fn new(title: &str, document_id: String, stamp: time::OffsetDateTime) -> Result<Self, RenderError> {
        let (doc, page, layer) = PdfDocument::new(to_pdf_text(title), Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        let doc = doc
            .with_conformance(PdfConformance::Custom(CustomPdfConformance {
                requires_icc_profile: false,
                requires_xmp_metadata: false,
                ..Default::default()
            }))
            .with_document_id(document_id.clone())
            .with_creation_date(stamp)
            .with_mod_date(stamp)
            .with_metadata_date(stamp);

        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| RenderError::Drawing(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| RenderError::Drawing(e.to_string()))?;
        let first = doc.get_page(page).get_layer(layer);

        Ok(Self {
            doc,
            pages: vec![first],
            font,
            bold,
            document_id,
            y: PAGE_H,
        })
    }

    fn layer(&self) -> &PdfLayerReference {
        // `pages` always holds at least the first page.
        &self.pages[self.pages.len() - 1]
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        self.pages.push(self.doc.get_page(page).get_layer(layer));
        self.y = PAGE_H - MARGIN_TOP;
    }

    /// Start a new page when fewer than `height` millimetres remain above the footer.
    fn ensure_space(&mut self, height: f32) -> bool {
        if self.y - height < CONTENT_BOTTOM {
            self.new_page();
            true
        } else {
            false
        }
    }

    fn text(&self, text: &str, size: f32, x: f32, y: f32, bold: bool, color: (f32, f32, f32)) {
        let layer = self.layer();
        layer.set_fill_color(rgb(color));
        let font = if bold { &self.bold } else { &self.font };
        layer.use_text(to_pdf_text(text), size, Mm(x), Mm(y), font);
    }

    fn text_right(&self, text: &str, size: f32, x_right: f32, y: f32, bold: bool, color: (f32, f32, f32)) {
        let clean = to_pdf_text(text);
        let x = (x_right - text_width_mm(&clean, size)).max(MARGIN_X);
        self.text(&clean, size, x, y, bold, color);
    }

    fn rule(&self, x1: f32, x2: f32, y: f32, thickness: f32, color: (f32, f32, f32)) {
        let layer = self.layer();
        layer.set_outline_color(rgb(color));
        layer.set_outline_thickness(thickness);
        layer.add_line(Line {
            points: vec![
                (Point::new(Mm(x1), Mm(y)), false),
                (Point::new(Mm(x2), Mm(y)), false),
            ],
            is_closed: false,
        });
    }

    fn fill_rect(&self, x: f32, y_top: f32, w: f32, h: f32, color: (f32, f32, f32)) {
        let layer = self.layer();
        layer.set_fill_color(rgb(color));
        let rect = Rect::new(Mm(x), Mm(y_top - h), Mm(x + w), Mm(y_top)).with_mode(PaintMode::Fill);
        layer.add_rect(rect);
    }

    fn stroke_rect(&self, x: f32, y_top: f32, w: f32, h: f32) {
        let layer = self.layer();
        layer.set_outline_color(rgb(MUTED));
        layer.set_outline_thickness(0.6);
        let rect = Rect::new(Mm(x), Mm(y_top - h), Mm(x + w), Mm(y_top)).with_mode(PaintMode::Stroke);
        layer.add_rect(rect);
    }

    /// Bordered box with a bold caption and one text line per entry; returns the box height.
    fn boxed_lines(&self, x: f32, y_top: f32, w: f32, caption: &str, lines: &[String]) -> f32 {
        let h = 6.5 + (lines.len().max(1) as f32) * LINE_H + 2.0;
        self.stroke_rect(x, y_top, w, h);
        self.text(caption, 8.0, x + 3.0, y_top - 4.8, true, MUTED);
        let mut y = y_top - 4.8 - LINE_H - 0.6;
        for line in lines {
            self.text(line, 9.0, x + 3.0, y, false, BLACK);
            y -= LINE_H;
        }
        h
    }

    fn save(self) -> Result<Vec<u8>, RenderError> {
        let mut writer = BufWriter::new(Vec::<u8>::new());
        self.doc
            .save(&mut writer)
            .map_err(|e| RenderError::Drawing(e.to_string()))?;
        let mut pdf = writer
            .into_inner()
            .map_err(|e| RenderError::Drawing(e.to_string()))?;
        stamp_trailer_id(&mut pdf, &self.document_id);
        Ok(pdf)
    }
}

/// Overwrite both trailer `/ID` strings in place. printpdf fills them with
/// random characters on every save; equal-length literals keep the xref offsets valid.
fn stamp_trailer_id(pdf: &mut [u8], id: &str) {
    let Some(start) = pdf.windows(3).rposition(|w| w == b"/ID") else {
        return;
    };

    let mut pos = start + 3;
    for _ in 0..2 {
        let Some(open) = pdf[pos..].iter().position(|&b| b == b'(').map(|p| pos + p) else {
            return;
        };
        let Some(close) = pdf[open + 1..].iter().position(|&b| b == b')').map(|p| open + 1 + p) else {
            return;
        };
        for (slot, byte) in pdf[open + 1..close].iter_mut().zip(id.bytes().cycle()) {
            *slot = byte;
        }
        pos = close + 1;
    }
}

/// Fallback renderer built on printpdf primitives.
#[derive(Debug, Clone, Default)]
pub struct PrimitiveRenderer;

impl PrimitiveRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous drawing pass; the async trait method only wraps this.
    pub fn draw(&self, layout: &InvoiceLayout) -> Result<Vec<u8>, RenderError> {
        validate_numbers(layout)?;

        let stamp = document_stamp(layout.issue_date_raw.as_deref());
        let document_id = document_id(&layout.meta.number);
        let mut canvas = Canvas::new(
            &format!("{} {}", layout.title, layout.meta.number),
            document_id,
            stamp,
        )?;

        draw_header(&mut canvas, layout);
        draw_parties(&mut canvas, layout);
        draw_table(&mut canvas, layout);
        draw_totals(&mut canvas, layout);
        draw_terms(&mut canvas, layout);
        draw_footers(&canvas, layout);

        canvas.save()
    }
}

#[async_trait]
impl DocumentRenderer for PrimitiveRenderer {
    fn method(&self) -> RenderMethod {
        RenderMethod::Primitive
    }

    async fn render(&self, layout: &InvoiceLayout) -> Result<Vec<u8>, RenderError> {
        self.draw(layout)
    }
}

fn validate_numbers(layout: &InvoiceLayout) -> Result<(), RenderError> {
    if !layout.totals.amount.is_finite() {
        return Err(RenderError::InvalidNumber {
            field: "total".to_string(),
            value: layout.totals.amount,
        });
    }
    for (idx, row) in layout.table.rows.iter().enumerate() {
        if !row.amount_value.is_finite() {
            return Err(RenderError::InvalidNumber {
                field: format!("row {}", idx + 1),
                value: row.amount_value,
            });
        }
    }
    Ok(())
}

/// 32-character identifier derived from the invoice number.
fn document_id(number: &str) -> String {
    let base = sanitize_filename(number, "facture").replace('-', "");
    let mut id: String = base.chars().filter(|c| c.is_ascii_alphanumeric()).take(32).collect();
    while id.len() < 32 {
        id.push('0');
    }
    id
}

fn document_stamp(issue_date: Option<&str>) -> time::OffsetDateTime {
    use chrono::{Datelike, Timelike};

    issue_date
        .and_then(parse_instant)
        .and_then(|dt| {
            let month = time::Month::try_from(dt.month() as u8).ok()?;
            let date = time::Date::from_calendar_date(dt.year(), month, dt.day() as u8).ok()?;
            let clock = time::Time::from_hms(dt.hour() as u8, dt.minute() as u8, dt.second() as u8).ok()?;
            Some(time::PrimitiveDateTime::new(date, clock).assume_utc())
        })
        .unwrap_or(time::OffsetDateTime::UNIX_EPOCH)
}

fn draw_header(canvas: &mut Canvas, layout: &InvoiceLayout) {
    const BAND_H: f32 = 28.0;

    canvas.fill_rect(0.0, PAGE_H, PAGE_W, BAND_H, ACCENT);
    canvas.text(&layout.title, 22.0, MARGIN_X, PAGE_H - 14.0, true, WHITE);
    canvas.text(
        &format!("N° {}", layout.meta.number),
        11.0,
        MARGIN_X,
        PAGE_H - 21.5,
        false,
        WHITE,
    );
    if !layout.issuer.name.is_empty() {
        canvas.text_right(&layout.issuer.name, 11.0, PAGE_W - MARGIN_X, PAGE_H - 14.0, true, WHITE);
    }

    let rule_y = PAGE_H - BAND_H - 2.5;
    canvas.rule(MARGIN_X, PAGE_W - MARGIN_X, rule_y, 1.4, ACCENT);
    canvas.y = rule_y - 8.0;
}

fn draw_parties(canvas: &mut Canvas, layout: &InvoiceLayout) {
    let top = canvas.y;
    let issuer = &layout.issuer;

    // Issuer text block (left column).
    let mut y = top;
    canvas.text(&issuer.name, 11.0, MARGIN_X, y, true, BLACK);
    y -= 5.0;
    let mut issuer_lines: Vec<String> = Vec::new();
    if !issuer.owner_name.is_empty() && issuer.owner_name != issuer.name {
        issuer_lines.push(issuer.owner_name.clone());
    }
    issuer_lines.extend(issuer.address_lines.iter().cloned());
    for (label, value) in [
        ("Email", &issuer.email),
        ("Tel.", &issuer.phone),
        ("SIRET", &issuer.siret),
        ("TVA", &issuer.vat_number),
    ] {
        if !value.is_empty() {
            issuer_lines.push(format!("{label} : {value}"));
        }
    }
    for line in &issuer_lines {
        canvas.text(line, 9.0, MARGIN_X, y, false, BLACK);
        y -= LINE_H;
    }
    let issuer_bottom = y;

    // Metadata box (right column).
    let box_x = 115.0;
    let box_w = PAGE_W - MARGIN_X - box_x;
    let meta = &layout.meta;
    let mut meta_lines = vec![
        format!("Facture N° : {}", meta.number),
        format!("Date : {}", meta.issue_date),
    ];
    if !meta.due_date.is_empty() {
        meta_lines.push(format!("Échéance : {}", meta.due_date));
    }
    if !meta.payment_method.is_empty() {
        meta_lines.push(format!("Paiement : {}", meta.payment_method));
    }
    let meta_h = canvas.boxed_lines(box_x, top + 4.0, box_w, "INFORMATIONS", &meta_lines);

    // Recipient box under the metadata box.
    let recipient = &layout.recipient;
    let mut recipient_lines = vec![recipient.name.clone()];
    if !recipient.company.is_empty() {
        recipient_lines.push(recipient.company.clone());
    }
    recipient_lines.extend(recipient.address_lines.iter().cloned());
    recipient_lines.push(recipient.email.clone());
    recipient_lines.push(recipient.phone.clone());
    let recipient_top = top + 4.0 - meta_h - 4.0;
    let recipient_h = canvas.boxed_lines(box_x, recipient_top, box_w, "DESTINATAIRE", &recipient_lines);

    canvas.y = issuer_bottom.min(recipient_top - recipient_h) - 8.0;
}

fn draw_table_header(canvas: &Canvas, layout: &InvoiceLayout, widths: &[f32]) -> f32 {
    const HEADER_H: f32 = 8.0;
    let table_w: f32 = widths.iter().sum();
    canvas.fill_rect(MARGIN_X, canvas.y, table_w, HEADER_H, ACCENT);

    let baseline = canvas.y - 5.4;
    let mut x = MARGIN_X;
    for (column, width) in layout.table.columns.iter().zip(widths) {
        if column.is_numeric() {
            canvas.text_right(column.label(), 9.0, x + width - 2.0, baseline, true, WHITE);
        } else {
            canvas.text(column.label(), 9.0, x + 2.0, baseline, true, WHITE);
        }
        x += width;
    }
    HEADER_H
}

fn draw_table(canvas: &mut Canvas, layout: &InvoiceLayout) {
    let has_date = layout.table.has_date_column();
    let widths: Vec<f32> = layout
        .table
        .columns
        .iter()
        .map(|c| column_width(*c, has_date))
        .collect();
    let table_w: f32 = widths.iter().sum();
    let desc_chars = chars_for_width(column_width(Column::Description, has_date) - 4.0, 9.0);

    canvas.ensure_space(20.0);
    let header_h = draw_table_header(canvas, layout, &widths);
    canvas.y -= header_h;

    for (idx, row) in layout.table.rows.iter().enumerate() {
        let desc_lines = {
            let lines = wrap_text_lines(&to_pdf_text(&row.description), desc_chars);
            if lines.is_empty() {
                vec![String::new()]
            } else {
                lines
            }
        };
        let row_h = desc_lines.len() as f32 * LINE_H + 3.2;

        if canvas.ensure_space(row_h) {
            let header_h = draw_table_header(canvas, layout, &widths);
            canvas.y -= header_h;
        }

        if idx % 2 == 1 {
            canvas.fill_rect(MARGIN_X, canvas.y, table_w, row_h, SHADE);
        }

        let baseline = canvas.y - 4.6;
        let mut x = MARGIN_X;
        for (column, width) in layout.table.columns.iter().zip(&widths) {
            match column {
                Column::Description => {
                    let mut y = baseline;
                    for line in &desc_lines {
                        canvas.text(line, 9.0, x + 2.0, y, false, BLACK);
                        y -= LINE_H;
                    }
                }
                c if c.is_numeric() => {
                    canvas.text_right(row.cell(*c), 9.0, x + width - 2.0, baseline, false, BLACK);
                }
                c => canvas.text(row.cell(*c), 9.0, x + 2.0, baseline, false, BLACK),
            }
            x += width;
        }

        canvas.y -= row_h;
    }

    canvas.rule(MARGIN_X, MARGIN_X + table_w, canvas.y, 0.4, MUTED);
    canvas.y -= 6.0;
}

fn draw_totals(canvas: &mut Canvas, layout: &InvoiceLayout) {
    let totals = &layout.totals;
    let right = PAGE_W - MARGIN_X - 2.0;
    let label_x = 120.0;

    canvas.ensure_space(28.0);
    canvas.rule(label_x - 3.0, PAGE_W - MARGIN_X, canvas.y, 0.9, ACCENT);
    canvas.y -= 5.5;

    canvas.text(&totals.subtotal_label, 9.5, label_x, canvas.y, false, BLACK);
    canvas.text_right(&totals.formatted, 9.5, right, canvas.y, false, BLACK);
    canvas.y -= 6.0;

    canvas.text(&totals.total_label, 11.0, label_x, canvas.y, true, BLACK);
    canvas.text_right(&totals.formatted, 11.0, right, canvas.y, true, BLACK);
    canvas.y -= 5.0;

    if let Some(notice) = totals.vat_notice.as_deref() {
        canvas.text_right(notice, 7.5, right, canvas.y, false, MUTED);
        canvas.y -= 4.0;
    }
    canvas.y -= 4.0;

    if let Some(notes) = layout.notes.as_deref() {
        let width = PAGE_W - 2.0 * MARGIN_X;
        for raw in notes.lines() {
            for line in wrap_text_lines(&to_pdf_text(raw), chars_for_width(width, 9.0)) {
                canvas.ensure_space(LINE_H);
                canvas.text(&line, 9.0, MARGIN_X, canvas.y, false, BLACK);
                canvas.y -= LINE_H;
            }
        }
        canvas.y -= 3.0;
    }
}

fn draw_terms(canvas: &mut Canvas, layout: &InvoiceLayout) {
    let terms = &layout.terms;
    let width = PAGE_W - 2.0 * MARGIN_X;
    let max_chars = chars_for_width(width, 8.0);

    canvas.ensure_space(14.0);
    canvas.text("Conditions de paiement", 9.5, MARGIN_X, canvas.y, true, BLACK);
    canvas.y -= 5.0;

    let mut paragraphs: Vec<String> = vec![terms.payment_terms.clone()];
    if !terms.bank.is_empty() {
        let bank = [
            terms.bank.bank_name.clone(),
            if terms.bank.iban.is_empty() { String::new() } else { format!("IBAN {}", terms.bank.iban) },
            if terms.bank.bic.is_empty() { String::new() } else { format!("BIC {}", terms.bank.bic) },
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" - ");
        paragraphs.push(bank);
    }
    paragraphs.extend(terms.disclosures().into_iter().map(str::to_string));

    for paragraph in paragraphs {
        for line in wrap_text_lines(&to_pdf_text(&paragraph), max_chars) {
            canvas.ensure_space(4.0);
            canvas.text(&line, 8.0, MARGIN_X, canvas.y, false, BLACK);
            canvas.y -= 3.8;
        }
        canvas.y -= 1.2;
    }
}

fn draw_footers(canvas: &Canvas, layout: &InvoiceLayout) {
    let total = canvas.pages.len();
    let footer = to_pdf_text(&layout.footer);
    for (idx, layer) in canvas.pages.iter().enumerate() {
        layer.set_outline_color(rgb(MUTED));
        layer.set_outline_thickness(0.3);
        layer.add_line(Line {
            points: vec![
                (Point::new(Mm(MARGIN_X), Mm(FOOTER_Y + 4.5)), false),
                (Point::new(Mm(PAGE_W - MARGIN_X), Mm(FOOTER_Y + 4.5)), false),
            ],
            is_closed: false,
        });

        layer.set_fill_color(rgb(MUTED));
        if !footer.is_empty() {
            layer.use_text(footer.clone(), 7.0, Mm(MARGIN_X), Mm(FOOTER_Y), &canvas.font);
        }
        let page_label = format!("Page {} / {}", idx + 1, total);
        let x = PAGE_W - MARGIN_X - text_width_mm(&page_label, 7.0);
        layer.use_text(page_label, 7.0, Mm(x), Mm(FOOTER_Y), &canvas.font);
    }
}
