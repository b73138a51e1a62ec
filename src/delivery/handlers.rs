use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use chrono::Local;

use super::models::{FailureResponse, HealthResponse, SendInvoiceRequest, SendInvoiceResponse};
use super::PipelineError;
use crate::document::html::render_document;
use crate::mail::composer::attachment_filename;
use crate::{AppState, ErrorResponse};

fn error_response(err: &PipelineError) -> HttpResponse {
    HttpResponse::build(err.status_code()).json(ErrorResponse::new(err.error_name(), &err.to_string()))
}

#[utoipa::path(
    post,
    path = "/api/invoices/send-email",
    tag = "Invoice Delivery",
    request_body = SendInvoiceRequest,
    responses(
        (status = 200, description = "Invoice rendered and emailed", body = SendInvoiceResponse),
        (status = 400, description = "Invalid request or invoice without services", body = FailureResponse),
        (status = 404, description = "Invoice, owner or client not found", body = FailureResponse),
        (status = 500, description = "Configuration, rendering, data store or delivery failure", body = FailureResponse)
    )
)]
pub async fn send_invoice_email(
    state: web::Data<AppState>,
    body: web::Json<SendInvoiceRequest>,
) -> impl Responder {
    let request = body.into_inner();
    let today = Local::now().date_naive();

    match state.orchestrator.send_invoice(&request, today).await {
        Ok(outcome) => HttpResponse::Ok().json(SendInvoiceResponse::from(outcome)),
        Err(e) => HttpResponse::build(e.status_code()).json(e.to_failure()),
    }
}

#[utoipa::path(
    get,
    path = "/api/invoices/{id}/preview",
    tag = "Invoice Delivery",
    params(
        ("id" = String, Path, description = "Invoice ID")
    ),
    responses(
        (status = 200, description = "HTML document used for printing", content_type = "text/html"),
        (status = 404, description = "Invoice, owner or client not found", body = ErrorResponse),
        (status = 500, description = "Data store failure", body = ErrorResponse)
    )
)]
pub async fn preview_invoice(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let invoice_id = path.into_inner();

    match state.orchestrator.preview(&invoice_id).await {
        Ok(prepared) => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(render_document(&prepared.layout)),
        Err(e) => {
            log::error!("Preview failed for invoice {}: {}", invoice_id, e);
            error_response(&e)
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/invoices/{id}/pdf",
    tag = "Invoice Delivery",
    params(
        ("id" = String, Path, description = "Invoice ID")
    ),
    responses(
        (status = 200, description = "Rendered PDF; X-Pdf-Method names the renderer", content_type = "application/pdf"),
        (status = 404, description = "Invoice, owner or client not found", body = ErrorResponse),
        (status = 500, description = "Both renderers failed or data store failure", body = ErrorResponse)
    )
)]
pub async fn download_invoice_pdf(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let invoice_id = path.into_inner();

    match state.orchestrator.render_pdf(&invoice_id).await {
        Ok((prepared, outcome)) => HttpResponse::Ok()
            .content_type("application/pdf")
            .insert_header((
                "Content-Disposition",
                format!(
                    "inline; filename=\"{}\"",
                    attachment_filename(&prepared.invoice.invoice_number)
                ),
            ))
            .insert_header(("X-Pdf-Method", outcome.method.as_str()))
            .body(outcome.pdf),
        Err(e) => {
            log::error!("PDF download failed for invoice {}: {}", invoice_id, e);
            error_response(&e)
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Invoice Delivery",
    responses(
        (status = 200, description = "Service is up; lists unset credentials", body = HealthResponse)
    )
)]
pub async fn health(state: web::Data<AppState>) -> impl Responder {
    let missing: Vec<String> = state
        .config
        .missing_credentials()
        .into_iter()
        .map(str::to_string)
        .collect();

    HttpResponse::Ok().json(HealthResponse {
        status: if missing.is_empty() { "ok" } else { "degraded" }.to_string(),
        missing_credentials: missing,
    })
}

/// Malformed JSON bodies get the same failure shape as pipeline validation errors.
fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let body = FailureResponse {
        success: false,
        error: "ValidationError".to_string(),
        message: format!("Invalid request body: {}", err),
        details: None,
        hint: None,
    };
    InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(4 * 1024 * 1024)
            .error_handler(json_error_handler),
    )
    .service(web::resource("/invoices/send-email").route(web::post().to(send_invoice_email)))
    .service(web::resource("/invoices/{id}/preview").route(web::get().to(preview_invoice)))
    .service(web::resource("/invoices/{id}/pdf").route(web::get().to(download_invoice_pdf)))
    .service(web::resource("/health").route(web::get().to(health)));
}
