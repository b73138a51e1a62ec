//! Prometheus counters for the rendering and delivery pipeline.
//!
//! Request metrics come from the middleware on `/metrics`; the pipeline
//! counters live in their own [`REGISTRY`] exported on `/metrics/pipeline`.

use actix_web::{HttpResponse, Responder};
use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref RENDERS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("invoice_renders_total", "Invoice PDFs produced, by renderer"),
        &["method"]
    )
    .expect("invoice_renders_total metric definition");
    pub static ref RENDER_FAILURES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("invoice_render_failures_total", "Renderer failures, by renderer"),
        &["method"]
    )
    .expect("invoice_render_failures_total metric definition");
    pub static ref DELIVERIES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("invoice_deliveries_total", "Invoice email pipeline runs, by outcome"),
        &["outcome"]
    )
    .expect("invoice_deliveries_total metric definition");
}

/// Register the pipeline counters; safe to call more than once.
pub fn register_metrics() {
    for counter in [&*RENDERS_TOTAL, &*RENDER_FAILURES_TOTAL, &*DELIVERIES_TOTAL] {
        if let Err(e) = REGISTRY.register(Box::new(counter.clone())) {
            log::debug!("Metric already registered: {}", e);
        }
    }
}

pub fn record_render(method: &str) {
    RENDERS_TOTAL.with_label_values(&[method]).inc();
}

pub fn record_render_failure(method: &str) {
    RENDER_FAILURES_TOTAL.with_label_values(&[method]).inc();
}

pub fn record_delivery(outcome: &str) {
    DELIVERIES_TOTAL.with_label_values(&[outcome]).inc();
}

pub async fn pipeline_metrics() -> impl Responder {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    match encoder.encode(&REGISTRY.gather(), &mut buffer) {
        Ok(()) => HttpResponse::Ok()
            .content_type(encoder.format_type())
            .body(buffer),
        Err(e) => {
            log::error!("Failed to encode pipeline metrics: {}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}
