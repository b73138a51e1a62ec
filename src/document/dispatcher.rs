//! Primary-then-fallback rendering.

use std::sync::Arc;

use super::traits::{DocumentRenderer, RenderMethod};
use super::{InvoiceLayout, RenderError};
use crate::metrics;

/// Result of a successful render, tagged with the backend that produced it.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub method: RenderMethod,
    pub pdf: Vec<u8>,
    pub byte_length: usize,
    /// True when the primary renderer failed and the fallback was used.
    pub degraded: bool,
    pub primary_error: Option<String>,
}

#[derive(Clone)]
pub struct RenderDispatcher {
    primary: Arc<dyn DocumentRenderer>,
    fallback: Arc<dyn DocumentRenderer>,
}

impl RenderDispatcher {
    pub fn new(primary: Arc<dyn DocumentRenderer>, fallback: Arc<dyn DocumentRenderer>) -> Self {
        Self { primary, fallback }
    }

    pub async fn render(&self, layout: &InvoiceLayout) -> Result<RenderOutcome, RenderError> {
        self.render_with(layout, |_| {}).await
    }

    /// Like [`RenderDispatcher::render`], calling `on_fallback` with the primary
    /// failure right before the fallback renderer starts.
    pub async fn render_with<F>(&self, layout: &InvoiceLayout, on_fallback: F) -> Result<RenderOutcome, RenderError>
    where
        F: FnOnce(&str),
    {
        let primary_error = match self.primary.render(layout).await {
            Ok(pdf) => {
                metrics::record_render(self.primary.method().as_str());
                log::info!(
                    "Invoice {} rendered with {} ({} bytes)",
                    layout.meta.number,
                    self.primary.method().as_str(),
                    pdf.len()
                );
                return Ok(RenderOutcome {
                    method: self.primary.method(),
                    byte_length: pdf.len(),
                    pdf,
                    degraded: false,
                    primary_error: None,
                });
            }
            Err(e) => e.to_string(),
        };

        metrics::record_render_failure(self.primary.method().as_str());
        log::warn!(
            "Primary renderer failed for invoice {}: {}; trying {}",
            layout.meta.number,
            primary_error,
            self.fallback.method().as_str()
        );
        on_fallback(&primary_error);

        match self.fallback.render(layout).await {
            Ok(pdf) => {
                metrics::record_render(self.fallback.method().as_str());
                log::info!(
                    "Invoice {} rendered with fallback {} ({} bytes)",
                    layout.meta.number,
                    self.fallback.method().as_str(),
                    pdf.len()
                );
                Ok(RenderOutcome {
                    method: self.fallback.method(),
                    byte_length: pdf.len(),
                    pdf,
                    degraded: true,
                    primary_error: Some(primary_error),
                })
            }
            Err(e) => {
                metrics::record_render_failure(self.fallback.method().as_str());
                log::error!(
                    "Fallback renderer also failed for invoice {}: {}",
                    layout.meta.number,
                    e
                );
                Err(RenderError::Combined {
                    primary: primary_error,
                    fallback: e.to_string(),
                })
            }
        }
    }
}
