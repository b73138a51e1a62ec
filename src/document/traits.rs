//! Traits for renderer standardization.

use async_trait::async_trait;
use serde::Serialize;
use utoipa::ToSchema;

use super::{InvoiceLayout, RenderError};

/// Which backend produced a document.
///
/// The serialized names are the values the front-end already understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum RenderMethod {
    #[serde(rename = "puppeteer")]
    Engine,
    #[serde(rename = "jspdf")]
    Primitive,
}

impl RenderMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMethod::Engine => "puppeteer",
            RenderMethod::Primitive => "jspdf",
        }
    }
}

/// Trait for document renderers.
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    fn method(&self) -> RenderMethod;

    /// Render the layout into PDF bytes.
    async fn render(&self, layout: &InvoiceLayout) -> Result<Vec<u8>, RenderError>;
}
