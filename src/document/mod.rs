//! Document module - turns an invoice into a printable PDF.
//!
//! - `layout` - renderer-agnostic invoice description
//! - `html` - HTML/CSS template shared by preview and the engine renderer
//! - `engine` - headless browser renderer (primary)
//! - `canvas` - printpdf primitive renderer (fallback)
//! - `dispatcher` - tries the primary renderer, falls back on failure

pub mod canvas;
pub mod common;
pub mod dispatcher;
pub mod engine;
pub mod html;
pub mod layout;
pub mod traits;

pub use canvas::PrimitiveRenderer;
pub use dispatcher::{RenderDispatcher, RenderOutcome};
pub use engine::ChromiumEngine;
pub use layout::InvoiceLayout;
pub use traits::{DocumentRenderer, RenderMethod};

use thiserror::Error;

/// Errors that can occur during document rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create temporary directory: {0}")]
    TempDir(#[source] std::io::Error),
    #[error("failed to write HTML document: {0}")]
    WriteMarkup(#[source] std::io::Error),
    #[error("failed to launch rendering engine '{binary}': {source}")]
    EngineLaunch {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("rendering engine did not finish within {0} seconds")]
    EngineTimeout(u64),
    #[error("rendering engine exited with status {code}: {stderr}")]
    EngineExit { code: i32, stderr: String },
    #[error("failed to read generated PDF: {0}")]
    ReadPdf(#[source] std::io::Error),
    #[error("rendering engine produced no valid PDF ({0} bytes)")]
    InvalidPdf(usize),
    #[error("invalid numeric value for {field}: {value}")]
    InvalidNumber { field: String, value: f64 },
    #[error("PDF drawing failed: {0}")]
    Drawing(String),
    #[error("both renderers failed (primary: {primary}; fallback: {fallback})")]
    Combined { primary: String, fallback: String },
}
