//! Delivery module - the invoice email pipeline and its HTTP surface.
//!
//! - `orchestrator` - staged pipeline from invoice id to delivered email
//! - `models` - request/response bodies
//! - `handlers` - actix-web endpoints

pub mod handlers;
pub mod models;
pub mod orchestrator;

pub use orchestrator::{DeliveryOrchestrator, DeliveryOutcome, PipelineError, PipelineStage, PreparedInvoice};
