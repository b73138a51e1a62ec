//! Invoice domain records and the amount precedence chain.

pub mod amount;
pub mod models;

pub use amount::{resolve_amount, resolve_amount_with_source, AmountSource};
pub use models::{
    Client, CompanyProfile, DocumentKind, Invoice, InvoiceStatus, PricingType, Service, User,
};
