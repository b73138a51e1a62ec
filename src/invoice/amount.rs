//! Amount precedence for an invoice.
//!
//! Embedded services win over stored totals because stored totals lag behind
//! edits; the client-wide lookup only exists for invoices created before
//! services were embedded.

use super::models::{Invoice, Service};

/// Which tier of the precedence chain produced an amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountSource {
    EmbeddedServices,
    StoredSubtotal,
    StoredNetAmount,
    ClientServices,
    Nothing,
}

impl AmountSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AmountSource::EmbeddedServices => "embedded_services",
            AmountSource::StoredSubtotal => "stored_subtotal",
            AmountSource::StoredNetAmount => "stored_net_amount",
            AmountSource::ClientServices => "client_services",
            AmountSource::Nothing => "none",
        }
    }
}

fn sum_services<'a>(services: impl IntoIterator<Item = &'a Service>) -> f64 {
    services.into_iter().map(Service::line_total).sum()
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// Resolve the invoice total together with the tier that produced it.
///
/// `services` is the global service collection; only rows whose `client_id`
/// matches the invoice are considered for the last tier.
pub fn resolve_amount_with_source(invoice: &Invoice, services: &[Service]) -> (f64, AmountSource) {
    if !invoice.services.is_empty() {
        return (sum_services(&invoice.services), AmountSource::EmbeddedServices);
    }

    if let Some(subtotal) = positive(invoice.subtotal) {
        return (subtotal, AmountSource::StoredSubtotal);
    }

    if let Some(net) = positive(invoice.net_amount) {
        return (net, AmountSource::StoredNetAmount);
    }

    let client_total = sum_services(
        services
            .iter()
            .filter(|s| s.client_id.as_deref() == Some(invoice.client_id.as_str())),
    );
    if client_total != 0.0 {
        return (client_total, AmountSource::ClientServices);
    }

    (0.0, AmountSource::Nothing)
}

pub fn resolve_amount(invoice: &Invoice, services: &[Service]) -> f64 {
    resolve_amount_with_source(invoice, services).0
}
