use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::document::RenderMethod;
use crate::invoice::{CompanyProfile, Service};
use crate::mail::CustomEmailData;

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendInvoiceRequest {
    pub invoice_id: String,
    /// Overrides the issuer profile stored on the user.
    #[serde(default)]
    pub company_settings: Option<CompanyProfile>,
    /// Takes precedence over the invoice's embedded services when non-empty.
    #[serde(default)]
    pub services: Option<Vec<Service>>,
    #[serde(default)]
    pub custom_email_data: Option<CustomEmailData>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryInfo {
    pub message_id: Option<String>,
    pub recipient: String,
    pub amount: f64,
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_error: Option<String>,
    pub status_updated: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendInvoiceResponse {
    pub success: bool,
    pub message: String,
    pub email_status: String,
    pub pdf_method: RenderMethod,
    pub info: DeliveryInfo,
}

/// Structured body for every pipeline failure.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FailureResponse {
    pub success: bool,
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub missing_credentials: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_camel_case() {
        let json = r#"{
            "invoiceId": "inv-1",
            "companySettings": { "companyName": "Studio Martin", "paymentTermsDays": 45 },
            "services": [{ "hours": "8", "hourly_rate": 150 }],
            "customEmailData": { "subject": "Votre facture" }
        }"#;

        let request: SendInvoiceRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.invoice_id, "inv-1");
        let profile = request.company_settings.unwrap();
        assert_eq!(profile.company_name, "Studio Martin");
        assert_eq!(profile.payment_terms_days, 45);
        assert_eq!(request.services.unwrap()[0].line_total(), 1200.0);
        assert_eq!(
            request.custom_email_data.unwrap().subject.as_deref(),
            Some("Votre facture")
        );
    }

    #[test]
    fn test_response_wire_names() {
        let response = SendInvoiceResponse {
            success: true,
            message: "ok".to_string(),
            email_status: "sent".to_string(),
            pdf_method: RenderMethod::Primitive,
            info: DeliveryInfo {
                message_id: Some("abc".to_string()),
                recipient: "jean@example.com".to_string(),
                amount: 1200.0,
                degraded: true,
                primary_error: Some("timeout".to_string()),
                status_updated: true,
            },
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["emailStatus"], "sent");
        assert_eq!(json["pdfMethod"], "jspdf");
        assert_eq!(json["info"]["messageId"], "abc");
        assert_eq!(json["info"]["primaryError"], "timeout");
        assert_eq!(json["info"]["statusUpdated"], true);
    }
}
