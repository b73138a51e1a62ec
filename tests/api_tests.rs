mod common;

#[cfg(test)]
mod api_tests {
    use super::common::*;
    use actix_web::{http::StatusCode, test, web, App};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use utoipa::OpenApi;

    use facture_dispatch_server::{delivery, ApiDoc, AppConfig};

    macro_rules! app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state))
                    .service(web::scope("/api").configure(delivery::handlers::config)),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_send_email_success() {
        let store = seeded_store(MockStore::new()).await;
        let channel = Arc::new(MockChannel::new());
        let app = app!(app_state(full_config(), store, channel.clone(), degraded_dispatcher()));

        let req = test::TestRequest::post()
            .uri("/api/invoices/send-email")
            .set_json(json!({ "invoiceId": "inv-1" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["emailStatus"], "sent");
        assert_eq!(body["pdfMethod"], "jspdf");
        assert_eq!(body["info"]["recipient"], "jean.dupont@example.com");
        assert_eq!(body["info"]["amount"], 1200.0);
        assert_eq!(body["info"]["degraded"], true);
        assert_eq!(body["info"]["statusUpdated"], true);
        assert!(body["message"].as_str().unwrap().contains("FAC-2024-001"));

        assert_eq!(channel.sent().await.len(), 1);
    }

    #[actix_web::test]
    async fn test_send_email_unknown_invoice() {
        let app = app!(app_state(
            full_config(),
            Arc::new(MockStore::new()),
            Arc::new(MockChannel::new()),
            degraded_dispatcher()
        ));

        let req = test::TestRequest::post()
            .uri("/api/invoices/send-email")
            .set_json(json!({ "invoiceId": "missing" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "NotFound");
        assert_eq!(body["message"], "Invoice missing not found");
    }

    #[actix_web::test]
    async fn test_send_email_malformed_body() {
        let app = app!(app_state(
            full_config(),
            Arc::new(MockStore::new()),
            Arc::new(MockChannel::new()),
            degraded_dispatcher()
        ));

        let req = test::TestRequest::post()
            .uri("/api/invoices/send-email")
            .insert_header(("Content-Type", "application/json"))
            .set_payload("{ \"invoiceId\": ")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "ValidationError");
    }

    #[actix_web::test]
    async fn test_send_email_delivery_failure() {
        let store = seeded_store(MockStore::new()).await;
        let channel = Arc::new(MockChannel::rejecting(401, "The provided authorization grant is invalid"));
        let app = app!(app_state(full_config(), store, channel, degraded_dispatcher()));

        let req = test::TestRequest::post()
            .uri("/api/invoices/send-email")
            .set_json(json!({ "invoiceId": "inv-1" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "EmailDeliveryFailed");
        assert_eq!(body["details"]["providerStatus"], 401);
        assert!(body["hint"].is_string());
    }

    #[actix_web::test]
    async fn test_preview_returns_html() {
        let store = seeded_store(MockStore::new()).await;
        let app = app!(app_state(full_config(), store, Arc::new(MockChannel::new()), degraded_dispatcher()));

        let req = test::TestRequest::get().uri("/api/invoices/inv-1/preview").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/html"));
        let body = test::read_body(resp).await;
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("FAC-2024-001"));
        assert!(html.contains("Jean Dupont"));
    }

    #[actix_web::test]
    async fn test_preview_unknown_invoice() {
        let app = app!(app_state(
            full_config(),
            Arc::new(MockStore::new()),
            Arc::new(MockChannel::new()),
            degraded_dispatcher()
        ));

        let req = test::TestRequest::get().uri("/api/invoices/nope/preview").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "NotFound");
        assert!(body["timestamp"].is_string());
    }

    #[actix_web::test]
    async fn test_pdf_download_names_the_renderer() {
        let store = seeded_store(MockStore::new()).await;
        let app = app!(app_state(full_config(), store, Arc::new(MockChannel::new()), degraded_dispatcher()));

        let req = test::TestRequest::get().uri("/api/invoices/inv-1/pdf").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get("content-type").unwrap(), "application/pdf");
        assert_eq!(resp.headers().get("x-pdf-method").unwrap(), "jspdf");
        assert_eq!(
            resp.headers().get("content-disposition").unwrap(),
            "inline; filename=\"facture-FAC-2024-001.pdf\""
        );
        let body = test::read_body(resp).await;
        assert!(body.starts_with(b"%PDF"));
    }

    #[actix_web::test]
    async fn test_health_reports_missing_credentials() {
        let app = app!(app_state(
            AppConfig::default(),
            Arc::new(MockStore::new()),
            Arc::new(MockChannel::new()),
            degraded_dispatcher()
        ));

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["missingCredentials"][0], "SUPABASE_URL");
        assert_eq!(body["missingCredentials"].as_array().unwrap().len(), 4);
    }

    #[actix_web::test]
    async fn test_health_ok_when_configured() {
        let app = app!(app_state(
            full_config(),
            Arc::new(MockStore::new()),
            Arc::new(MockChannel::new()),
            degraded_dispatcher()
        ));

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let resp = test::call_service(&app, req).await;
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "ok");
        assert!(body["missingCredentials"].as_array().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn test_openapi_documents_delivery_routes() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let paths = doc["paths"].as_object().unwrap();

        assert!(paths.contains_key("/api/invoices/send-email"));
        assert!(paths.contains_key("/api/invoices/{id}/preview"));
        assert!(paths.contains_key("/api/invoices/{id}/pdf"));
        assert!(paths.contains_key("/api/health"));
    }
}
