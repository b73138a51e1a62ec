use actix_cors::Cors;
use actix_web::middleware::Compress;
use actix_web::{http::header, web, App, HttpServer};
use actix_web_prometheus::PrometheusMetricsBuilder;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub mod config;
pub mod db;
pub mod delivery;
pub mod document;
pub mod invoice;
pub mod mail;
pub mod metrics;

pub use crate::config::AppConfig;
pub use crate::db::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: &str) -> Self {
        Self {
            error: error_type.to_string(),
            message: message.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::delivery::handlers::send_invoice_email,
        crate::delivery::handlers::preview_invoice,
        crate::delivery::handlers::download_invoice_pdf,
        crate::delivery::handlers::health
    ),
    components(
        schemas(
            delivery::models::SendInvoiceRequest,
            delivery::models::SendInvoiceResponse,
            delivery::models::DeliveryInfo,
            delivery::models::FailureResponse,
            delivery::models::HealthResponse,
            document::RenderMethod,
            invoice::CompanyProfile,
            invoice::Service,
            invoice::PricingType,
            mail::CustomEmailData,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Invoice Delivery", description = "Invoice PDF rendering and email delivery.")
    ),
    servers(
        (url = "http://127.0.0.1:8080", description = "Localhost")
    )
)]
pub struct ApiDoc;

pub async fn run() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env();
    let missing = config.missing_credentials();
    if !missing.is_empty() {
        log::warn!(
            "Missing credentials: {}. Invoice delivery will fail until they are set.",
            missing.join(", ")
        );
    }

    let bind = (config.bind_address.clone(), config.port);
    let app_state = match AppState::new(config) {
        Ok(state) => web::Data::new(state),
        Err(e) => {
            log::error!("Failed to initialise application state: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
        }
    };

    metrics::register_metrics();
    let prometheus = PrometheusMetricsBuilder::new("facture_dispatch_server")
        .endpoint("/metrics")
        .build()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

    log::info!("Starting server at http://{}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        let app_state = app_state.clone();
        let prometheus = prometheus.clone();
        let cors = Cors::default()
            .allowed_origin("http://localhost:5173")
            .allowed_origin("http://localhost:3000")
            .allowed_origin("http://localhost:8080")
            .allowed_origin("http://127.0.0.1:8080")
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![
                header::AUTHORIZATION,
                header::ACCEPT,
                header::CONTENT_TYPE,
            ])
            .expose_headers(vec![header::HeaderName::from_static("x-pdf-method")])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Compress::default())
            .wrap(prometheus)
            .wrap(cors)
            .app_data(app_state)
            .service(web::scope("/api").configure(delivery::handlers::config))
            .service(
                web::resource("/metrics/pipeline").route(web::get().to(metrics::pipeline_metrics)),
            )
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
    })
    .keep_alive(actix_web::http::KeepAlive::Os)
    .bind(bind)?
    .run()
    .await
}
