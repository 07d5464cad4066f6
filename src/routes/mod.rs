// Route exports
pub mod access;
pub mod auth;
pub mod crm;
pub mod error;
pub mod export;
pub mod properties;

use crate::models::HealthResponse;
use crate::services::{CacheManager, CrmService, ExportService, GatewayClient, ObjectStore, PropertyQueries};
use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;

pub use auth::{StaffUser, TokenVerifier};
pub use error::ApiError;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<GatewayClient>,
    pub properties: Arc<PropertyQueries>,
    pub crm: Arc<CrmService>,
    pub export: Arc<ExportService>,
    pub store: Arc<ObjectStore>,
    pub cache: Arc<CacheManager>,
    pub auth: Arc<TokenVerifier>,
    pub image_bucket: String,
    pub avatar_bucket: String,
    pub csv_excluded_columns: Arc<Vec<String>>,
}

/// Payload error handlers plus every route
pub fn configure_app(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(error::handle_json_payload_error))
        .app_data(web::QueryConfig::default().error_handler(error::handle_query_payload_error))
        .app_data(web::PathConfig::default().error_handler(error::handle_path_error))
        .configure(configure_routes);
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(health_check))
            .configure(access::configure)
            .configure(properties::configure)
            .configure(crm::configure)
            .configure(export::configure),
    );
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let cache = state.cache.stats();
    tracing::trace!("Health check (cache entries: {})", cache.l1_size);

    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}
