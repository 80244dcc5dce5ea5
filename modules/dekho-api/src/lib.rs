use std::sync::Arc;

use axum::{
    http::{header, HeaderValue},
    routing::{get, post},
    Router,
};
use tower_http::set_header::SetResponseHeaderLayer;

pub mod auth;
pub mod error;
pub mod rest;
mod state;

pub use state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "ok" }))
        // Edge function paths the site already calls
        .route("/functions/v1/save-lead", post(rest::leads::api_save_lead))
        .route("/functions/v1/chat", post(rest::chat::api_chat))
        // REST API
        .route("/api/leads", post(rest::leads::api_save_lead))
        .route("/api/chat", post(rest::chat::api_chat))
        .route("/api/ads/resolve", get(rest::ads::api_resolve_ad))
        .route("/api/listings/{collection}", get(rest::listings::api_listings))
        .route("/api/seo", get(rest::seo::api_seo))
        .route("/api/calculators/{kind}", get(rest::calculators::api_calculate))
        .route("/api/admin/leads", get(rest::leads::api_recent_leads))
        .with_state(state)
        // CORS
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        // Logging layer: method + path + status + latency only (no query params, no IP)
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}
