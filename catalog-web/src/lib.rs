pub mod error;
pub mod handlers;
pub mod pages;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use state::AppState;

/// Slack on top of the image ceiling for multipart framing and text fields.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

pub fn router(state: AppState) -> Router {
    let body_limit = state.catalog.policy().max_bytes() + FORM_OVERHEAD_BYTES;

    Router::new()
        .route("/", get(handlers::index))
        .route("/api/scan", get(handlers::scan))
        .route("/api/upload", post(handlers::upload))
        .route("/api/replace", post(handlers::replace))
        .route("/api/delete", post(handlers::delete))
        .route("/api/generate-json", get(handlers::generate_json))
        .route("/api/health", get(handlers::health))
        .route("/uploads/:collection/:filename", get(handlers::get_image))
        .fallback(handlers::fallback)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
