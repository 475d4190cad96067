//! Router construction

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::api::handlers;
use crate::middleware::RateLimitLayer;
use crate::AppState;

/// Upper bound for a multipart generate request (prompt plus two images)
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let content_prefix = state.content.url_prefix().to_string();
    let content = ServeDir::new(state.content.upload_dir())
        .fallback(ServeDir::new(state.content.result_dir()));

    let mut generate = Router::new()
        .route("/generate", post(handlers::generate))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES));

    if state.settings.rate_limit.enabled {
        generate = generate.layer(RateLimitLayer::from_config(&state.settings.rate_limit));
    }

    Router::new()
        .route("/health", get(handlers::health))
        .route("/gallery", get(handlers::gallery))
        .route("/like/:id", post(handlers::like))
        .route("/image/:id", get(handlers::image_details))
        .merge(generate)
        .nest_service(&content_prefix, content)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
