use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::auth;
use crate::complaints;
use crate::photo::MAX_PHOTO_BYTES;
use crate::proximity;
use crate::state::AppState;

/// All HTTP routes. Bodies above the photo cap are refused before any
/// extractor reads them. Transport layers (CORS, tracing) are added by the binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route(
            "/complaints",
            get(complaints::list_complaints).post(complaints::create_complaint),
        )
        .route("/complaints/upload", post(complaints::upload_complaint))
        .route("/complaints/nearby", get(proximity::nearby_complaints))
        .route("/complaints/photo", get(complaints::get_photo_without_id))
        .route("/complaints/photo/{id}", get(complaints::get_photo))
        .route(
            "/complaints/{id}",
            get(complaints::get_complaint)
                .put(complaints::update_complaint)
                .delete(complaints::delete_complaint),
        )
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_PHOTO_BYTES))
        .with_state(state)
}

/// GET /health — liveness check.
pub async fn health() -> &'static str {
    "ok"
}
