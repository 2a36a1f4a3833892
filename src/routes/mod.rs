pub mod health;
pub mod posts;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::state::AppState;

/// The full HTTP surface with its middleware stack.
pub fn app(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .merge(posts::router())
        .merge(health::router())
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> AppError {
    AppError::NotFound("Not found".into())
}
