use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::extractors::PostFormBody;
use crate::state::AppState;

// --- Responses ---

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/posts", get(list_posts).post(create_post))
        .route("/api/posts/{id}", put(update_post).delete(delete_post))
}

// --- Handlers ---

async fn list_posts(State(state): State<AppState>) -> AppResult<Response> {
    let posts = state.posts.list().await?;
    Ok(Json(posts).into_response())
}

async fn create_post(
    State(state): State<AppState>,
    PostFormBody(form): PostFormBody,
) -> AppResult<Response> {
    let post = state.posts.create(form).await?;
    Ok((StatusCode::CREATED, Json(post)).into_response())
}

async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    PostFormBody(form): PostFormBody,
) -> AppResult<Response> {
    let id = parse_id(&id)?;
    let post = state.posts.update(id, form).await?;
    Ok(Json(post).into_response())
}

async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let id = parse_id(&id)?;
    state.posts.delete(id).await?;
    Ok(Json(MessageResponse {
        message: "Post deleted successfully",
    })
    .into_response())
}

// --- Helpers ---

/// Non-numeric ids never match a route.
fn parse_id(raw: &str) -> AppResult<i64> {
    raw.parse()
        .map_err(|_| AppError::NotFound("Not found".into()))
}
