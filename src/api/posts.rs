//! Feed and post endpoints
//!
//! Home timeline, profile feeds, post creation, likes, comments, trends
//! and the public maintenance read.

use axum::{
    Router,
    extract::{Path, State},
    response::Json,
    routing::{delete, get, post},
};
use serde::Deserialize;

use crate::AppState;
use crate::api::converters::{comment_to_response, maintenance_to_response, post_to_response};
use crate::api::dto::{CommentResponse, MaintenanceResponse, PostResponse};
use crate::auth::CurrentUser;
use crate::data::MediaKind;
use crate::error::AppError;
use crate::metrics::{HTTP_REQUEST_DURATION_SECONDS, HTTP_REQUESTS_TOTAL};
use crate::service::{NewPost, PostService, trends::Trend};

/// Create feed/posts router
pub fn posts_router() -> Router<AppState> {
    Router::new()
        .route("/timeline/home", get(home_timeline))
        .route("/profiles/:id/posts", get(profile_posts))
        .route("/posts", post(create_post))
        .route("/posts/:id/like", post(like_post))
        .route("/posts/:id/like", delete(unlike_post))
        .route("/posts/:id/comments", get(list_comments))
        .route("/posts/:id/comments", post(create_comment))
        .route("/comments/:id/like", post(like_comment))
        .route("/trends", get(trending))
        .route("/maintenance", get(maintenance))
        .route("/assist/rewrite", post(rewrite_draft))
}

/// GET /api/v1/timeline/home
///
/// All visible posts for the active profile, newest first. Posts from
/// authors the viewer blocked (or who blocked the viewer) are excluded.
async fn home_timeline(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<Vec<PostResponse>>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/api/v1/timeline/home"])
        .start_timer();

    let service = PostService::new(state.store.clone(), state.aggregator.clone());
    let posts = service.home_feed(&session.active_profile_id);

    let snapshot = state.aggregator.snapshot();
    let responses = posts
        .iter()
        .filter_map(|post| post_to_response(post, &snapshot))
        .collect();

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", "/api/v1/timeline/home", "200"])
        .inc();

    Ok(Json(responses))
}

/// GET /api/v1/profiles/:id/posts
async fn profile_posts(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<PostResponse>>, AppError> {
    let snapshot = state.aggregator.snapshot();
    snapshot.profile(&id).ok_or(AppError::NotFound)?;

    let service = PostService::new(state.store.clone(), state.aggregator.clone());
    let responses = service
        .profile_feed(&id)
        .iter()
        .filter_map(|post| post_to_response(post, &snapshot))
        .collect();
    Ok(Json(responses))
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub content: String,
    pub media_url: Option<String>,
    /// "image" or "video"
    pub media_type: Option<String>,
}

/// POST /api/v1/posts
async fn create_post(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Json(request): Json<CreatePostRequest>,
) -> Result<Json<PostResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/api/v1/posts"])
        .start_timer();

    let media_kind = match request.media_type.as_deref() {
        None => None,
        Some(value) => Some(MediaKind::parse(value).ok_or_else(|| {
            AppError::Validation(format!("media_type must be image or video: {value}"))
        })?),
    };

    let service = PostService::new(state.store.clone(), state.aggregator.clone());
    let created = service
        .create_post(
            &session.active_profile_id,
            NewPost {
                content: request.content,
                media_url: request.media_url,
                media_kind,
            },
        )
        .await?;

    let snapshot = state.aggregator.snapshot();
    let response = post_to_response(&created, &snapshot)
        .ok_or_else(|| AppError::Store("created post has no resolvable author".to_string()))?;

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/api/v1/posts", "200"])
        .inc();

    Ok(Json(response))
}

/// POST /api/v1/posts/:id/like
async fn like_post(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let service = PostService::new(state.store.clone(), state.aggregator.clone());
    service.like_post(&session.active_profile_id, &id).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// DELETE /api/v1/posts/:id/like
async fn unlike_post(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let service = PostService::new(state.store.clone(), state.aggregator.clone());
    service.unlike_post(&session.active_profile_id, &id).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// GET /api/v1/posts/:id/comments
///
/// Comments on a post, oldest first; comments whose author does not
/// resolve are dropped silently.
async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<CommentResponse>>, AppError> {
    let snapshot = state.aggregator.snapshot();
    snapshot.post(&id).ok_or(AppError::NotFound)?;

    let responses = snapshot
        .comments_for_post(&id)
        .into_iter()
        .filter_map(|comment| comment_to_response(comment, &snapshot))
        .collect();
    Ok(Json(responses))
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
}

/// POST /api/v1/posts/:id/comments
async fn create_comment(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<CreateCommentRequest>,
) -> Result<Json<CommentResponse>, AppError> {
    let service = PostService::new(state.store.clone(), state.aggregator.clone());
    let comment = service
        .create_comment(&session.active_profile_id, &id, &request.content)
        .await?;

    let snapshot = state.aggregator.snapshot();
    let response = comment_to_response(&comment, &snapshot)
        .ok_or_else(|| AppError::Store("created comment has no resolvable author".to_string()))?;
    Ok(Json(response))
}

/// POST /api/v1/comments/:id/like
async fn like_comment(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let service = PostService::new(state.store.clone(), state.aggregator.clone());
    service
        .like_comment(&session.active_profile_id, &id)
        .await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// GET /api/v1/trends
///
/// Recomputed from the current snapshot on every request.
async fn trending(State(state): State<AppState>) -> Json<Vec<Trend>> {
    let service = PostService::new(state.store.clone(), state.aggregator.clone());
    Json(service.trending(state.config.feed.trending_top_n))
}

/// GET /api/v1/maintenance
///
/// Public so the shell can show the banner before login.
async fn maintenance(State(state): State<AppState>) -> Json<MaintenanceResponse> {
    let snapshot = state.aggregator.snapshot();
    let response = snapshot
        .maintenance
        .as_ref()
        .map(maintenance_to_response)
        .unwrap_or(MaintenanceResponse {
            active: false,
            message: String::new(),
            scheduled_restart: None,
        });
    Json(response)
}

#[derive(Debug, Deserialize)]
pub struct RewriteRequest {
    pub draft: String,
}

/// POST /api/v1/assist/rewrite
///
/// Returns the rewritten draft, or the draft unchanged when assist is
/// unavailable; posting never depends on this call.
async fn rewrite_draft(
    State(state): State<AppState>,
    CurrentUser(_session): CurrentUser,
    Json(request): Json<RewriteRequest>,
) -> Json<serde_json::Value> {
    let text = state.assist.rewrite_draft(&request.draft).await;
    Json(serde_json::json!({ "text": text }))
}
