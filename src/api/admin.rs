//! Moderator endpoints
//!
//! Application review queue, reports, banned words, the maintenance flag,
//! character unlocks and the support inbox. Moderator privilege is
//! enforced in the moderation service against the active session profile.

use axum::{
    Router,
    extract::{Path, State},
    response::Json,
    routing::{delete, get, post, put},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::AppState;
use crate::api::converters::{
    banned_word_to_response, maintenance_to_response, profile_to_response, report_to_response,
    support_message_to_response,
};
use crate::api::dto::{
    BannedWordResponse, MaintenanceResponse, ProfileResponse, ReportResponse,
    SupportMessageResponse,
};
use crate::auth::CurrentUser;
use crate::data::ReportTarget;
use crate::error::AppError;
use crate::service::{ModerationService, ReportReview};

/// Create moderator router (mounted under /admin)
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/applications", get(pending_applications))
        .route("/applications/:id/review", post(review_application))
        .route("/applications/:id/risk_note", get(risk_note))
        .route("/reports", get(list_reports))
        .route("/reports/:id/review", post(review_report))
        .route("/banned_words", get(list_banned_words))
        .route("/banned_words", post(add_banned_word))
        .route("/banned_words/:id", delete(remove_banned_word))
        .route("/maintenance", put(set_maintenance))
        .route("/characters/:id/unlock", post(unlock_character))
        .route("/support_messages", get(support_messages))
}

/// Create reporting router (any authenticated profile)
pub fn reporting_router() -> Router<AppState> {
    Router::new()
        .route("/reports", post(file_report))
        .route("/support_messages", post(send_support_message))
}

// =============================================================================
// Applications
// =============================================================================

/// GET /api/v1/admin/applications
async fn pending_applications(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<Vec<ProfileResponse>>, AppError> {
    let service = ModerationService::new(state.store.clone(), state.aggregator.clone());
    let pending = service.pending_applications(&session.active_profile_id)?;

    let snapshot = state.aggregator.snapshot();
    let viewer = snapshot.profile(&session.active_profile_id);
    let responses = pending
        .iter()
        .map(|p| profile_to_response(p, viewer))
        .collect();
    Ok(Json(responses))
}

#[derive(Debug, Deserialize)]
pub struct ReviewApplicationRequest {
    pub approve: bool,
}

/// POST /api/v1/admin/applications/:id/review
async fn review_application(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<ReviewApplicationRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let service = ModerationService::new(state.store.clone(), state.aggregator.clone());
    service
        .review_application(&session.active_profile_id, &id, request.approve)
        .await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// GET /api/v1/admin/applications/:id/risk_note
///
/// One-line advisory text from the assist service; a fixed notice when
/// the service is unavailable.
async fn risk_note(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let snapshot = state.aggregator.snapshot();
    let moderator = snapshot
        .profile(&session.active_profile_id)
        .ok_or(AppError::Unauthorized)?;
    if !moderator.is_moderator {
        return Err(AppError::Forbidden("moderator access required".to_string()));
    }
    let applicant = snapshot.profile(&id).ok_or(AppError::NotFound)?;

    let note = state
        .assist
        .risk_note(&applicant.handle, &applicant.display_name, &applicant.bio)
        .await;
    Ok(Json(serde_json::json!({ "note": note })))
}

// =============================================================================
// Reports
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct FileReportRequest {
    pub reported_profile_id: Option<String>,
    pub reported_post_id: Option<String>,
    pub reason: String,
}

/// POST /api/v1/reports
///
/// Open to any authenticated profile. Exactly one target must be set.
async fn file_report(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Json(request): Json<FileReportRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let target = match (request.reported_profile_id, request.reported_post_id) {
        (Some(profile_id), None) => ReportTarget::Profile(profile_id),
        (None, Some(post_id)) => ReportTarget::Post(post_id),
        _ => {
            return Err(AppError::Validation(
                "report exactly one of a profile or a post".to_string(),
            ));
        }
    };

    let service = ModerationService::new(state.store.clone(), state.aggregator.clone());
    service
        .file_report(&session.active_profile_id, target, &request.reason)
        .await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// GET /api/v1/admin/reports
async fn list_reports(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<Vec<ReportResponse>>, AppError> {
    let service = ModerationService::new(state.store.clone(), state.aggregator.clone());
    let reports = service.list_reports(&session.active_profile_id)?;
    Ok(Json(reports.iter().map(report_to_response).collect()))
}

#[derive(Debug, Deserialize)]
pub struct ReviewReportRequest {
    /// "reviewed" or "actioned"
    pub action: String,
    /// With "actioned" on a profile report: ban until this timestamp
    pub banned_until: Option<DateTime<Utc>>,
}

/// POST /api/v1/admin/reports/:id/review
async fn review_report(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<ReviewReportRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let review = match request.action.as_str() {
        "reviewed" => ReportReview::Reviewed,
        "actioned" => ReportReview::Actioned {
            banned_until: request.banned_until,
        },
        other => {
            return Err(AppError::Validation(format!(
                "action must be reviewed or actioned: {other}"
            )));
        }
    };

    let service = ModerationService::new(state.store.clone(), state.aggregator.clone());
    service
        .review_report(&session.active_profile_id, &id, review)
        .await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

// =============================================================================
// Banned words
// =============================================================================

/// GET /api/v1/admin/banned_words
async fn list_banned_words(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<Vec<BannedWordResponse>>, AppError> {
    let service = ModerationService::new(state.store.clone(), state.aggregator.clone());
    let words = service.banned_words(&session.active_profile_id)?;
    Ok(Json(words.iter().map(banned_word_to_response).collect()))
}

#[derive(Debug, Deserialize)]
pub struct AddBannedWordRequest {
    pub word: String,
    /// Scope to one author; omit for a global word
    pub profile_id: Option<String>,
}

/// POST /api/v1/admin/banned_words
async fn add_banned_word(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Json(request): Json<AddBannedWordRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let service = ModerationService::new(state.store.clone(), state.aggregator.clone());
    service
        .add_banned_word(
            &session.active_profile_id,
            &request.word,
            request.profile_id.as_deref(),
        )
        .await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// DELETE /api/v1/admin/banned_words/:id
async fn remove_banned_word(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let service = ModerationService::new(state.store.clone(), state.aggregator.clone());
    service
        .remove_banned_word(&session.active_profile_id, &id)
        .await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

// =============================================================================
// Maintenance
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SetMaintenanceRequest {
    pub active: bool,
    #[serde(default)]
    pub message: String,
    pub scheduled_restart: Option<DateTime<Utc>>,
}

/// PUT /api/v1/admin/maintenance
async fn set_maintenance(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Json(request): Json<SetMaintenanceRequest>,
) -> Result<Json<MaintenanceResponse>, AppError> {
    let service = ModerationService::new(state.store.clone(), state.aggregator.clone());
    let maintenance = service
        .set_maintenance(
            &session.active_profile_id,
            request.active,
            &request.message,
            request.scheduled_restart,
        )
        .await?;
    Ok(Json(maintenance_to_response(&maintenance)))
}

// =============================================================================
// Characters / support
// =============================================================================

/// POST /api/v1/admin/characters/:id/unlock
async fn unlock_character(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let service = ModerationService::new(state.store.clone(), state.aggregator.clone());
    service
        .unlock_character(&session.active_profile_id, &id)
        .await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// GET /api/v1/admin/support_messages
async fn support_messages(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<Vec<SupportMessageResponse>>, AppError> {
    let service = ModerationService::new(state.store.clone(), state.aggregator.clone());
    let messages = service.support_messages(&session.active_profile_id)?;
    Ok(Json(
        messages.iter().map(support_message_to_response).collect(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct SendSupportMessageRequest {
    pub message: String,
}

/// POST /api/v1/support_messages
async fn send_support_message(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Json(request): Json<SendSupportMessageRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let service = ModerationService::new(state.store.clone(), state.aggregator.clone());
    service
        .send_support_message(&session.active_profile_id, &request.message)
        .await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}
