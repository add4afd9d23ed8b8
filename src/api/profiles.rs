//! Profile endpoints
//!
//! Profile reads, edits, follow/block relations and character
//! sub-accounts.

use axum::{
    Router,
    extract::{Path, State},
    response::Json,
    routing::{delete, get, patch, post},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::AppState;
use crate::api::converters::profile_to_response;
use crate::api::dto::ProfileResponse;
use crate::auth::{CurrentUser, MaybeUser};
use crate::data::Retirement;
use crate::error::AppError;
use crate::service::{AccountService, NewCharacter, ProfileEdit};

/// Create profiles router
pub fn profiles_router() -> Router<AppState> {
    Router::new()
        .route("/profiles", get(list_profiles))
        .route("/profiles/:id", get(get_profile))
        .route("/profiles/:id", patch(update_profile))
        .route("/profiles/:id/follow", post(follow))
        .route("/profiles/:id/follow", delete(unfollow))
        .route("/profiles/:id/block", post(block))
        .route("/profiles/:id/block", delete(unblock))
        .route("/characters", get(list_characters))
        .route("/characters", post(create_character))
        .route("/characters/:id/retire", post(retire_character))
}

/// GET /api/v1/profiles
async fn list_profiles(
    State(state): State<AppState>,
    MaybeUser(session): MaybeUser,
) -> Json<Vec<ProfileResponse>> {
    let snapshot = state.aggregator.snapshot();
    let viewer = session
        .as_ref()
        .and_then(|s| snapshot.profile(&s.active_profile_id));

    let profiles = snapshot
        .profiles
        .iter()
        .map(|p| profile_to_response(p, viewer))
        .collect();
    Json(profiles)
}

/// GET /api/v1/profiles/:id
async fn get_profile(
    State(state): State<AppState>,
    MaybeUser(session): MaybeUser,
    Path(id): Path<String>,
) -> Result<Json<ProfileResponse>, AppError> {
    let snapshot = state.aggregator.snapshot();
    let profile = snapshot.profile(&id).ok_or(AppError::NotFound)?;
    let viewer = session
        .as_ref()
        .and_then(|s| snapshot.profile(&s.active_profile_id));

    Ok(Json(profile_to_response(profile, viewer)))
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub banner_url: Option<String>,
    pub pronouns: Option<String>,
    pub custom_fields: Option<Vec<crate::data::CustomField>>,
    pub career: Option<String>,
    pub home_address: Option<String>,
    pub show_roblox: Option<bool>,
    pub show_discord: Option<bool>,
}

/// PATCH /api/v1/profiles/:id
///
/// Allowed for the profile itself, the owner of a character, or a
/// moderator.
async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    let snapshot = state.aggregator.snapshot();
    let actor = snapshot
        .profile(&session.owner_id)
        .ok_or(AppError::Unauthorized)?;
    let target = snapshot.profile(&id).ok_or(AppError::NotFound)?;

    let owned = target.id == actor.id || target.owner_id() == Some(actor.id.as_str());
    if !owned && !actor.is_moderator {
        return Err(AppError::Forbidden(
            "cannot edit a profile you do not own".to_string(),
        ));
    }

    let service = AccountService::new(state.store.clone(), state.aggregator.clone());
    let updated = service
        .update_profile(
            &id,
            ProfileEdit {
                display_name: request.display_name,
                bio: request.bio,
                avatar_url: request.avatar_url,
                banner_url: request.banner_url,
                pronouns: request.pronouns,
                custom_fields: request.custom_fields,
                career: request.career,
                home_address: request.home_address,
                show_roblox: request.show_roblox,
                show_discord: request.show_discord,
            },
        )
        .await?;

    let snapshot = state.aggregator.snapshot();
    let viewer = snapshot.profile(&session.owner_id);
    Ok(Json(profile_to_response(&updated, viewer)))
}

/// POST /api/v1/profiles/:id/follow
async fn follow(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let service = AccountService::new(state.store.clone(), state.aggregator.clone());
    service.follow(&session.active_profile_id, &id).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// DELETE /api/v1/profiles/:id/follow
async fn unfollow(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let service = AccountService::new(state.store.clone(), state.aggregator.clone());
    service.unfollow(&session.active_profile_id, &id).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// POST /api/v1/profiles/:id/block
async fn block(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let service = AccountService::new(state.store.clone(), state.aggregator.clone());
    service.block(&session.active_profile_id, &id).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// DELETE /api/v1/profiles/:id/block
async fn unblock(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let service = AccountService::new(state.store.clone(), state.aggregator.clone());
    service.unblock(&session.active_profile_id, &id).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// GET /api/v1/characters
///
/// The session owner's character sub-accounts, retired ones included.
async fn list_characters(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<Vec<ProfileResponse>>, AppError> {
    let snapshot = state.aggregator.snapshot();
    let owner = snapshot
        .profile(&session.owner_id)
        .ok_or(AppError::Unauthorized)?;

    let characters = snapshot
        .characters_of(&owner.id)
        .into_iter()
        .map(|c| profile_to_response(c, Some(owner)))
        .collect();
    Ok(Json(characters))
}

#[derive(Debug, Deserialize)]
pub struct CreateCharacterRequest {
    pub display_name: String,
    pub handle: String,
    #[serde(default)]
    pub bio: String,
    pub avatar_url: Option<String>,
}

/// POST /api/v1/characters
async fn create_character(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Json(request): Json<CreateCharacterRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    let service = AccountService::new(state.store.clone(), state.aggregator.clone());
    let character = service
        .create_character(
            &session.owner_id,
            NewCharacter {
                display_name: request.display_name,
                handle: request.handle,
                bio: request.bio,
                avatar_url: request.avatar_url,
            },
        )
        .await?;

    let snapshot = state.aggregator.snapshot();
    let viewer = snapshot.profile(&session.owner_id);
    Ok(Json(profile_to_response(&character, viewer)))
}

#[derive(Debug, Deserialize)]
pub struct RetireCharacterRequest {
    /// "archived", "deceased" or "imprisoned"
    pub reason: String,
    pub date: Option<DateTime<Utc>>,
}

/// POST /api/v1/characters/:id/retire
async fn retire_character(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<RetireCharacterRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let reason = match request.reason.as_str() {
        "archived" => Retirement::Archived,
        "deceased" => Retirement::Deceased { date: request.date },
        "imprisoned" => Retirement::Imprisoned { date: request.date },
        other => {
            return Err(AppError::Validation(format!(
                "unknown retirement reason: {other}"
            )));
        }
    };

    let service = AccountService::new(state.store.clone(), state.aggregator.clone());
    service
        .retire_character(&session.owner_id, &id, reason)
        .await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}
