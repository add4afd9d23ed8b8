//! Auth endpoints
//!
//! Registration, login, logout and profile switching. A successful login
//! or switch issues a fresh signed session token, returned in the body
//! and mirrored into the `session` cookie.

use axum::{
    Router,
    extract::State,
    response::Json,
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;

use crate::AppState;
use crate::api::converters::profile_to_response;
use crate::api::dto::{ProfileResponse, SessionResponse};
use crate::auth::{CurrentUser, Session, create_session_token};
use crate::error::AppError;
use crate::metrics::{HTTP_REQUEST_DURATION_SECONDS, HTTP_REQUESTS_TOTAL};
use crate::service::{AccountService, NewApplication};

/// Create auth router
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/switch", post(switch_profile))
        .route("/session", get(current_session))
}

fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    let mut cookie = Cookie::new("session", token);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_secure(state.config.should_use_secure_cookies());
    cookie
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub display_name: String,
    pub handle: String,
    #[serde(default)]
    pub bio: String,
    pub roblox_username: String,
    pub discord_username: String,
    pub password: String,
}

/// POST /api/v1/auth/register
///
/// Submits an application; the profile stays PENDING until reviewed.
async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/api/v1/auth/register"])
        .start_timer();

    let service = AccountService::new(state.store.clone(), state.aggregator.clone());
    let profile = service
        .register(NewApplication {
            display_name: request.display_name,
            handle: request.handle,
            bio: request.bio,
            roblox_username: request.roblox_username,
            discord_username: request.discord_username,
            password: request.password,
        })
        .await?;

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/api/v1/auth/register", "200"])
        .inc();

    // The applicant sees their own profile
    Ok(Json(profile_to_response(&profile, Some(&profile))))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Roblox or discord username
    pub identifier: String,
    pub password: String,
}

/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<SessionResponse>), AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/api/v1/auth/login"])
        .start_timer();

    let service = AccountService::new(state.store.clone(), state.aggregator.clone());
    let profile = service.login(&request.identifier, &request.password).await?;

    let session = Session::new(profile.id.clone(), state.config.auth.session_max_age);
    let token = create_session_token(&session, &state.config.auth.session_secret)?;
    let jar = jar.add(session_cookie(&state, token.clone()));

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/api/v1/auth/login", "200"])
        .inc();

    Ok((
        jar,
        Json(SessionResponse {
            token,
            owner_id: profile.id.clone(),
            active_profile: profile_to_response(&profile, Some(&profile)),
        }),
    ))
}

/// POST /api/v1/auth/logout
async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<serde_json::Value>) {
    let jar = jar.remove(session_cookie(&state, String::new()));
    (jar, Json(serde_json::json!({ "ok": true })))
}

#[derive(Debug, Deserialize)]
pub struct SwitchRequest {
    /// The owner itself or one of its characters
    pub profile_id: String,
}

/// POST /api/v1/auth/switch
///
/// Switches the active profile slot; retired characters are reachable
/// only by moderators.
async fn switch_profile(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    jar: CookieJar,
    Json(request): Json<SwitchRequest>,
) -> Result<(CookieJar, Json<SessionResponse>), AppError> {
    let service = AccountService::new(state.store.clone(), state.aggregator.clone());
    let target = service.resolve_active_profile(&session.owner_id, &request.profile_id)?;

    let switched = session.with_active_profile(target.id.clone());
    let token = create_session_token(&switched, &state.config.auth.session_secret)?;
    let jar = jar.add(session_cookie(&state, token.clone()));

    let snapshot = state.aggregator.snapshot();
    let viewer = snapshot.profile(&session.owner_id);

    Ok((
        jar,
        Json(SessionResponse {
            token,
            owner_id: switched.owner_id,
            active_profile: profile_to_response(&target, viewer),
        }),
    ))
}

/// GET /api/v1/auth/session
///
/// The current session and its active profile.
async fn current_session(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<SessionResponse>, AppError> {
    let snapshot = state.aggregator.snapshot();
    let active = snapshot
        .profile(&session.active_profile_id)
        .ok_or(AppError::Unauthorized)?;
    let viewer = snapshot.profile(&session.owner_id);

    let token = create_session_token(&session, &state.config.auth.session_secret)?;

    Ok(Json(SessionResponse {
        token,
        owner_id: session.owner_id.clone(),
        active_profile: profile_to_response(active, viewer),
    }))
}
