//! Prometheus metrics endpoint
//!
//! Exposes application metrics in Prometheus format for monitoring and
//! observability. Access requires a session whose active profile is a
//! moderator.

use axum::{
    Router,
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus::{Encoder, TextEncoder};

use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::metrics::REGISTRY;

/// Metrics endpoint handler
///
/// Returns all metrics in Prometheus text format.
async fn metrics_handler(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Response, AppError> {
    let snapshot = state.aggregator.snapshot();
    let caller = snapshot
        .profile(&session.active_profile_id)
        .ok_or(AppError::Unauthorized)?;
    if !caller.is_moderator {
        return Err(AppError::Forbidden("moderator access required".to_string()));
    }

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    match encoder.encode_to_string(&metric_families) {
        Ok(metrics_text) => Ok((
            axum::http::StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, encoder.format_type())],
            metrics_text,
        )
            .into_response()),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            Ok((
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to encode metrics",
            )
                .into_response())
        }
    }
}

/// Create metrics router
///
/// Exposes the `/metrics` endpoint.
pub fn metrics_router() -> Router<AppState> {
    Router::new().route("/metrics", get(metrics_handler))
}
