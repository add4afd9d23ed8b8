//! Mimic Social - a moderated social feed service over a hosted
//! relational backend
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - Auth, profiles, feed, trends endpoints                   │
//! │  - Moderator dashboard endpoints                            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Aggregator (full-state refresh)                          │
//! │  - Account lifecycle / moderation / policy / trends         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - Remote store adapter (REST)                              │
//! │  - Immutable versioned snapshot                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers and DTOs
//! - `service`: Business logic layer
//! - `data`: Remote store adapter, row schemas, snapshot
//! - `assist`: Generative-text collaborator (draft rewrite, risk notes)
//! - `auth`: Signed session tokens and extractors
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod assist;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod service;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// This struct is cloned for each request and contains
/// shared resources like the store client and the snapshot aggregator.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Remote store client
    pub store: Arc<dyn data::RemoteStore>,

    /// Snapshot aggregator (owns the current snapshot)
    pub aggregator: Arc<service::Aggregator>,

    /// Compose-assist client
    pub assist: Arc<assist::ComposeAssist>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Build the remote store client
    /// 2. Build the aggregator and assist client
    /// 3. Attempt an initial snapshot refresh
    ///
    /// A failed initial refresh is logged, not fatal: the server starts
    /// with the empty snapshot and the next successful refresh fills it.
    ///
    /// # Errors
    /// Returns error if a client cannot be constructed
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let store: Arc<dyn data::RemoteStore> = Arc::new(data::RestStore::new(&config.store)?);
        let aggregator = Arc::new(service::Aggregator::new(store.clone()));
        let assist = Arc::new(assist::ComposeAssist::new(&config.assist)?);

        match aggregator.refresh().await {
            Ok(snapshot) => {
                tracing::info!(
                    profiles = snapshot.profiles.len(),
                    posts = snapshot.posts.len(),
                    "Initial snapshot loaded"
                );
            }
            Err(error) => {
                tracing::warn!(%error, "Initial snapshot refresh failed; starting empty");
            }
        }

        Ok(Self {
            config: Arc::new(config),
            store,
            aggregator,
            assist,
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    let cors_layer = build_cors_layer(&state.config.server);

    let api = Router::new()
        .nest("/auth", api::auth_router())
        .merge(api::profiles_router())
        .merge(api::posts_router())
        .merge(api::reporting_router())
        .nest("/admin", api::admin_router());

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .nest("/api/v1", api)
        .merge(api::metrics_router())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::HeaderValue;
    use tower_http::cors::{Any, CorsLayer};

    if !server.protocol.eq_ignore_ascii_case("https") {
        return CorsLayer::permissive();
    }

    let allowed_origin = server.base_url();
    match HeaderValue::from_str(&allowed_origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin([origin])
            .allow_methods(Any)
            .allow_headers(Any),
        Err(error) => {
            tracing::error!(
                %error,
                origin = %allowed_origin,
                "Failed to parse CORS origin from server base URL; denying cross-origin requests"
            );
            CorsLayer::new().allow_methods(Any).allow_headers(Any)
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}
