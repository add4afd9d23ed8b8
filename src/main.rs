//! Mimic Social binary entry point

use mimic_social::{AppState, config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point
///
/// # Setup
/// 1. Initialize tracing/logging
/// 2. Load configuration from file and environment
/// 3. Initialize AppState
/// 4. Build Axum router
/// 5. Start HTTP server
/// 6. Start background refresh task
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize tracing/logging
    let log_format =
        std::env::var("MIMIC__LOGGING__FORMAT").unwrap_or_else(|_| "pretty".to_string());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "mimic_social=info,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "mimic_social=info,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    tracing::info!("Starting Mimic Social...");

    // 2. Initialize metrics
    mimic_social::metrics::init_metrics();

    // 3. Load configuration
    let config = config::AppConfig::load()?;
    tracing::info!(
        domain = %config.server.domain,
        protocol = %config.server.protocol,
        store = %config.store.base_url,
        "Configuration loaded"
    );

    // 4. Initialize application state
    let state = AppState::new(config.clone()).await?;

    // 5. Build Axum router
    let app = mimic_social::build_router(state.clone());

    // 6. Start HTTP server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Public URL: {}", config.server.base_url());

    // 7. Start background refresh task
    if config.store.refresh_interval_seconds > 0 {
        spawn_refresh_task(state.clone());
    }

    // Start server
    axum::serve(listener, app).await?;

    Ok(())
}

/// Spawn background snapshot refresh task
///
/// Writes already refresh on their own; this is a reconciliation pass
/// that picks up changes other clients made to the store.
fn spawn_refresh_task(state: AppState) {
    tokio::spawn(async move {
        let interval_secs = state.config.store.refresh_interval_seconds;
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));

        // Consume the immediate first tick; AppState::new already refreshed.
        interval.tick().await;

        loop {
            interval.tick().await;

            match state.aggregator.refresh().await {
                Ok(snapshot) => {
                    tracing::debug!(version = snapshot.version, "Scheduled refresh completed");
                }
                Err(error) => {
                    tracing::error!(%error, "Scheduled refresh failed");
                }
            }
        }
    });

    tracing::info!("Snapshot refresh task spawned");
}
