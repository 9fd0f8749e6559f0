use std::sync::Arc;

use api_router::{api_routes_v1, api_state::ApiState};
use axum::{extract::FromRef, Router};
use common::{storage::counts::create_count_repository, utils::config::get_config};
use promo_engine::{LoadError, PromoEngine};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    // Get config
    let config = get_config()?;
    info!(env = ?config.app_env, "Application environment");

    // Count repository per configuration, engine on top
    let repository = create_count_repository(&config).await?;
    let engine = Arc::new(PromoEngine::new(&config, repository)?);

    // Initial ingestion pass. Sources that failed are logged inside load();
    // the server still starts and serves whatever did load. A repository
    // failure is fatal because the counts would be silently wrong.
    match engine.load().await {
        Ok(()) => {}
        Err(LoadError::Sources { failures, total }) => {
            warn!(
                failed = failures.len(),
                total, "Initial promo code load finished with source failures"
            );
        }
        Err(err) => return Err(err.into()),
    }

    let api_state = ApiState::new(engine.clone());

    // Create Axum router
    let app = Router::new()
        .nest("/api/v1", api_routes_v1())
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { api_state });

    info!("Starting server listening on 0.0.0.0:{}", config.port);
    let serve_address = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(serve_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped, closing engine");
    engine.close().await?;

    Ok(())
}

/// Resolves when SIGINT or SIGTERM arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received, draining in-flight requests");
}

#[derive(Clone, FromRef)]
struct AppState {
    api_state: ApiState,
}
