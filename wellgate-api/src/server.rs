//! API Server setup

use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::routes::create_router;
use crate::state::{ApiConfig, AppState};
use wellgate_core::storage::GateStorage;
use wellgate_core::verify::PaymentVerifier;
use wellgate_core::{AppConfig, PaymentGate};

/// Create the API server
pub fn create_server(
    config: &ApiConfig,
    app_config: &AppConfig,
    storage: Arc<dyn GateStorage>,
    verifier: Arc<dyn PaymentVerifier>,
) -> Result<(Router, SocketAddr, AppState), Box<dyn std::error::Error + Send + Sync>> {
    // Create app state
    let state = AppState::new(
        app_config,
        storage,
        verifier,
        config.operator_token.clone(),
    )?;

    // Create router
    let mut router = create_router(state.clone());

    // Add middleware
    router = router.layer(TraceLayer::new_for_http());

    if config.enable_cors {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    // Parse address
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    Ok((router, addr, state))
}

/// Run the API server
pub async fn run_server(
    config: ApiConfig,
    app_config: AppConfig,
    storage: Arc<dyn GateStorage>,
    verifier: Arc<dyn PaymentVerifier>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (router, addr, state) = create_server(&config, &app_config, storage, verifier)?;

    spawn_expiry_sweeper(state.gate.clone(), config.sweep_interval_secs);

    tracing::info!("Gate API server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

/// Start server in background (for testing)
pub async fn start_background_server(
    config: ApiConfig,
    app_config: AppConfig,
    storage: Arc<dyn GateStorage>,
    verifier: Arc<dyn PaymentVerifier>,
) -> Result<SocketAddr, Box<dyn std::error::Error + Send + Sync>> {
    let (router, addr, state) = create_server(&config, &app_config, storage, verifier)?;

    spawn_expiry_sweeper(state.gate.clone(), config.sweep_interval_secs);

    // Bind to get actual address (useful when port is 0)
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    // Spawn server in background
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok(actual_addr)
}

/// Spawn the background task that marks stale payment requests expired
fn spawn_expiry_sweeper(gate: Arc<PaymentGate>, interval_secs: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        loop {
            interval.tick().await;
            match gate.expire_stale().await {
                Ok(0) => {}
                Ok(n) => tracing::debug!("Expired {} stale payment requests", n),
                Err(e) => tracing::warn!("Expiry sweep failed: {}", e),
            }
        }
    });
}
