//! API Gateway Library
//!
//! HTTP REST API over the marketplace core.

pub mod config;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod session;
pub mod state;

use std::sync::Arc;

use tracing::info;

use common::{AppError, AppResult};
use marketplace_lib::service::{AdminCredentials, Marketplace, ThresholdDiagnoser};

use crate::config::{GatewayConfig, StorageBackend};
use crate::routes::create_router;
use crate::session::SessionTokens;
use crate::state::AppState;

/// Wire the marketplace over the configured store.
pub async fn build_state(config: &GatewayConfig) -> AppResult<AppState> {
    let credentials = AdminCredentials::parse(&config.admin_credentials)?;
    if credentials.is_empty() {
        tracing::warn!("No admin credentials configured; admin elevation is disabled");
    }
    let diagnoser = Arc::new(ThresholdDiagnoser::default());

    let market = match config.storage {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Marketplace::in_memory(config.marketplace.clone(), credentials)
        }
        StorageBackend::Postgres => {
            let market = marketplace_lib::connect(
                &config.database,
                config.marketplace.clone(),
                credentials,
                diagnoser,
            )
            .await?;
            info!("Database connected");
            market
        }
    };

    Ok(AppState::new(market, SessionTokens::new(&config.jwt)))
}

/// Run the HTTP server with the given configuration.
pub async fn run_server(config: GatewayConfig) -> AppResult<()> {
    let state = build_state(&config).await?;
    let app = create_router(state);

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind to {}: {}", addr, e)))?;
    info!("Gateway listening on http://{}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    Ok(())
}
