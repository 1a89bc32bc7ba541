//! Gateway server setup
//!
//! Builds the in-memory store, the service context, and the axum router,
//! and runs the background typing sweeper.

mod handler;
mod state;

pub use handler::gateway_handler;
pub use state::GatewayState;

use crate::connection::SessionRegistry;
use crate::handlers::broadcast_stopped;
use axum::{routing::get, Router};
use classline_common::{AppConfig, AppError};
use classline_service::{PresenceService, ServiceContextBuilder};
use classline_store::{MemoryChannelRepository, MemoryMessageRepository, MemoryUserRepository};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/ws", get(gateway_handler))
        .route("/health", get(health_check))
}

async fn health_check() -> &'static str {
    "OK"
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wire the store, services, and registry into a `GatewayState`
pub fn build_state(config: AppConfig) -> Result<GatewayState, AppError> {
    let jwt_service = Arc::new(classline_common::JwtService::new(
        &config.jwt.secret,
        config.jwt.access_token_expiry,
        config.jwt.refresh_token_expiry,
    ));

    let snowflake_generator = Arc::new(classline_core::SnowflakeGenerator::new(
        config.snowflake.worker_id,
    ));

    let context = ServiceContextBuilder::new()
        .user_repo(Arc::new(MemoryUserRepository::new()))
        .channel_repo(Arc::new(MemoryChannelRepository::new()))
        .message_repo(Arc::new(MemoryMessageRepository::new()))
        .jwt_service(jwt_service)
        .snowflake_generator(snowflake_generator)
        .typing_ttl(Duration::from_millis(config.presence.typing_timeout_ms))
        .build()
        .map_err(|e| AppError::Config(e.to_string()))?;

    let registry = SessionRegistry::new_shared();

    Ok(GatewayState::new(context, registry, config))
}

/// Spawn the background task that evicts expired typing indicators and
/// broadcasts the implicit `user_stopped_typing`
pub fn spawn_typing_sweeper(state: GatewayState) -> tokio::task::JoinHandle<()> {
    let ttl = state.config().presence.typing_timeout_ms;
    let period = Duration::from_millis((ttl / 2).max(100));

    tokio::spawn(async move {
        let mut tick = tokio::time::interval(period);
        loop {
            tick.tick().await;

            let expired = PresenceService::new(state.context()).expire_typing();
            for (channel_id, user_id) in expired {
                tracing::debug!(
                    channel_id = %channel_id,
                    user_id = %user_id,
                    "Typing indicator expired"
                );
                if let Err(e) = broadcast_stopped(&state, channel_id, user_id).await {
                    tracing::warn!(error = %e, "Failed to broadcast typing expiry");
                }
            }
        }
    })
}

/// Run the gateway server on a bound address
pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), AppError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("Gateway listening on ws://{}/ws", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")))?;

    Ok(())
}

/// Run the complete gateway with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr: SocketAddr = config
        .gateway
        .address()
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid gateway address: {e}")))?;

    let state = build_state(config)?;

    spawn_typing_sweeper(state.clone());

    let app = create_app(state);
    run_server(app, addr).await
}
