//! The `transport` module puts the relay on the network.
//!
//! One axum router serves both sides on a single port:
//! - `GET /` upgrades to a WebSocket subscriber session
//! - `POST /sync` publishes a new state snapshot
//! - `GET /health` reports liveness and a few counters

pub mod http;
pub mod websocket;

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info};

use crate::config::Settings;
use crate::relay::Relay;
use crate::utils::RelayError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
    pub settings: Arc<Settings>,
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.settings.relay.max_payload_bytes;

    Router::new()
        .route("/", get(websocket::ws_handler))
        .route("/sync", post(http::publish))
        .route("/health", get(http::health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

/// Serves until Ctrl-C, then closes every subscriber.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<(), RelayError> {
    serve_with_shutdown(listener, state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {e}");
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received. Exiting gracefully.");
    })
    .await
}

pub async fn serve_with_shutdown<F>(
    listener: TcpListener,
    state: AppState,
    signal: F,
) -> Result<(), RelayError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let relay = state.relay.clone();
    info!("Relay listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            signal.await;
            relay.shutdown();
        })
        .await?;

    Ok(())
}
