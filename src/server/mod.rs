// ABOUTME: HTTP boundary of the agent.
// ABOUTME: POST /update-containers behind a token check, with CORS and request tracing.

mod auth;
mod error;

pub use auth::{RequireToken, verify_token};
pub use error::ApiError;

use crate::agent::Agent;
use crate::redeploy::RedeploySummary;
use axum::extract::State;
use axum::http::{HeaderValue, Method};
use axum::routing::post;
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub struct ServerState {
    pub token: String,
    pub agent: Agent,
}

/// Build the router. `origins` that are not valid header values are ignored.
pub fn router(state: Arc<ServerState>, origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST]);

    Router::new()
        .route("/update-containers", post(update_containers))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn update_containers(
    _auth: RequireToken,
    State(state): State<Arc<ServerState>>,
) -> Result<Json<RedeploySummary>, ApiError> {
    let summary = state.agent.redeploy().await?;
    Ok(Json(summary))
}

/// Serve until Ctrl-C.
pub async fn serve(listen: SocketAddr, router: Router) -> crate::error::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen).await?;
    tracing::info!(%listen, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("received shutdown signal");
}
