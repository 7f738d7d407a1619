use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

use super::AppState;
use crate::error::ClientError;

pub const VNC_UNAVAILABLE: &str = "VNC Stream not available";
pub const ORCHESTRATOR_UNREACHABLE: &str = "Failed to connect to Orchestrator";

/// Relays the orchestrator's VNC player page verbatim, uncached. Nothing
/// from the incoming request is forwarded.
pub async fn vnc(State(state): State<Arc<AppState>>) -> Response {
    match state.orchestrator.vnc_player().await {
        Ok(html) => (
            [
                (CONTENT_TYPE, "text/html"),
                (CACHE_CONTROL, "no-store, no-cache, must-revalidate"),
            ],
            html,
        )
            .into_response(),
        Err(ClientError::Status { status, .. }) => {
            warn!("[Proxy] VNC upstream returned {}", status);
            (StatusCode::BAD_GATEWAY, VNC_UNAVAILABLE).into_response()
        }
        Err(e) => {
            error!("[Proxy] VNC Proxy Error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, ORCHESTRATOR_UNREACHABLE).into_response()
        }
    }
}
