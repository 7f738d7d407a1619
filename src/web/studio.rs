use std::sync::Arc;

use axum::Json;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, warn};

use super::dashboard::load_summaries;
use super::html;
use super::{AppState, CurrentUser};
use crate::coords::{DisplayBox, NativePoint, to_native};
use crate::error::ClientError;
use crate::types::{Step, TeachAction};

pub const SCREENSHOT_FAILED: &str = "Failed to connect to Orchestrator API (Check backend logs)";
pub const TEACH_UNREACHABLE: &str = "Failed to connect to Orchestrator API";
pub const NO_BLUEPRINT_HINT: &str = "Select or Create a Blueprint first to record actions.";

pub async fn studio_page(State(state): State<Arc<AppState>>, Extension(user): Extension<CurrentUser>) -> Html<String> {
    let blueprints = load_summaries(&state, &user).await;
    Html(html::studio_page(&user, &blueprints))
}

pub async fn screenshot(State(state): State<Arc<AppState>>) -> Response {
    match state.orchestrator.screenshot().await {
        Ok(shot) => Json(json!({ "image": shot.data_uri() })).into_response(),
        Err(e) => {
            error!("[Studio] Failed to fetch screenshot: {}", e);
            (StatusCode::BAD_GATEWAY, Json(json!({ "error": SCREENSHOT_FAILED }))).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ClickRequest {
    #[serde(default)]
    blueprint_id: Option<String>,
    client_x: f64,
    client_y: f64,
    rect: DisplayBox,
}

#[derive(Debug, Serialize)]
pub struct ClickResponse {
    actionable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    point: Option<NativePoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<&'static str>,
}

/// Maps a click on the rendered screenshot into the native frame. Without a
/// selected blueprint the click is acknowledged but nothing is recorded.
pub async fn click(Json(request): Json<ClickRequest>) -> Response {
    let selected = request
        .blueprint_id
        .as_deref()
        .is_some_and(|id| !id.trim().is_empty());
    if !selected {
        return Json(ClickResponse {
            actionable: false,
            point: None,
            hint: Some(NO_BLUEPRINT_HINT),
        })
        .into_response();
    }

    match to_native(&request.rect, request.client_x, request.client_y) {
        Some(point) => Json(ClickResponse {
            actionable: true,
            point: Some(point),
            hint: None,
        })
        .into_response(),
        None => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": "Screenshot has no visible area" })),
        )
            .into_response(),
    }
}

#[derive(Debug, Serialize)]
pub struct TaughtResponse {
    step_added: Option<Step>,
    image: Option<String>,
}

/// Forwards a labeled action, then re-captures the screen so the operator
/// sees the state the action produced.
pub async fn submit_action(State(state): State<Arc<AppState>>, Json(action): Json<TeachAction>) -> Response {
    if action.blueprint_id.trim().is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": NO_BLUEPRINT_HINT })),
        )
            .into_response();
    }

    let receipt = match state.orchestrator.teach_action(&action).await {
        Ok(receipt) => receipt,
        Err(ClientError::Status { detail, .. }) => {
            warn!("[Studio] Teach rejected: {}", detail);
            return (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": format!("API Error: {}", detail) })),
            )
                .into_response();
        }
        Err(e) => {
            error!("[Studio] Teach failed: {}", e);
            return (StatusCode::BAD_GATEWAY, Json(json!({ "error": TEACH_UNREACHABLE }))).into_response();
        }
    };

    let image = match state.orchestrator.screenshot().await {
        Ok(shot) => Some(shot.data_uri()),
        Err(e) => {
            warn!("[Studio] Re-capture after teach failed: {}", e);
            None
        }
    };

    Json(TaughtResponse {
        step_added: receipt.step_added,
        image,
    })
    .into_response()
}
