use std::sync::Arc;

use axum::Json;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::html;
use super::{AppState, CurrentUser};
use crate::types::{Blueprint, BlueprintSummary};

pub async fn overview(State(state): State<Arc<AppState>>, Extension(user): Extension<CurrentUser>) -> Html<String> {
    let health = state.orchestrator.health().await;
    if let Err(e) = &health {
        warn!("[Dashboard] Orchestrator health check failed: {}", e);
    }
    Html(html::overview_page(&user, health.ok().as_ref()))
}

/// Page shell in its loading state; the list itself comes from
/// `blueprints_list`.
pub async fn blueprints_page(Extension(user): Extension<CurrentUser>) -> Html<String> {
    Html(html::blueprints_page(&user))
}

pub async fn blueprints_list(State(state): State<Arc<AppState>>, Extension(user): Extension<CurrentUser>) -> Html<String> {
    let blueprints = load_blueprints(&state, &user).await;
    Html(html::blueprint_list(&blueprints))
}

#[derive(Debug, Deserialize)]
pub struct CreateBlueprint {
    name: String,
}

/// Inserts a blueprint and returns the stored row. The caller puts it at the
/// top of its list without re-fetching, so its position can drift from the
/// store's order until the next load.
pub async fn create_blueprint(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<CreateBlueprint>,
) -> Response {
    let name = body.name.trim();
    if name.is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": "Blueprint name is required" })),
        )
            .into_response();
    }

    match state.store.create(&user.access_token, name).await {
        Ok(blueprint) => (StatusCode::CREATED, Json(blueprint)).into_response(),
        Err(e) => {
            warn!("[Dashboard] Could not create blueprint '{}': {}", name, e);
            (StatusCode::BAD_GATEWAY, Json(json!({ "error": e.detail() }))).into_response()
        }
    }
}

/// Store read failures show up as an empty list, not an error.
pub(super) async fn load_blueprints(state: &AppState, user: &CurrentUser) -> Vec<Blueprint> {
    state.store.list(&user.access_token).await.unwrap_or_else(|e| {
        warn!("[Dashboard] Blueprint list unavailable: {}", e);
        Vec::new()
    })
}

pub(super) async fn load_summaries(state: &AppState, user: &CurrentUser) -> Vec<BlueprintSummary> {
    state
        .store
        .list_summaries(&user.access_token)
        .await
        .unwrap_or_else(|e| {
            warn!("[Dashboard] Blueprint picker unavailable: {}", e);
            Vec::new()
        })
}
