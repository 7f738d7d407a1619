//! The dashboard's HTTP surface: pages, the JSON/SSE endpoints their scripts
//! call, and the VNC passthrough.

mod dashboard;
mod execution;
pub mod html;
mod login;
mod proxy;
pub mod session;
mod studio;

use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, post};
use reqwest::Client;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::error::ClientError;
use crate::execution::Executions;
use crate::orchestrator::OrchestratorClient;
use crate::supabase::{BlueprintStore, SupabaseAuth};

pub use session::CurrentUser;

/// Everything the handlers share. Collaborator clients are built once from
/// the configuration.
pub struct AppState {
    pub config: Config,
    pub orchestrator: OrchestratorClient,
    pub auth: SupabaseAuth,
    pub store: BlueprintStore,
    pub executions: Executions,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, ClientError> {
        let client = Client::builder()
            .connect_timeout(config.request_timeout())
            .build()?;
        let timeout = config.request_timeout();

        Ok(Self {
            orchestrator: OrchestratorClient::new(client.clone(), config.orchestrator_base_url.clone(), timeout),
            auth: SupabaseAuth::new(
                client.clone(),
                config.supabase_url.clone(),
                config.supabase_anon_key.clone(),
                timeout,
            ),
            store: BlueprintStore::new(client, config.supabase_url.clone(), config.supabase_anon_key.clone(), timeout),
            executions: Executions::new(),
            config,
        })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/", get(dashboard::overview))
        .route("/blueprints", get(dashboard::blueprints_page).post(dashboard::create_blueprint))
        .route("/blueprints/list", get(dashboard::blueprints_list))
        .route("/studio", get(studio::studio_page))
        .route("/studio/screenshot", get(studio::screenshot))
        .route("/studio/click", post(studio::click))
        .route("/studio/actions", post(studio::submit_action))
        .route("/execution", get(execution::execution_page))
        .route("/execution/runs", post(execution::start_run))
        .route("/execution/runs/{id}/events", get(execution::run_events))
        .route("/execution/runs/{id}/abort", post(execution::abort_run))
        .route_layer(middleware::from_fn_with_state(state.clone(), session::require_session));

    Router::new()
        .route("/", get(login::login_page))
        .route("/auth", post(login::submit))
        .route("/auth/logout", post(login::logout))
        .route("/api/proxy/vnc", get(proxy::vnc))
        .route("/favicon.ico", get(|| async { StatusCode::NO_CONTENT }))
        .nest("/dashboard", protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds the configured port, trying the next nine if it is taken, and
/// serves until Ctrl-C.
pub async fn serve(state: Arc<AppState>) -> anyhow::Result<()> {
    let first = state.config.port;
    let mut bound = None;
    for port in first..first.saturating_add(10) {
        match tokio::net::TcpListener::bind(("127.0.0.1", port)).await {
            Ok(listener) => {
                bound = Some((listener, port));
                break;
            }
            Err(_) => continue,
        }
    }
    let Some((listener, port)) = bound else {
        anyhow::bail!(
            "Could not bind to any port {}-{}. Stop the other dashboard first.",
            first,
            first.saturating_add(9)
        );
    };

    info!("Dashboard running at http://localhost:{}", port);
    info!("Orchestrator: {}", state.orchestrator.base_url());

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
