use std::convert::Infallible;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::{Stream, StreamExt};
use tracing::warn;
use uuid::Uuid;

use super::dashboard::load_summaries;
use super::html;
use super::{AppState, CurrentUser};
use crate::config::Config;
use crate::execution::RunEvent;
use crate::types::ExecuteRequest;

impl RunEvent {
    fn to_sse_event(&self) -> Event {
        match self {
            RunEvent::Status(status) => Event::default()
                .event("status")
                .data(serde_json::json!(status).to_string()),
            RunEvent::Log(line) => Event::default()
                .event("log")
                .data(serde_json::json!(line).to_string()),
        }
    }
}

/// First lines of the log panel before any run.
pub fn banner(config: &Config) -> Vec<String> {
    vec![
        format!("[SYSTEM] Dashboard UI Version: {}", env!("CARGO_PKG_VERSION")),
        format!("[SYSTEM] Environment: {}", config.environment),
    ]
}

#[derive(Debug, Deserialize)]
pub struct ExecutionQuery {
    #[serde(rename = "blueprintId", default)]
    blueprint_id: Option<String>,
}

pub async fn execution_page(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ExecutionQuery>,
) -> Html<String> {
    let blueprints = load_summaries(&state, &user).await;
    Html(html::execution_page(
        &user,
        &blueprints,
        query.blueprint_id.as_deref(),
        &state.config.default_start_url,
        &banner(&state.config),
    ))
}

#[derive(Debug, Deserialize)]
pub struct StartRun {
    blueprint_id: String,
    #[serde(default)]
    start_url: Option<String>,
}

pub async fn start_run(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<StartRun>,
) -> Response {
    if body.blueprint_id.trim().is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": "Select a Blueprint first" })),
        )
            .into_response();
    }

    let start_url = body
        .start_url
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| state.config.default_start_url.clone());
    let request = ExecuteRequest {
        blueprint_id: body.blueprint_id,
        start_url,
    };

    let run_id = state
        .executions
        .launch(state.orchestrator.clone(), request, &user.user.id)
        .await;
    (StatusCode::CREATED, Json(json!({ "run_id": run_id }))).into_response()
}

/// Replays the run so far, then follows it live until it settles.
pub async fn run_events(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, StatusCode> {
    let channel = state
        .executions
        .channel(id, &user.user.id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;
    let (replay, rx) = channel.subscribe().await;

    let stream = follow(replay, rx).map(|event| Ok::<_, Infallible>(event.to_sse_event()));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// The replay, then live events up to and including the first terminal
/// status. A subscriber that falls behind is cut off instead of skipping
/// lines; the browser reconnects and starts over from a fresh replay.
fn follow(replay: Vec<RunEvent>, rx: broadcast::Receiver<RunEvent>) -> impl Stream<Item = RunEvent> + Send + 'static {
    let settled = replay.iter().any(RunEvent::is_terminal);
    let live = (!settled).then(|| BroadcastStream::new(rx));

    let live = futures::stream::unfold(live, |live| async move {
        let mut live = live?;
        match live.next().await? {
            Ok(event) => {
                let rest = if event.is_terminal() { None } else { Some(live) };
                Some((event, rest))
            }
            Err(BroadcastStreamRecvError::Lagged(missed)) => {
                warn!("[Execution] Subscriber fell {} events behind, closing its stream", missed);
                None
            }
        }
    });

    tokio_stream::iter(replay).chain(live)
}

pub async fn abort_run(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> StatusCode {
    if state.executions.abort(id, &user.user.id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::{CONNECTING_LOG, ExecutionRun, RunChannel};
    use crate::types::RunStatus;

    async fn collect(stream: impl Stream<Item = RunEvent>) -> Vec<RunEvent> {
        tokio::time::timeout(std::time::Duration::from_secs(2), stream.collect::<Vec<_>>())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn live_stream_ends_after_terminal_status() {
        let channel = Arc::new(RunChannel::new());
        channel.apply(ExecutionRun::start).await;
        let (replay, rx) = channel.subscribe().await;

        let feeder = channel.clone();
        tokio::spawn(async move {
            feeder.apply(ExecutionRun::connected).await;
            feeder.apply(|run| run.ingest("step one")).await;
            feeder.apply(|run| run.fail("connection reset")).await;
        });

        let events = collect(follow(replay, rx)).await;
        assert_eq!(
            events,
            vec![
                RunEvent::Log(CONNECTING_LOG.to_string()),
                RunEvent::Status(RunStatus::Starting),
                RunEvent::Status(RunStatus::Running),
                RunEvent::Log("step one".to_string()),
                RunEvent::Log("[ERROR] Failed to connect to API: connection reset".to_string()),
                RunEvent::Status(RunStatus::Error),
            ]
        );
    }

    #[tokio::test]
    async fn settled_run_is_replay_only() {
        let channel = RunChannel::new();
        channel.apply(ExecutionRun::start).await;
        channel.apply(|run| run.ingest("[SYSTEM] ✅ Blueprint Execution Completed")).await;
        let (replay, rx) = channel.subscribe().await;

        let events = collect(follow(replay, rx)).await;
        assert_eq!(events.last(), Some(&RunEvent::Status(RunStatus::Completed)));
        assert_eq!(events.len(), 3);
    }

    #[tokio::test]
    async fn lagging_subscriber_is_cut_off_without_gaps() {
        let channel = RunChannel::new();
        channel.apply(ExecutionRun::start).await;
        channel.apply(ExecutionRun::connected).await;
        let (replay, rx) = channel.subscribe().await;

        for i in 0..300 {
            channel.apply(|run| run.ingest(&format!("line {}", i))).await;
        }
        channel.apply(|run| run.ingest("[SYSTEM] ✅ Blueprint Execution Completed")).await;

        // Nothing after the replay: the stream ends rather than resuming
        // somewhere past line 0.
        let events = collect(follow(replay.clone(), rx)).await;
        assert_eq!(events, replay);

        // Reconnecting replays everything.
        let (replay, rx) = channel.subscribe().await;
        let events = collect(follow(replay, rx)).await;
        let logs: Vec<&RunEvent> = events.iter().filter(|e| matches!(e, RunEvent::Log(_))).collect();
        assert_eq!(logs.len(), 302);
        assert_eq!(logs[1], &RunEvent::Log("line 0".to_string()));
        assert_eq!(events.last(), Some(&RunEvent::Status(RunStatus::Completed)));
    }
}
