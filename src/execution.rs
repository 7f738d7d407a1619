//! Live execution runs: the status/log state machine, the loop that feeds it
//! from the orchestrator's stream, and the registry of runs in flight.

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Serialize;
use tokio::sync::{Mutex, broadcast};
use tokio::task::AbortHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::orchestrator::OrchestratorClient;
use crate::stream::{LineDecoder, classify, event_payload};
use crate::types::{ExecuteRequest, RunStatus};

pub const CONNECTING_LOG: &str = "[SYSTEM] Connecting to Local Orchestration API...";
pub const ABORTED_LOG: &str = "[SYSTEM] Execution aborted by operator.";

/// Runs kept around for late subscribers before finished ones are evicted.
pub const MAX_RETAINED_RUNS: usize = 16;
const EVENT_CAPACITY: usize = 256;

/// A change to a run, as pushed to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RunEvent {
    Status(RunStatus),
    Log(String),
}

impl RunEvent {
    /// A status that ends the run's stream: anything but `STARTING` or
    /// `RUNNING`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunEvent::Status(status) if !status.is_active())
    }
}

/// Status and log of one execution.
///
/// Transitions: `IDLE -> STARTING -> RUNNING -> {COMPLETED, ERROR}`, plus
/// `abort` from anywhere back to `IDLE`. After an abort the run is closed and
/// ignores anything still arriving from the stream.
///
/// A status change is always published after the log line that caused it.
#[derive(Debug, Clone)]
pub struct ExecutionRun {
    status: RunStatus,
    logs: Vec<String>,
    closed: bool,
}

impl Default for ExecutionRun {
    fn default() -> Self {
        Self {
            status: RunStatus::Idle,
            logs: Vec::new(),
            closed: false,
        }
    }
}

impl ExecutionRun {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    /// Current state as the events a fresh subscriber needs: the log, then
    /// the status.
    pub fn replay(&self) -> Vec<RunEvent> {
        self.logs
            .iter()
            .cloned()
            .map(RunEvent::Log)
            .chain(std::iter::once(RunEvent::Status(self.status)))
            .collect()
    }

    pub fn start(&mut self) -> Vec<RunEvent> {
        if self.closed {
            return Vec::new();
        }
        self.logs = vec![CONNECTING_LOG.to_string()];
        vec![
            RunEvent::Log(CONNECTING_LOG.to_string()),
            self.set_status(RunStatus::Starting),
        ]
    }

    /// Response headers arrived; the body is about to be read.
    pub fn connected(&mut self) -> Vec<RunEvent> {
        if self.closed {
            return Vec::new();
        }
        vec![self.set_status(RunStatus::Running)]
    }

    /// Applies one log entry from the stream. Blank entries are classified
    /// but not shown.
    pub fn ingest(&mut self, entry: &str) -> Vec<RunEvent> {
        if self.closed {
            return Vec::new();
        }
        let mut events = Vec::new();
        if !entry.trim().is_empty() {
            self.logs.push(entry.to_string());
            events.push(RunEvent::Log(entry.to_string()));
        }
        if let Some(status) = classify(entry) {
            events.push(self.set_status(status));
        }
        events
    }

    /// The transport gave up: connection refused, bad status, broken body.
    pub fn fail(&mut self, reason: &str) -> Vec<RunEvent> {
        if self.closed {
            return Vec::new();
        }
        let line = format!("[ERROR] Failed to connect to API: {}", reason);
        self.logs.push(line.clone());
        vec![RunEvent::Log(line), self.set_status(RunStatus::Error)]
    }

    pub fn abort(&mut self) -> Vec<RunEvent> {
        if self.closed {
            return Vec::new();
        }
        self.closed = true;
        self.logs.push(ABORTED_LOG.to_string());
        vec![
            RunEvent::Log(ABORTED_LOG.to_string()),
            self.set_status(RunStatus::Idle),
        ]
    }

    fn set_status(&mut self, status: RunStatus) -> RunEvent {
        self.status = status;
        RunEvent::Status(status)
    }
}

/// A run plus the broadcast of its changes.
pub struct RunChannel {
    run: Mutex<ExecutionRun>,
    events: broadcast::Sender<RunEvent>,
}

impl Default for RunChannel {
    fn default() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            run: Mutex::new(ExecutionRun::new()),
            events,
        }
    }
}

impl RunChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutates the run and publishes what changed. Publishing happens under
    /// the lock so subscribers never see events out of order with a replay.
    pub async fn apply<F>(&self, change: F)
    where
        F: FnOnce(&mut ExecutionRun) -> Vec<RunEvent>,
    {
        let mut run = self.run.lock().await;
        for event in change(&mut run) {
            let _ = self.events.send(event);
        }
    }

    /// Replay of the current state plus a receiver for everything after it.
    pub async fn subscribe(&self) -> (Vec<RunEvent>, broadcast::Receiver<RunEvent>) {
        let run = self.run.lock().await;
        (run.replay(), self.events.subscribe())
    }

    pub async fn snapshot(&self) -> ExecutionRun {
        self.run.lock().await.clone()
    }
}

/// Reads an execute body to the end, feeding every event line into the run.
///
/// End of stream leaves the status alone; a transport error marks the run
/// failed and stops reading.
pub async fn pump<S, E>(channel: &RunChannel, mut body: S)
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    let mut decoder = LineDecoder::new();

    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(bytes) => {
                let entries = payloads(decoder.push(&bytes));
                if !entries.is_empty() {
                    channel
                        .apply(|run| entries.iter().flat_map(|entry| run.ingest(entry)).collect())
                        .await;
                }
            }
            Err(e) => {
                warn!("[Execution] Stream broke: {}", e);
                channel.apply(|run| run.fail(&e.to_string())).await;
                return;
            }
        }
    }

    if let Some(tail) = decoder.finish() {
        if let Some(entry) = event_payload(&tail) {
            channel.apply(|run| run.ingest(entry)).await;
        }
    }
    info!("[Execution] Stream ended");
}

fn payloads(lines: Vec<String>) -> Vec<String> {
    lines
        .iter()
        .filter_map(|line| event_payload(line).map(str::to_string))
        .collect()
}

/// Connects to the orchestrator and pumps the run. The run must already be
/// started.
async fn drive(orchestrator: OrchestratorClient, channel: Arc<RunChannel>, request: ExecuteRequest) {
    match orchestrator.execute(&request).await {
        Ok(body) => {
            channel.apply(ExecutionRun::connected).await;
            pump(&channel, body).await;
        }
        Err(e) => {
            warn!("[Execution] Could not start {}: {}", request.blueprint_id, e);
            channel.apply(|run| run.fail(&e.to_string())).await;
        }
    }
}

struct RunSlot {
    owner: String,
    channel: Arc<RunChannel>,
    task: AbortHandle,
    started: Instant,
}

/// Runs in flight, by id. Each run belongs to the user who started it and
/// is invisible to everyone else.
#[derive(Default)]
pub struct Executions {
    runs: Mutex<HashMap<Uuid, RunSlot>>,
}

impl Executions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a fresh run for `owner` in the background and returns its id.
    pub async fn launch(&self, orchestrator: OrchestratorClient, request: ExecuteRequest, owner: &str) -> Uuid {
        let id = Uuid::new_v4();
        let channel = Arc::new(RunChannel::new());
        channel.apply(ExecutionRun::start).await;

        info!("[Execution] Run {} for blueprint {}", id, request.blueprint_id);
        let task = tokio::spawn(drive(orchestrator, channel.clone(), request)).abort_handle();

        let mut runs = self.runs.lock().await;
        evict_finished(&mut runs);
        runs.insert(
            id,
            RunSlot {
                owner: owner.to_string(),
                channel,
                task,
                started: Instant::now(),
            },
        );
        id
    }

    pub async fn channel(&self, id: Uuid, owner: &str) -> Option<Arc<RunChannel>> {
        self.runs
            .lock()
            .await
            .get(&id)
            .filter(|slot| slot.owner == owner)
            .map(|slot| slot.channel.clone())
    }

    /// Resets the run to `IDLE` and cancels its task, which drops the
    /// orchestrator response and closes the connection.
    pub async fn abort(&self, id: Uuid, owner: &str) -> bool {
        let channel = {
            let runs = self.runs.lock().await;
            let Some(slot) = runs.get(&id).filter(|slot| slot.owner == owner) else {
                return false;
            };
            slot.task.abort();
            slot.channel.clone()
        };
        channel.apply(ExecutionRun::abort).await;
        info!("[Execution] Run {} aborted by operator", id);
        true
    }

    pub async fn len(&self) -> usize {
        self.runs.lock().await.len()
    }
}

fn evict_finished(runs: &mut HashMap<Uuid, RunSlot>) {
    if runs.len() < MAX_RETAINED_RUNS {
        return;
    }
    let mut finished: Vec<(Instant, Uuid)> = runs
        .iter()
        .filter(|(_, slot)| slot.task.is_finished())
        .map(|(id, slot)| (slot.started, *id))
        .collect();
    finished.sort();

    for (_, id) in finished {
        if runs.len() < MAX_RETAINED_RUNS {
            break;
        }
        runs.remove(&id);
    }
    if runs.len() >= MAX_RETAINED_RUNS {
        warn!("[Execution] {} runs still active", runs.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = Result<Bytes, String>> + Unpin {
        futures::stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from_static(p.as_bytes())))
                .collect::<Vec<_>>(),
        )
    }

    async fn running_channel() -> RunChannel {
        let channel = RunChannel::new();
        channel.apply(ExecutionRun::start).await;
        channel.apply(ExecutionRun::connected).await;
        channel
    }

    #[test]
    fn start_resets_log_and_status() {
        let mut run = ExecutionRun::new();
        assert_eq!(run.status(), RunStatus::Idle);
        let events = run.start();
        assert_eq!(
            events,
            vec![
                RunEvent::Log(CONNECTING_LOG.to_string()),
                RunEvent::Status(RunStatus::Starting)
            ]
        );
        assert_eq!(run.logs(), [CONNECTING_LOG]);
    }

    #[test]
    fn blank_entries_are_not_logged() {
        let mut run = ExecutionRun::new();
        run.start();
        assert!(run.ingest("   ").is_empty());
        assert_eq!(run.logs().len(), 1);
    }

    #[test]
    fn abort_closes_the_run() {
        let mut run = ExecutionRun::new();
        run.start();
        run.connected();
        let events = run.abort();
        assert_eq!(events.last(), Some(&RunEvent::Status(RunStatus::Idle)));
        assert_eq!(run.logs().last().map(String::as_str), Some(ABORTED_LOG));

        assert!(run.ingest("[SYSTEM] ✅ Blueprint Execution Completed").is_empty());
        assert!(run.fail("late").is_empty());
        assert_eq!(run.status(), RunStatus::Idle);
        assert!(run.abort().is_empty());
    }

    #[tokio::test]
    async fn pump_reassembles_split_lines_in_order() {
        let channel = running_channel().await;
        pump(&channel, chunks(&["data: hello\n", "data: wor", "ld\n"])).await;

        let run = channel.snapshot().await;
        assert_eq!(run.logs(), [CONNECTING_LOG, "hello", "world"]);
        // No marker ever appeared.
        assert_eq!(run.status(), RunStatus::Running);
    }

    #[tokio::test]
    async fn pump_completes_on_success_marker() {
        let channel = running_channel().await;
        pump(
            &channel,
            chunks(&[
                "data: [SYSTEM] 🚀 Starting Execution Pipeline (2 steps)\n\n",
                "data: [AGENT] 🎯 Target Acquired! Clicking 4\n\n",
                "data: \n\ndata: [SYSTEM] ✅ Blueprint Execution Completed\n\n",
            ]),
        )
        .await;

        let run = channel.snapshot().await;
        assert_eq!(run.status(), RunStatus::Completed);
        assert_eq!(run.logs().len(), 4);
    }

    #[tokio::test]
    async fn pump_errors_on_failure_glyph_with_fatal_text() {
        let channel = running_channel().await;
        pump(&channel, chunks(&["data: [ERROR] ❌ Fatal exception: vision timeout\n\n"])).await;
        assert_eq!(channel.snapshot().await.status(), RunStatus::Error);
    }

    #[tokio::test]
    async fn pump_processes_unterminated_tail() {
        let channel = running_channel().await;
        pump(&channel, chunks(&["data: [SYSTEM] ✅ Blueprint Execution Completed"])).await;
        let run = channel.snapshot().await;
        assert_eq!(run.status(), RunStatus::Completed);
        assert_eq!(run.logs().last().map(String::as_str), Some("[SYSTEM] ✅ Blueprint Execution Completed"));
    }

    #[tokio::test]
    async fn transport_error_marks_run_failed() {
        let channel = running_channel().await;
        let body = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"data: step one\n")),
            Err("connection reset by peer".to_string()),
            Ok(Bytes::from_static(b"data: never read\n")),
        ]);
        pump(&channel, body).await;

        let run = channel.snapshot().await;
        assert_eq!(run.status(), RunStatus::Error);
        assert_eq!(
            run.logs(),
            [
                CONNECTING_LOG,
                "step one",
                "[ERROR] Failed to connect to API: connection reset by peer"
            ]
        );
    }

    #[tokio::test]
    async fn subscriber_gets_replay_then_live_events() {
        let channel = running_channel().await;
        let (replay, mut rx) = channel.subscribe().await;
        assert_eq!(
            replay,
            vec![
                RunEvent::Log(CONNECTING_LOG.to_string()),
                RunEvent::Status(RunStatus::Running)
            ]
        );

        channel.apply(|run| run.ingest("[SYSTEM] ✅ done")).await;
        assert_eq!(rx.recv().await.unwrap(), RunEvent::Log("[SYSTEM] ✅ done".to_string()));
        assert_eq!(rx.recv().await.unwrap(), RunEvent::Status(RunStatus::Completed));
    }

    #[test]
    fn failure_line_precedes_error_status() {
        let mut run = ExecutionRun::new();
        run.start();
        run.connected();
        let events = run.fail("connection refused");
        assert_eq!(
            events,
            vec![
                RunEvent::Log("[ERROR] Failed to connect to API: connection refused".to_string()),
                RunEvent::Status(RunStatus::Error)
            ]
        );
        assert_eq!(run.replay().last(), Some(&RunEvent::Status(RunStatus::Error)));
        assert!(run.replay().last().is_some_and(RunEvent::is_terminal));
    }

    #[tokio::test]
    async fn runs_are_visible_to_their_owner_only() {
        let executions = Executions::new();
        let orchestrator = OrchestratorClient::new(
            reqwest::Client::new(),
            "http://127.0.0.1:1",
            std::time::Duration::from_secs(1),
        );
        let request = ExecuteRequest {
            blueprint_id: "bp-1".to_string(),
            start_url: "https://example.com".to_string(),
        };
        let id = executions.launch(orchestrator, request, "user-a").await;

        assert!(executions.channel(id, "user-b").await.is_none());
        assert!(!executions.abort(id, "user-b").await);
        assert!(executions.channel(id, "user-a").await.is_some());
        assert!(executions.abort(id, "user-a").await);
    }

    #[test]
    fn run_events_serialize_with_type_tag() {
        let event = RunEvent::Status(RunStatus::Error);
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            serde_json::json!({"type": "status", "data": "ERROR"})
        );
    }
}
