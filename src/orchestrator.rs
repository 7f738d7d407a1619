use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::join_url;
use crate::error::ClientError;
use crate::types::{ExecuteRequest, OrchestratorHealth, Screenshot, TeachAction, TeachReceipt};

/// Raw body of an execute response, chunk by chunk.
pub type ExecuteStream = BoxStream<'static, Result<Bytes, ClientError>>;

/// HTTP client for the orchestrator API. Cheap to clone.
#[derive(Clone)]
pub struct OrchestratorClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl OrchestratorClient {
    pub fn new(client: Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    pub async fn health(&self) -> Result<OrchestratorHealth, ClientError> {
        let response = self
            .client
            .get(self.url("/v1/health"))
            .timeout(self.timeout)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }
        Ok(response.json().await?)
    }

    /// Current screen of the remote agent, without set-of-marks overlays.
    pub async fn screenshot(&self) -> Result<Screenshot, ClientError> {
        debug!("[Orchestrator] GET screenshot");
        let response = self
            .client
            .get(self.url("/v1/perception/screenshot?marks=false"))
            .timeout(self.timeout)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }
        let shot: Screenshot = response.json().await?;
        if shot.image_base64.is_empty() {
            return Err(ClientError::Decode("screenshot without image data".to_string()));
        }
        Ok(shot)
    }

    /// Records one action; the orchestrator appends it to the blueprint.
    pub async fn teach_action(&self, action: &TeachAction) -> Result<TeachReceipt, ClientError> {
        info!(
            "[Orchestrator] Teaching {} '{}' at ({}, {}) for {}",
            action.action, action.label, action.x, action.y, action.blueprint_id
        );
        let response = self
            .client
            .post(self.url("/v1/teach/action"))
            .timeout(self.timeout)
            .json(action)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }
        Ok(response.json().await?)
    }

    /// Starts a run and hands back its body as a byte stream.
    ///
    /// No overall timeout applies: the stream lasts as long as the run.
    /// Dropping the stream closes the connection.
    pub async fn execute(&self, request: &ExecuteRequest) -> Result<ExecuteStream, ClientError> {
        info!("[Orchestrator] Executing blueprint {}", request.blueprint_id);
        let response = self
            .client
            .post(self.url("/v1/execute"))
            .json(request)
            .send()
            .await?;
        if !response.status().is_success() {
            let err = ClientError::from_response(response).await;
            warn!("[Orchestrator] Execute rejected: {}", err);
            return Err(err);
        }
        if response.content_length() == Some(0) {
            return Err(ClientError::EmptyBody);
        }
        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(ClientError::from))
            .boxed())
    }

    /// HTML of the remote-desktop player page.
    pub async fn vnc_player(&self) -> Result<String, ClientError> {
        let response = self
            .client
            .get(self.url("/v1/dashboard/vnc"))
            .timeout(self.timeout)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }
        Ok(response.text().await?)
    }
}
