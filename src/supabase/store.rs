use std::time::Duration;

use reqwest::Client;
use tracing::info;

use super::with_keys;
use crate::config::join_url;
use crate::error::ClientError;
use crate::types::{Blueprint, BlueprintSummary, NewBlueprint};

const LIST_ALL: &str = "/rest/v1/blueprints?select=*&order=created_at.desc";
const LIST_SUMMARIES: &str = "/rest/v1/blueprints?select=id,name&order=created_at.desc";
const INSERT: &str = "/rest/v1/blueprints";

/// Row access to the `blueprints` table, as the signed-in user.
///
/// Only reads and inserts are used; steps are appended by the orchestrator.
#[derive(Clone)]
pub struct BlueprintStore {
    client: Client,
    base_url: String,
    anon_key: String,
    timeout: Duration,
}

impl BlueprintStore {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            anon_key: anon_key.into(),
            timeout,
        }
    }

    /// Every blueprint, newest first.
    pub async fn list(&self, access_token: &str) -> Result<Vec<Blueprint>, ClientError> {
        self.select(LIST_ALL, access_token).await
    }

    /// `id, name` only, newest first; for pickers.
    pub async fn list_summaries(&self, access_token: &str) -> Result<Vec<BlueprintSummary>, ClientError> {
        self.select(LIST_SUMMARIES, access_token).await
    }

    async fn select<T>(&self, path: &str, access_token: &str) -> Result<Vec<T>, ClientError>
    where
        T: serde::de::DeserializeOwned,
    {
        let request = self
            .client
            .get(join_url(&self.base_url, path))
            .timeout(self.timeout);
        let response = with_keys(request, &self.anon_key, Some(access_token)).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }
        Ok(response.json().await?)
    }

    /// Inserts a blueprint with just a name and returns the stored row.
    pub async fn create(&self, access_token: &str, name: &str) -> Result<Blueprint, ClientError> {
        let request = self
            .client
            .post(join_url(&self.base_url, INSERT))
            .timeout(self.timeout)
            .header("Prefer", "return=representation")
            .json(&NewBlueprint {
                name: name.to_string(),
            });
        let response = with_keys(request, &self.anon_key, Some(access_token)).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }
        let mut rows: Vec<Blueprint> = response.json().await?;
        if rows.is_empty() {
            return Err(ClientError::Decode("insert returned no rows".to_string()));
        }
        let created = rows.swap_remove(0);
        info!("[Store] Created blueprint {} ({})", created.name, created.id);
        Ok(created)
    }
}
