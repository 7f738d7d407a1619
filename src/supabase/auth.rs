use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::with_keys;
use crate::config::join_url;
use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Tokens issued by the identity provider for a signed-in user.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

/// Identity provider client (Supabase GoTrue).
#[derive(Clone)]
pub struct SupabaseAuth {
    client: Client,
    base_url: String,
    anon_key: String,
    timeout: Duration,
}

impl SupabaseAuth {
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

    fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let request = self
            .client
            .post(self.url("/auth/v1/token?grant_type=password"))
            .timeout(self.timeout)
            .json(&Credentials { email, password });
        let response = with_keys(request, &self.anon_key, None).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }
        info!("[Auth] Signed in {}", email);
        Ok(response.json().await?)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<(), ClientError> {
        let request = self
            .client
            .post(self.url("/auth/v1/signup"))
            .timeout(self.timeout)
            .json(&Credentials { email, password });
        let response = with_keys(request, &self.anon_key, None).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }
        info!("[Auth] Sign-up requested for {}", email);
        Ok(())
    }

    /// Sends a reset link that lands on `redirect_to`.
    pub async fn reset_password_for_email(&self, email: &str, redirect_to: &str) -> Result<(), ClientError> {
        let url = Url::parse_with_params(&self.url("/auth/v1/recover"), &[("redirect_to", redirect_to)])
            .map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        let request = self
            .client
            .post(url)
            .timeout(self.timeout)
            .json(&serde_json::json!({ "email": email }));
        let response = with_keys(request, &self.anon_key, None).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }
        Ok(())
    }

    /// The user an access token belongs to; `None` if the token is not
    /// (or no longer) accepted.
    pub async fn get_user(&self, access_token: &str) -> Result<Option<User>, ClientError> {
        let request = self.client.get(self.url("/auth/v1/user")).timeout(self.timeout);
        let response = with_keys(request, &self.anon_key, Some(access_token)).send().await?;
        match response.status() {
            status if status.is_success() => Ok(Some(response.json().await?)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                debug!("[Auth] Access token rejected");
                Ok(None)
            }
            _ => Err(ClientError::from_response(response).await),
        }
    }

    pub async fn refresh_session(&self, refresh_token: &str) -> Result<Session, ClientError> {
        let request = self
            .client
            .post(self.url("/auth/v1/token?grant_type=refresh_token"))
            .timeout(self.timeout)
            .json(&serde_json::json!({ "refresh_token": refresh_token }));
        let response = with_keys(request, &self.anon_key, None).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }
        Ok(response.json().await?)
    }

    pub async fn sign_out(&self, access_token: &str) -> Result<(), ClientError> {
        let request = self.client.post(self.url("/auth/v1/logout")).timeout(self.timeout);
        let response = with_keys(request, &self.anon_key, Some(access_token)).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }
        Ok(())
    }
}
