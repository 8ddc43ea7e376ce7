//! Octoparse session client
//!
//! Owns the account credentials and the mutable token state, and exposes the
//! data-retrieval and lifecycle operations as typed async calls. Every
//! operation runs the same request pipeline: make sure a usable bearer token
//! is held (authenticating or refreshing as needed), dispatch the request,
//! recover exactly once from an unauthorized response, then normalize the
//! body through [`crate::envelope`].

use std::time::Duration;

use octoparse_domain::{
    Credentials, DataRows, OctoparseError, Result, Task, TaskGroup, TokenResponse,
};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::envelope;
use crate::token::SessionToken;

const DEFAULT_BASE_URL: &str = "https://openapi.octoparse.com";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Refresh lead time: exchange the token this long before it expires.
const REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Authenticated client for the Octoparse Open API.
///
/// One logical session per instance. The token state is guarded by a mutex
/// and the check-and-exchange runs under the lock, so callers issuing
/// concurrent operations cannot trigger redundant refreshes or clobber a
/// freshly issued token with a stale one.
pub struct SessionClient {
    base_url: String,
    http: Client,
    credentials: Credentials,
    token: Mutex<SessionToken>,
}

impl SessionClient {
    /// Create a client for the production API endpoint.
    ///
    /// # Errors
    /// Returns [`OctoparseError::Internal`] if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(credentials: Credentials) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| OctoparseError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            http,
            credentials,
            token: Mutex::new(SessionToken::default()),
        })
    }

    /// Point the client at a different API endpoint (self-hosted gateways,
    /// tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    // --- Token lifecycle ---

    /// Exchange username/password for a fresh token set.
    async fn authenticate(&self, token: &mut SessionToken) -> Result<()> {
        debug!("requesting access token with password grant");

        let body = json!({
            "username": self.credentials.username(),
            "password": self.credentials.password(),
            "grant_type": "password",
        });

        let response = self
            .http
            .post(format!("{}/token", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(OctoparseError::Auth(format!(
                "authentication failed (HTTP {}): {text}",
                status.as_u16()
            )));
        }

        let parsed: TokenResponse =
            response.json().await.map_err(|e| OctoparseError::Parse(e.to_string()))?;
        token.store(parsed);
        info!("session authenticated");
        Ok(())
    }

    /// Exchange the held refresh token for a fresh token set, falling back
    /// to full authentication when the server rejects it.
    async fn refresh(&self, token: &mut SessionToken) -> Result<()> {
        let Some(refresh_token) = token.refresh_token().map(str::to_string) else {
            return self.authenticate(token).await;
        };

        debug!("requesting access token with refresh grant");

        let body = json!({
            "refresh_token": refresh_token,
            "grant_type": "refresh_token",
        });

        let response = self
            .http
            .post(format!("{}/token", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            warn!(
                status = response.status().as_u16(),
                "token refresh rejected, falling back to full authentication"
            );
            return self.authenticate(token).await;
        }

        let parsed: TokenResponse =
            response.json().await.map_err(|e| OctoparseError::Parse(e.to_string()))?;
        token.store(parsed);
        info!("access token refreshed");
        Ok(())
    }

    /// Make sure a usable bearer token is held and return it.
    ///
    /// Refreshes when the token is inside the expiry margin and the refresh
    /// token is still live; authenticates from scratch otherwise. Runs
    /// entirely under the token lock.
    async fn ensure_token(&self) -> Result<String> {
        let mut token = self.token.lock().await;

        if token.needs_exchange(chrono::Duration::seconds(REFRESH_MARGIN_SECS)) {
            if token.refresh_usable() {
                self.refresh(&mut token).await?;
            } else {
                self.authenticate(&mut token).await?;
            }
        }

        token
            .access_token()
            .map(str::to_string)
            .ok_or_else(|| OctoparseError::Internal("token exchange left no access token".into()))
    }

    // --- Request pipeline ---

    /// Dispatch an authenticated request and normalize the response body.
    ///
    /// Bounded retry: an unauthorized response on the first attempt drops
    /// the held token, forces a full re-authentication and retries the
    /// request once; a second unauthorized response is fatal.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);

        for attempt in 0..2u8 {
            let bearer = self.ensure_token().await?;

            let mut request = self.http.request(method.clone(), &url).bearer_auth(&bearer);
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            debug!(%method, path, attempt, "sending API request");
            let response = request.send().await.map_err(transport_error)?;

            let status = response.status();
            debug!(status = status.as_u16(), path, "received API response");

            match status {
                StatusCode::UNAUTHORIZED if attempt == 0 => {
                    warn!(path, "access token rejected, re-authenticating");
                    let mut token = self.token.lock().await;
                    token.clear();
                    self.authenticate(&mut token).await?;
                }
                StatusCode::UNAUTHORIZED => {
                    return Err(OctoparseError::Auth(
                        "request still unauthorized after re-authentication".into(),
                    ));
                }
                StatusCode::FORBIDDEN => return Err(OctoparseError::PlanRestricted),
                StatusCode::TOO_MANY_REQUESTS => return Err(OctoparseError::RateLimited),
                status if !status.is_success() => {
                    let text = response.text().await.unwrap_or_default();
                    return Err(OctoparseError::Api { status: status.as_u16(), message: text });
                }
                _ => {
                    let raw: Value = response
                        .json()
                        .await
                        .map_err(|e| OctoparseError::Parse(e.to_string()))?;
                    return envelope::unwrap_envelope(raw);
                }
            }
        }

        Err(OctoparseError::Internal("request loop exhausted without a response".into()))
    }

    // --- Operations ---

    /// List all task groups in the account.
    pub async fn list_task_groups(&self) -> Result<Vec<TaskGroup>> {
        let raw = self.execute(Method::GET, "/taskGroup", &[], None).await?;
        decode(raw)
    }

    /// List the tasks inside a task group.
    pub async fn list_tasks(&self, task_group_id: i64) -> Result<Vec<Task>> {
        let query = [("taskGroupId", task_group_id.to_string())];
        let raw = self.execute(Method::GET, "/task", &query, None).await?;
        decode(raw)
    }

    /// Fetch a page of scraped rows by offset.
    ///
    /// Does not affect the rows' export status. `offset` is the resume
    /// cursor from a previous page; `size` must be in `1..=1000` (enforced
    /// by the calling surface).
    pub async fn get_task_data(&self, task_id: &str, offset: u64, size: u32) -> Result<DataRows> {
        let query = [
            ("taskId", task_id.to_string()),
            ("offset", offset.to_string()),
            ("size", size.to_string()),
        ];
        let raw =
            self.execute(Method::GET, "/alldata/getDataOfTaskByOffset", &query, None).await?;
        decode(raw)
    }

    /// Fetch rows that have not been exported yet.
    ///
    /// The server marks the returned rows as `exporting`; follow up with
    /// [`Self::mark_data_as_exported`] once they are safely stored.
    pub async fn get_not_exported_data(&self, task_id: &str, size: u32) -> Result<DataRows> {
        let query = [("taskId", task_id.to_string()), ("size", size.to_string())];
        let raw = self.execute(Method::GET, "/data/notexported", &query, None).await?;
        decode(raw)
    }

    /// Flip previously fetched `exporting` rows to `exported`.
    pub async fn mark_data_as_exported(&self, task_id: &str) -> Result<()> {
        let body = json!({ "taskId": task_id });
        self.execute(Method::POST, "/data/notexported/update", &[], Some(&body)).await?;
        info!(task_id, "data marked as exported");
        Ok(())
    }

    /// Delete all rows held by a task. Irreversible on the server.
    pub async fn clear_task_data(&self, task_id: &str) -> Result<()> {
        let body = json!({ "taskId": task_id });
        self.execute(Method::POST, "/task/removeDataByTaskId", &[], Some(&body)).await?;
        info!(task_id, "task data cleared");
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(payload: Value) -> Result<T> {
    serde_json::from_value(payload).map_err(|e| OctoparseError::Parse(e.to_string()))
}

fn transport_error(err: reqwest::Error) -> OctoparseError {
    OctoparseError::Network(err.to_string())
}
