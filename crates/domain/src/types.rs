//! Octoparse Open API wire types
//!
//! Payload shapes are structural only: the connector never interprets the
//! scraped row contents, so rows stay as raw JSON objects.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Account credentials supplied once at client construction.
///
/// Immutable after creation and never logged; `Debug` redacts the password.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into() }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Token exchange response from `POST /token`.
///
/// Standard password/refresh-token grant response. `expires_in` arrives as a
/// JSON number or a numeric string depending on API revision; both are
/// accepted. Values that cannot be read as a finite number are mapped to 0
/// here, and the session layer substitutes its fallback lifetime for any
/// non-positive value.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    #[serde(deserialize_with = "flexible_seconds")]
    pub expires_in: i64,
    pub refresh_token: Option<String>,
}

fn flexible_seconds<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_seconds(&value))
}

fn coerce_seconds(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

/// A task group as listed by `GET /taskGroup`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskGroup {
    /// Numeric group identifier (current API generation)
    pub task_group_id: i64,
    pub task_group_name: String,
}

/// A scraping task as listed by `GET /task`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Opaque task identifier (GUID string)
    pub task_id: String,
    pub task_name: String,
}

/// Pagination cursor returned inside a data page.
///
/// The API reports the next offset as a number or as a string depending on
/// endpoint; the connector passes it through unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OffsetCursor {
    Number(u64),
    Text(String),
}

impl fmt::Display for OffsetCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// A page of scraped rows from the data endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataRows {
    /// Total rows held by the task
    pub total: u64,
    /// Cursor to resume fetching from
    pub offset: OffsetCursor,
    /// The fetched rows, kept as raw JSON objects
    #[serde(default)]
    pub data_list: Vec<serde_json::Map<String, Value>>,
    /// Rows remaining after this page, when the endpoint reports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rest_total: Option<u64>,
}
