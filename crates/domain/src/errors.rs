//! Error types used throughout the connector

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the Octoparse connector
#[derive(Error, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum OctoparseError {
    /// Full authentication failed, or a request stayed unauthorized after
    /// the single re-authentication attempt.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// HTTP 403. The account's subscription plan does not cover the
    /// requested operation. Never retried.
    #[error("HTTP 403: this operation requires a Professional plan or above")]
    PlanRestricted,

    /// HTTP 429. The API rate limit was hit. Never retried; the caller
    /// decides when to try again.
    #[error("HTTP 429: rate limit reached, wait before retrying")]
    RateLimited,

    /// Any other non-success HTTP status, with the raw body for diagnosis.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The legacy response envelope reported a non-success status.
    #[error("API reported failure: {0}")]
    Envelope(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for connector operations
pub type Result<T> = std::result::Result<T, OctoparseError>;
