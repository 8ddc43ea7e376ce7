//! Response envelope normalization
//!
//! Older Octoparse endpoints wrap every payload in a
//! `{data, error, error_Description}` envelope while newer ones return the
//! payload directly, and nothing in the HTTP layer distinguishes the two.
//! The wrapper is detected structurally: a value is treated as the legacy
//! envelope iff it is a JSON object carrying both a `data` key and an
//! `error` key whose value is a string. Everything else — arrays, objects
//! that merely happen to contain a `data` key, scalars — is a direct
//! payload and passes through unchanged.

use octoparse_domain::{OctoparseError, Result};
use serde_json::Value;

/// Status string the legacy envelope uses to signal success.
const ENVELOPE_SUCCESS: &str = "success";

/// Normalize a decoded response body into the caller-expected payload.
///
/// Pure and total over JSON-decodable input: no I/O, no state, same output
/// for the same input.
///
/// # Errors
/// Returns [`OctoparseError::Envelope`] when the legacy wrapper is detected
/// and reports a non-success status. The message is the server-provided
/// `error_Description`, falling back to the raw `error` string when the
/// description is absent or empty.
pub fn unwrap_envelope(raw: Value) -> Result<Value> {
    match raw {
        Value::Object(mut map)
            if map.contains_key("data") && map.get("error").is_some_and(Value::is_string) =>
        {
            let status = map.get("error").and_then(Value::as_str).unwrap_or_default().to_string();
            if status != ENVELOPE_SUCCESS {
                let message = map
                    .get("error_Description")
                    .and_then(Value::as_str)
                    .filter(|description| !description.is_empty())
                    .unwrap_or(&status)
                    .to_string();
                return Err(OctoparseError::Envelope(message));
            }
            Ok(map.remove("data").unwrap_or(Value::Null))
        }
        other => Ok(other),
    }
}
