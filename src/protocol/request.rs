//! Request and Response message types.
//!
//! Defines the message format for command requests and responses
//! between the local end (Rust) and the remote automation end.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::{FrameId, RequestId, TabId};

use super::Command;

// ============================================================================
// Constants
// ============================================================================

/// Remote error code for a script that threw.
const SCRIPT_ERROR_CODE: &str = "javascript error";

/// Remote error code for a script that exceeded its timeout.
const SCRIPT_TIMEOUT_CODE: &str = "script timeout";

// ============================================================================
// Request
// ============================================================================

/// A command request from local end to remote end.
///
/// # Format
///
/// ```json
/// {
///   "id": "uuid",
///   "method": "module.methodName",
///   "tabId": 1,
///   "frameId": 0,
///   "params": { ... }
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// Unique identifier for request/response correlation.
    pub id: RequestId,

    /// Target tab ID.
    #[serde(rename = "tabId")]
    pub tab_id: TabId,

    /// Target frame ID (0 = main frame).
    #[serde(rename = "frameId")]
    pub frame_id: FrameId,

    /// Command with method and params.
    #[serde(flatten)]
    pub command: Command,
}

impl Request {
    /// Creates a new request with auto-generated ID.
    #[inline]
    #[must_use]
    pub fn new(tab_id: TabId, frame_id: FrameId, command: Command) -> Self {
        Self {
            id: RequestId::generate(),
            tab_id,
            frame_id,
            command,
        }
    }

    /// Returns the command's method name, for logging.
    #[must_use]
    pub fn method(&self) -> String {
        serde_json::to_value(&self.command)
            .ok()
            .and_then(|v| v.get("method").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_default()
    }
}

// ============================================================================
// Response
// ============================================================================

/// A response from remote end to local end.
///
/// # Format
///
/// Success:
/// ```json
/// { "id": "uuid", "type": "success", "result": { ... } }
/// ```
///
/// Error:
/// ```json
/// { "id": "uuid", "type": "error", "error": "javascript error", "message": "..." }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    /// Matches the command `id`.
    pub id: RequestId,

    /// Response type.
    #[serde(rename = "type")]
    pub response_type: ResponseType,

    /// Result data (if success).
    #[serde(default)]
    pub result: Option<Value>,

    /// Error code (if error).
    #[serde(default)]
    pub error: Option<String>,

    /// Error message (if error).
    #[serde(default)]
    pub message: Option<String>,
}

impl Response {
    /// Returns `true` if this is a success response.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.response_type == ResponseType::Success
    }

    /// Extracts the result value, returning error if response was error.
    ///
    /// Script failures map to [`Error::ScriptError`] and script timeouts to
    /// [`Error::Timeout`], so callers can tell engine failures from
    /// transport failures.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ScriptError`], [`Error::Timeout`] or
    /// [`Error::Protocol`] if the response was an error.
    pub fn into_result(self) -> Result<Value> {
        match self.response_type {
            ResponseType::Success => Ok(self.result.unwrap_or(Value::Null)),
            ResponseType::Error => {
                let error_code = self.error.unwrap_or_else(|| "unknown error".to_string());
                let message = self.message.unwrap_or_else(|| error_code.clone());
                Err(match error_code.as_str() {
                    SCRIPT_ERROR_CODE => Error::script_error(message),
                    SCRIPT_TIMEOUT_CODE => Error::timeout(message, 0),
                    _ => Error::protocol(message),
                })
            }
        }
    }

    /// Extracts the `value` field of a successful result.
    ///
    /// Missing values read as `null`.
    ///
    /// # Errors
    ///
    /// Same as [`Response::into_result`].
    pub fn into_value(self) -> Result<Value> {
        let mut result = self.into_result()?;
        Ok(result
            .get_mut("value")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }

    /// Gets a u64 value from the result.
    ///
    /// Returns 0 if key not found or not a number.
    #[inline]
    #[must_use]
    pub fn get_u64(&self, key: &str) -> u64 {
        self.result
            .as_ref()
            .and_then(|v| v.get(key))
            .and_then(|v| v.as_u64())
            .unwrap_or_default()
    }
}

// ============================================================================
// ResponseType
// ============================================================================

/// Response type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Successful response.
    Success,
    /// Error response.
    Error,
}

// ============================================================================
// Tests
// ============================================================================
