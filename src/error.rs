//! Error types for the scan orchestrator.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use axe_webdriver::{Result, ScanBuilder};
//!
//! async fn example(page: &Page) -> Result<()> {
//!     let results = ScanBuilder::new().source(source).analyze(page).await?;
//!     println!("{} violations", results.violations.len());
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidArgument`], [`Error::SourceFetch`] |
//! | Scan phases | [`Error::Injection`], [`Error::SandboxBypass`], [`Error::OriginAllowList`], [`Error::PartialScan`], [`Error::Aggregation`] |
//! | Frames | [`Error::FrameResolution`], [`Error::ContextRestore`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`] |
//! | Execution | [`Error::ScriptError`], [`Error::Timeout`], [`Error::RequestTimeout`], [`Error::Protocol`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`], [`Error::Http`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::RequestId;
use crate::scan::ScanPhase;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

/// Guidance attached to aggregation failures.
const AGGREGATION_HINT: &str =
    "finishRun failed. Make sure popups and new windows are not blocked by the browser";

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Scan-phase variants wrap the error that caused them so the original
/// driver or script failure stays visible through [`std::error::Error::source`].
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when the scan builder is missing required settings.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Invalid argument in scan options or context.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    /// Engine source could not be loaded.
    #[error("Unable to load engine source from {location}: {message}")]
    SourceFetch {
        /// File path or URL of the source.
        location: String,
        /// Description of the failure.
        message: String,
    },

    // ========================================================================
    // Scan Phase Errors
    // ========================================================================
    /// Engine source failed to evaluate in a browsing context.
    #[error("Unable to inject engine script: {source}")]
    Injection {
        /// Underlying failure.
        source: Box<Error>,
    },

    /// Replacing sandboxed iframes failed.
    #[error("Error when removing sandbox from iframes: {source}")]
    SandboxBypass {
        /// Underlying failure.
        source: Box<Error>,
    },

    /// Configuring the engine's origin allow-list failed.
    #[error("Error when enabling iframe communication: {source}")]
    OriginAllowList {
        /// Underlying failure.
        source: Box<Error>,
    },

    /// The engine's partial scan (or frame discovery) threw or timed out.
    #[error("Partial scan failed: {source}")]
    PartialScan {
        /// Underlying failure.
        source: Box<Error>,
    },

    /// The isolated finish step failed.
    #[error("{hint}: {source}", hint = AGGREGATION_HINT)]
    Aggregation {
        /// Underlying failure.
        source: Box<Error>,
    },

    // ========================================================================
    // Frame Errors
    // ========================================================================
    /// A frame selector did not resolve to a usable frame.
    #[error("Frame not reachable: {selector}")]
    FrameResolution {
        /// Serialized frame selector.
        selector: String,
    },

    /// Switching back to the parent context failed.
    ///
    /// The driver's frame cursor is lost; the traversal cannot continue.
    #[error("Unable to restore parent browsing context: {source}")]
    ContextRestore {
        /// Underlying failure.
        source: Box<Error>,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connection timeout waiting for the remote end.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// WebSocket connection closed unexpectedly.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// Protocol violation or unexpected response.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// JavaScript execution error.
    ///
    /// Returned when a script throws inside the browser.
    #[error("Script error: {message}")]
    ScriptError {
        /// Error message from script execution.
        message: String,
    },

    /// Operation timeout.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Command request timeout.
    #[error("Request {request_id} timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// The request ID that timed out.
        request_id: RequestId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// HTTP error while downloading the engine source.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a source fetch error.
    #[inline]
    pub fn source_fetch(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceFetch {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Wraps an error as an injection failure.
    #[inline]
    pub fn injection(source: Error) -> Self {
        Self::Injection {
            source: Box::new(source),
        }
    }

    /// Wraps an error as a sandbox bypass failure.
    #[inline]
    pub fn sandbox_bypass(source: Error) -> Self {
        Self::SandboxBypass {
            source: Box::new(source),
        }
    }

    /// Wraps an error as an origin allow-list failure.
    #[inline]
    pub fn origin_allow_list(source: Error) -> Self {
        Self::OriginAllowList {
            source: Box::new(source),
        }
    }

    /// Wraps an error as a partial scan failure.
    ///
    /// Errors that already name their phase are returned unchanged.
    #[inline]
    pub fn partial_scan(source: Error) -> Self {
        match source {
            Self::PartialScan { .. } | Self::Injection { .. } | Self::ContextRestore { .. } => {
                source
            }
            other => Self::PartialScan {
                source: Box::new(other),
            },
        }
    }

    /// Wraps an error as an aggregation failure.
    #[inline]
    pub fn aggregation(source: Error) -> Self {
        match source {
            Self::Aggregation { .. } => source,
            other => Self::Aggregation {
                source: Box::new(other),
            },
        }
    }

    /// Creates a frame resolution error.
    #[inline]
    pub fn frame_resolution(selector: impl Into<String>) -> Self {
        Self::FrameResolution {
            selector: selector.into(),
        }
    }

    /// Wraps an error as a lost frame cursor.
    #[inline]
    pub fn context_restore(source: Error) -> Self {
        Self::ContextRestore {
            source: Box::new(source),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a script error.
    #[inline]
    pub fn script_error(message: impl Into<String>) -> Self {
        Self::ScriptError {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(request_id: RequestId, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            request_id,
            timeout_ms,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. } | Self::Timeout { .. } | Self::RequestTimeout { .. }
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if a script threw inside the browser.
    #[inline]
    #[must_use]
    pub fn is_script_error(&self) -> bool {
        matches!(self, Self::ScriptError { .. })
    }

    /// Returns `true` if a frame selector could not be resolved or entered.
    #[inline]
    #[must_use]
    pub fn is_frame_resolution(&self) -> bool {
        matches!(self, Self::FrameResolution { .. })
    }

    /// Returns `true` if the traversal must stop even below the top frame.
    ///
    /// A lost frame cursor or a dead connection would corrupt every
    /// remaining sibling, so these are never absorbed per frame.
    #[inline]
    #[must_use]
    pub fn is_fatal_for_traversal(&self) -> bool {
        match self {
            Self::ContextRestore { .. } | Self::ConnectionClosed => true,
            Self::PartialScan { source } | Self::Injection { source } => {
                source.is_fatal_for_traversal()
            }
            _ => false,
        }
    }

    /// Returns the scan phase this error is attributed to, if any.
    #[must_use]
    pub fn phase(&self) -> Option<ScanPhase> {
        match self {
            Self::Injection { .. } | Self::SandboxBypass { .. } => Some(ScanPhase::Negotiating),
            Self::PartialScan { .. } | Self::ContextRestore { .. } => Some(ScanPhase::Traversing),
            Self::Aggregation { .. } => Some(ScanPhase::Aggregating),
            Self::OriginAllowList { .. } => Some(ScanPhase::LegacyRunning),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
