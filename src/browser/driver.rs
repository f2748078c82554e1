//! Host automation driver boundary.
//!
//! [`HostDriver`] is everything the scan orchestrator needs from a browser
//! automation backend: script evaluation in the active frame, a movable
//! frame cursor, and a way to open and close top-level contexts.
//!
//! | Capability | Methods |
//! |------------|---------|
//! | Scripts | `evaluate`, `evaluate_async`, `evaluate_handle` |
//! | Frame cursor | `switch_to_frame`, `switch_to_parent_frame`, `switch_to_default_content`, `child_frames` |
//! | Contexts | `current_context`, `open_blank_context`, `switch_to_context`, `close_context` |
//! | Limits | `set_script_timeout` |
//!
//! Script conventions follow WebDriver: inputs arrive in `arguments`, and
//! async scripts resolve by calling `arguments[arguments.length - 1]`.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::identifiers::{ContextId, ElementId};

// ============================================================================
// FrameHandle
// ============================================================================

/// Concrete reference to a child frame the cursor can enter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FrameHandle {
    /// A `frame`/`iframe` element.
    Element(ElementId),
    /// Zero-based position among the current frame's children.
    Index(usize),
    /// The frame's `name` or `id` attribute.
    Name(String),
}

impl FrameHandle {
    /// Interprets a plain script value as a frame handle.
    ///
    /// Numbers become [`FrameHandle::Index`], non-empty strings
    /// [`FrameHandle::Name`]. Anything else is not a handle.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().map(|i| Self::Index(i as usize)),
            Value::String(s) if !s.is_empty() => Some(Self::Name(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for FrameHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Element(id) => write!(f, "element:{id}"),
            Self::Index(i) => write!(f, "index:{i}"),
            Self::Name(name) => write!(f, "name:{name}"),
        }
    }
}

// ============================================================================
// HostDriver
// ============================================================================

/// Browser automation backend driven by a scan.
///
/// The active frame is interior state of the implementation, so every method
/// takes `&self`. A scan owns its driver exclusively for its duration.
#[async_trait]
pub trait HostDriver: Send + Sync {
    /// Evaluates a synchronous script in the active frame.
    async fn evaluate(&self, script: &str, args: Vec<Value>) -> Result<Value>;

    /// Evaluates an async script in the active frame.
    ///
    /// Bounded by the timeout set with [`HostDriver::set_script_timeout`].
    async fn evaluate_async(&self, script: &str, args: Vec<Value>) -> Result<Value>;

    /// Evaluates a script and interprets its return value as a frame handle.
    ///
    /// Returns `None` when the script yields nothing usable.
    async fn evaluate_handle(&self, script: &str, args: Vec<Value>)
    -> Result<Option<FrameHandle>>;

    /// Lists the `frame`/`iframe` elements of the active frame.
    async fn child_frames(&self) -> Result<Vec<FrameHandle>>;

    /// Moves the cursor into a child frame.
    async fn switch_to_frame(&self, frame: &FrameHandle) -> Result<()>;

    /// Moves the cursor to the parent of the active frame.
    async fn switch_to_parent_frame(&self) -> Result<()>;

    /// Moves the cursor to the top document of the current context.
    async fn switch_to_default_content(&self) -> Result<()>;

    /// Returns the focused top-level context.
    async fn current_context(&self) -> Result<ContextId>;

    /// Opens a new `about:blank` context and focuses it.
    ///
    /// On failure no new context stays open and focus is unchanged.
    async fn open_blank_context(&self) -> Result<ContextId>;

    /// Focuses an existing context.
    async fn switch_to_context(&self, context: &ContextId) -> Result<()>;

    /// Closes a context.
    async fn close_context(&self, context: &ContextId) -> Result<()>;

    /// Sets the bound applied to [`HostDriver::evaluate_async`].
    async fn set_script_timeout(&self, timeout: Duration) -> Result<()>;
}

// ============================================================================
// Tests
// ============================================================================
