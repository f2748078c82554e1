//! Command definitions organized by module.
//!
//! Commands follow `module.methodName` format.
//!
//! # Command Modules
//!
//! | Module | Commands |
//! |--------|----------|
//! | `browsingContext` | Tabs, navigation, frame cursor |
//! | `script` | JavaScript evaluation |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identifiers::ElementId;

// ============================================================================
// Command Wrapper
// ============================================================================

/// All protocol commands organized by module.
///
/// This enum wraps module-specific command enums for unified serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Command {
    /// BrowsingContext module commands.
    BrowsingContext(BrowsingContextCommand),
    /// Script module commands.
    Script(ScriptCommand),
}

// ============================================================================
// BrowsingContext Commands
// ============================================================================

/// BrowsingContext module commands for tabs and the frame cursor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum BrowsingContextCommand {
    /// Navigate to URL.
    #[serde(rename = "browsingContext.navigate")]
    Navigate {
        /// URL to navigate to.
        url: String,
    },

    /// Get current URL.
    #[serde(rename = "browsingContext.getUrl")]
    GetUrl,

    /// Create new tab.
    #[serde(rename = "browsingContext.newTab")]
    NewTab,

    /// Close current tab.
    #[serde(rename = "browsingContext.closeTab")]
    CloseTab,

    /// Switch to frame by element reference.
    #[serde(rename = "browsingContext.switchToFrame")]
    SwitchToFrame {
        /// Element ID of iframe.
        #[serde(rename = "elementId")]
        element_id: ElementId,
    },

    /// Switch to frame by index.
    #[serde(rename = "browsingContext.switchToFrameByIndex")]
    SwitchToFrameByIndex {
        /// Zero-based frame index.
        index: usize,
    },

    /// Switch to frame by `name` or `id` attribute.
    #[serde(rename = "browsingContext.switchToFrameByName")]
    SwitchToFrameByName {
        /// Frame name or id.
        name: String,
    },

    /// Switch to parent frame.
    #[serde(rename = "browsingContext.switchToParentFrame")]
    SwitchToParentFrame,

    /// List `frame`/`iframe` elements of the current frame.
    #[serde(rename = "browsingContext.getChildFrames")]
    GetChildFrames,
}

// ============================================================================
// Script Commands
// ============================================================================

/// Script module commands for JavaScript execution.
///
/// Scripts read their inputs from `arguments`; async scripts resolve by
/// calling the last argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum ScriptCommand {
    /// Execute synchronous script.
    #[serde(rename = "script.evaluate")]
    Evaluate {
        /// JavaScript code.
        script: String,
        /// Script arguments.
        #[serde(default)]
        args: Vec<Value>,
    },

    /// Execute async script.
    #[serde(rename = "script.evaluateAsync")]
    EvaluateAsync {
        /// JavaScript code.
        script: String,
        /// Script arguments.
        #[serde(default)]
        args: Vec<Value>,
        /// Remote-side timeout in milliseconds.
        #[serde(rename = "timeoutMs")]
        timeout_ms: u64,
    },

    /// Execute script and store the returned element.
    ///
    /// Result carries `elementId`, or `null` when the script returned
    /// nothing element-like.
    #[serde(rename = "script.evaluateHandle")]
    EvaluateHandle {
        /// JavaScript code.
        script: String,
        /// Script arguments.
        #[serde(default)]
        args: Vec<Value>,
    },
}

// ============================================================================
// Tests
// ============================================================================
