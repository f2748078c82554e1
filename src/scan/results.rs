//! Aggregated scan results.
//!
//! These types mirror the engine's result object. Unknown fields are
//! ignored so newer engine builds deserialize cleanly.

// ============================================================================
// Imports
// ============================================================================

use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

use super::report::ResultType;

// ============================================================================
// ScanResults
// ============================================================================

/// Final report of one scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScanResults {
    /// Engine name and version.
    pub test_engine: TestEngine,
    /// Runner name.
    pub test_runner: TestRunner,
    /// Browser environment the scan ran in.
    pub test_environment: TestEnvironment,
    /// Options the engine actually applied.
    pub tool_options: Value,
    /// URL of the scanned page.
    pub url: String,
    /// Time of the scan as reported by the browser.
    pub timestamp: String,
    /// Rules that passed.
    pub passes: Vec<Rule>,
    /// Rules that failed.
    pub violations: Vec<Rule>,
    /// Rules that need manual review.
    pub incomplete: Vec<Rule>,
    /// Rules that matched nothing.
    pub inapplicable: Vec<Rule>,
    /// Failure the engine reported instead of results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ScanResults {
    /// Creates an errored result with empty rule lists.
    #[must_use]
    pub fn from_error(message: impl Into<String>) -> Self {
        Self {
            timestamp: js_timestamp(),
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Converts the engine's raw output.
    ///
    /// A payload carrying only an `errorMessage` becomes
    /// [`ScanResults::from_error`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if the value does not have the result
    /// shape.
    pub fn from_engine(value: Value) -> Result<Self> {
        let mut results: Self = serde_json::from_value(value)?;
        if results.error_message.is_some() && results.timestamp.is_empty() {
            results.timestamp = js_timestamp();
        }
        Ok(results)
    }

    /// Returns `true` if the engine reported a failure.
    #[inline]
    #[must_use]
    pub fn is_errored(&self) -> bool {
        self.error_message.is_some()
    }

    /// Returns the rules of one result group.
    #[must_use]
    pub fn rules(&self, kind: ResultType) -> &[Rule] {
        match kind {
            ResultType::Violations => &self.violations,
            ResultType::Passes => &self.passes,
            ResultType::Incomplete => &self.incomplete,
            ResultType::Inapplicable => &self.inapplicable,
        }
    }
}

// ============================================================================
// Environment Types
// ============================================================================

/// Engine identification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestEngine {
    /// Engine name.
    pub name: String,
    /// Engine version.
    pub version: String,
}

/// Runner identification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestRunner {
    /// Runner name.
    pub name: String,
}

/// Browser environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TestEnvironment {
    /// Browser user agent.
    pub user_agent: String,
    /// Viewport width in CSS pixels.
    pub window_width: u32,
    /// Viewport height in CSS pixels.
    pub window_height: u32,
    /// Screen orientation angle.
    pub orientation_angle: Option<i32>,
    /// Screen orientation type.
    pub orientation_type: Option<String>,
}

// ============================================================================
// Rule Types
// ============================================================================

/// Outcome of one rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Rule {
    /// Rule id.
    pub id: String,
    /// What the rule checks.
    pub description: String,
    /// Short remediation text.
    pub help: String,
    /// Link to documentation.
    pub help_url: String,
    /// Highest impact among the nodes.
    pub impact: Option<String>,
    /// Tags of the rule.
    pub tags: Vec<String>,
    /// Nodes the rule ran against.
    pub nodes: Vec<CheckedNode>,
}

/// A node a rule ran against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckedNode {
    /// Outer HTML snippet.
    pub html: String,
    /// Impact for this node.
    pub impact: Option<String>,
    /// Selector path; entries for nested frames are arrays.
    pub target: Vec<Value>,
    /// Human readable summary of failed checks.
    pub failure_summary: Option<String>,
    /// Checks of which at least one must pass.
    pub any: Vec<Check>,
    /// Checks that must all pass.
    pub all: Vec<Check>,
    /// Checks that must all fail.
    pub none: Vec<Check>,
}

/// Result of one check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Check {
    /// Check id.
    pub id: String,
    /// Impact if the check fails.
    pub impact: Option<String>,
    /// Message shown for the outcome.
    pub message: String,
    /// Check-specific data.
    pub data: Value,
    /// Other nodes involved.
    pub related_nodes: Vec<RelatedNode>,
}

/// A node referenced by a check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelatedNode {
    /// Outer HTML snippet.
    pub html: String,
    /// Selector path.
    pub target: Vec<Value>,
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Formats the current time like JavaScript's `Date.prototype.toString`.
fn js_timestamp() -> String {
    Local::now().format("%a %b %d %Y %H:%M:%S GMT%z").to_string()
}

// ============================================================================
// Tests
// ============================================================================
