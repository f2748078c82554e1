//! Text and JSON reports.

// ============================================================================
// Imports
// ============================================================================

use std::fmt::{self, Write as _};
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::Result;

use super::results::{Rule, ScanResults};

// ============================================================================
// ResultType
// ============================================================================

/// Result group of a [`ScanResults`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultType {
    /// Failed rules.
    Violations,
    /// Passed rules.
    Passes,
    /// Rules needing review.
    Incomplete,
    /// Rules with nothing to test.
    Inapplicable,
}

impl ResultType {
    /// All groups in report order.
    pub const ALL: [Self; 4] = [
        Self::Violations,
        Self::Passes,
        Self::Incomplete,
        Self::Inapplicable,
    ];

    /// Returns the engine's name for the group.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Violations => "violations",
            Self::Passes => "passes",
            Self::Incomplete => "incomplete",
            Self::Inapplicable => "inapplicable",
        }
    }
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Text Report
// ============================================================================

/// Renders one result group as a numbered plain-text report.
///
/// Returns `None` when `rules` is empty.
///
/// ```text
/// ACCESSIBILITY CHECK
/// VIOLATIONS check for: https://example.com/
/// Found 1 items
///
/// 1: Images must have alternate text
/// Description: Ensures <img> elements have alternate text
/// Help URL: https://dequeuniversity.com/rules/axe/4.8/image-alt
/// Impact: critical
/// Tags: wcag2a, section508
///         HTML element: <img src="a.png">
///         Selector: [img]
/// ```
#[must_use]
pub fn readable_report(kind: ResultType, url: &str, rules: &[Rule]) -> Option<String> {
    if rules.is_empty() {
        return None;
    }

    let mut out = String::new();
    let _ = writeln!(out, "ACCESSIBILITY CHECK");
    let _ = writeln!(out, "{} check for: {url}", kind.as_str().to_uppercase());
    let _ = writeln!(out, "Found {} items", rules.len());
    out.push('\n');

    for (n, rule) in rules.iter().enumerate() {
        let _ = writeln!(out, "{}: {}", n + 1, rule.help);
        let _ = writeln!(out, "Description: {}", rule.description);
        let _ = writeln!(out, "Help URL: {}", rule.help_url);
        let _ = writeln!(out, "Impact: {}", rule.impact.as_deref().unwrap_or_default());
        let _ = writeln!(out, "Tags: {}", rule.tags.join(", "));

        for node in &rule.nodes {
            let _ = writeln!(out, "\t\tHTML element: {}", node.html);
            let _ = writeln!(out, "\t\tSelector: {}", format_target(&node.target));
        }
        out.push_str("\n\n");
    }

    Some(out.trim().to_string())
}

/// Renders a selector path as `[a, b]`, frame steps as nested lists.
fn format_target(target: &[Value]) -> String {
    let parts: Vec<String> = target
        .iter()
        .map(|step| match step {
            Value::String(s) => s.clone(),
            Value::Array(inner) => format_target(inner),
            other => other.to_string(),
        })
        .collect();
    format!("[{}]", parts.join(", "))
}

// ============================================================================
// File Output
// ============================================================================

/// Writes results as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`crate::Error::Json`] or [`crate::Error::Io`].
pub async fn write_json(path: impl AsRef<Path>, results: &ScanResults) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_vec_pretty(results)?;
    tokio::fs::write(path, json).await?;
    debug!(path = %path.display(), "Wrote JSON results");
    Ok(())
}

/// Writes a text report.
///
/// # Errors
///
/// Returns [`crate::Error::Io`] if the file cannot be written.
pub async fn write_text(path: impl AsRef<Path>, report: &str) -> Result<()> {
    tokio::fs::write(path.as_ref(), report).await?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
