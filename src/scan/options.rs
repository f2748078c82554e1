//! Engine run options.
//!
//! [`ScanOptions`] mirrors the engine's own options object. Unset fields are
//! omitted when serialized so the engine applies its defaults, and the same
//! value is sent unchanged to every frame of a traversal.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// ScanOptions
// ============================================================================

/// Rule selection and reporting options for one scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanOptions {
    /// Restricts the run to rules with the given tags or ids.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_only: Option<RunOnly>,

    /// Per-rule enable/disable switches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<BTreeMap<String, RuleToggle>>,

    /// Result groups that get full node details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_types: Option<Vec<String>>,

    /// Report absolute instead of relative selectors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absolute_paths: Option<bool>,

    /// Let the engine descend into frames itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iframes: Option<bool>,

    /// Restore scroll position after the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restore_scroll: Option<bool>,

    /// Milliseconds to wait for a frame to answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_wait_time: Option<u64>,

    /// Include XPath for each node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xpath: Option<bool>,

    /// Include CSS selectors for each node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selectors: Option<bool>,

    /// Include ancestry selectors for each node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ancestry: Option<bool>,

    /// Return element references.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_ref: Option<bool>,

    /// Log engine performance timings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_timer: Option<bool>,
}

impl ScanOptions {
    /// Checks that every rule id, tag and result type is non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] describing the first bad entry.
    pub fn validate(&self) -> Result<()> {
        if let Some(run_only) = &self.run_only {
            if run_only.values.is_empty() {
                return Err(Error::invalid_argument("runOnly must name at least one value"));
            }
            if run_only.values.iter().any(|v| v.trim().is_empty()) {
                return Err(Error::invalid_argument(format!(
                    "runOnly {} may not be empty",
                    run_only.kind.as_str()
                )));
            }
        }

        if let Some(rules) = &self.rules
            && rules.keys().any(|id| id.trim().is_empty())
        {
            return Err(Error::invalid_argument("rule ids may not be empty"));
        }

        if let Some(types) = &self.result_types
            && types.iter().any(|t| t.trim().is_empty())
        {
            return Err(Error::invalid_argument("result types may not be empty"));
        }

        Ok(())
    }

    /// Sets the enabled flag of each rule, keeping other entries.
    pub(crate) fn toggle_rules<I, S>(&mut self, ids: I, enabled: bool)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rules = self.rules.get_or_insert_with(BTreeMap::new);
        for id in ids {
            rules.insert(id.into(), RuleToggle { enabled });
        }
    }
}

// ============================================================================
// RunOnly
// ============================================================================

/// Restriction of a run to a set of tags or rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOnly {
    /// What `values` names.
    #[serde(rename = "type")]
    pub kind: RunOnlyKind,
    /// Tags or rule ids.
    pub values: Vec<String>,
}

/// Discriminator of [`RunOnly`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOnlyKind {
    /// Values are tags such as `wcag2a`.
    Tag,
    /// Values are rule ids.
    Rule,
}

impl RunOnlyKind {
    /// Returns the wire name.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Tag => "tag",
            Self::Rule => "rule",
        }
    }
}

// ============================================================================
// RuleToggle
// ============================================================================

/// Enabled flag of one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleToggle {
    /// Whether the rule runs.
    pub enabled: bool,
}

// ============================================================================
// Tests
// ============================================================================
