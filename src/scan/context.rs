//! Which part of the document a scan covers.
//!
//! A [`ScanContext`] is a pair of selector lists. Each [`ContextSelector`]
//! is either a plain CSS selector or a path that descends through frames
//! and shadow roots before naming its target.
//!
//! ```
//! use axe_webdriver::scan::{ContextSelector, ScanContext};
//!
//! let mut context = ScanContext::default();
//! context.include.push("main".into());
//! context.exclude.push(ContextSelector::frames(["#ads", ".banner"]));
//!
//! let json = serde_json::to_value(&context).unwrap();
//! assert_eq!(json["exclude"][0]["fromFrames"][1], ".banner");
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// ScanContext
// ============================================================================

/// Elements to include in and exclude from a scan.
///
/// An empty `include` means the whole document. `exclude` is always
/// serialized, so the empty context becomes `{"exclude": []}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanContext {
    /// Selectors to test.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<ContextSelector>,

    /// Selectors to leave out.
    #[serde(default)]
    pub exclude: Vec<ContextSelector>,
}

impl ScanContext {
    /// Returns `true` if neither list has entries.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Rejects selectors with empty steps.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] naming the offending list.
    pub fn validate(&self) -> Result<()> {
        for (list, selectors) in [("include", &self.include), ("exclude", &self.exclude)] {
            if selectors.iter().any(|s| !s.is_valid()) {
                return Err(Error::invalid_argument(format!(
                    "{list} contains an empty selector"
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// ContextSelector
// ============================================================================

/// One entry of a [`ScanContext`] list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextSelector {
    /// CSS selector in the top document.
    Css(String),

    /// Frame path in array form: every step but the last names a frame.
    Path(Vec<String>),

    /// Frame path: every step but the last names a frame.
    Frames {
        /// Steps, each a CSS selector or a shadow path.
        #[serde(rename = "fromFrames")]
        from_frames: Vec<SelectorStep>,
    },

    /// Shadow path: every step but the last names a shadow host.
    Shadow {
        /// CSS selectors from the outermost host inwards.
        #[serde(rename = "fromShadowDom")]
        from_shadow_dom: Vec<String>,
    },
}

impl ContextSelector {
    /// Creates a CSS selector entry.
    #[inline]
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Creates a frame path in array form.
    #[must_use]
    pub fn path<I, S>(steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Path(steps.into_iter().map(Into::into).collect())
    }

    /// Creates a `fromFrames` path of plain CSS steps.
    #[must_use]
    pub fn frames<I, S>(steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Frames {
            from_frames: steps.into_iter().map(|s| SelectorStep::Css(s.into())).collect(),
        }
    }

    /// Creates a `fromShadowDom` path.
    #[must_use]
    pub fn shadow<I, S>(steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Shadow {
            from_shadow_dom: steps.into_iter().map(Into::into).collect(),
        }
    }

    fn is_valid(&self) -> bool {
        match self {
            Self::Css(s) => !s.trim().is_empty(),
            Self::Path(steps) | Self::Shadow { from_shadow_dom: steps } => {
                !steps.is_empty() && steps.iter().all(|s| !s.trim().is_empty())
            }
            Self::Frames { from_frames } => {
                !from_frames.is_empty() && from_frames.iter().all(SelectorStep::is_valid)
            }
        }
    }
}

impl From<&str> for ContextSelector {
    fn from(selector: &str) -> Self {
        Self::css(selector)
    }
}

impl From<String> for ContextSelector {
    fn from(selector: String) -> Self {
        Self::Css(selector)
    }
}

// ============================================================================
// SelectorStep
// ============================================================================

/// One step of a `fromFrames` path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectorStep {
    /// CSS selector.
    Css(String),
    /// Shadow path ending at a frame or target.
    Shadow {
        /// CSS selectors from the outermost host inwards.
        #[serde(rename = "fromShadowDom")]
        from_shadow_dom: Vec<String>,
    },
}

impl SelectorStep {
    fn is_valid(&self) -> bool {
        match self {
            Self::Css(s) => !s.trim().is_empty(),
            Self::Shadow { from_shadow_dom } => {
                !from_shadow_dom.is_empty() && from_shadow_dom.iter().all(|s| !s.trim().is_empty())
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
