//! Cross-frame accessibility scan orchestration.
//!
//! A scan injects the engine into the page, picks a protocol generation and
//! either walks every reachable frame collecting partial results (modern) or
//! runs the engine once at the top frame (legacy).
//!
//! | Module | Role |
//! |--------|------|
//! | [`builder`] | [`ScanBuilder`], the entry point |
//! | [`context`] | Include/exclude selectors |
//! | [`options`] | Engine run options |
//! | [`source`] | Engine source loading and caching |
//! | [`injector`] | Engine injection and sandbox bypass |
//! | [`negotiator`] | Protocol selection |
//! | [`traversal`] | Frame tree walk for the modern protocol |
//! | [`aggregator`] | Finish step in an isolated context |
//! | [`legacy`] | Single-pass runner |
//! | [`results`] | Result model |
//! | [`report`] | Text and JSON reports |
//!
//! # Phases
//!
//! ```text
//! Idle -> Negotiating -> Traversing -> Aggregating -> Done
//! Idle -> Negotiating -> LegacyRunning -> Done
//! ```
//!
//! Any phase may end in `Failed`. Failures inside child frames are absorbed
//! during `Traversing` and never fail the scan on their own.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// Modules
// ============================================================================

pub mod aggregator;
pub mod builder;
pub mod context;
pub mod cursor;
pub mod engine;
pub mod injector;
pub mod legacy;
pub mod negotiator;
pub mod options;
pub mod report;
pub mod results;
pub mod scripts;
pub mod source;
pub mod traversal;

#[cfg(test)]
pub(crate) mod fake;

// ============================================================================
// Re-exports
// ============================================================================

pub use aggregator::aggregate;
pub use builder::ScanBuilder;
pub use context::{ContextSelector, ScanContext, SelectorStep};
pub use cursor::within_frame;
pub use engine::{Engine, FrameDescriptor};
pub use injector::Injector;
pub use legacy::run_legacy;
pub use negotiator::{LegacyReason, Protocol, negotiate};
pub use options::{RuleToggle, RunOnly, RunOnlyKind, ScanOptions};
pub use report::{ResultType, readable_report, write_json, write_text};
pub use results::{
    Check, CheckedNode, RelatedNode, Rule, ScanResults, TestEngine, TestEnvironment, TestRunner,
};
pub use source::{EngineSource, SourceCache};
pub use traversal::{Slots, Traverser};

// ============================================================================
// ScanPhase
// ============================================================================

/// Where a scan is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanPhase {
    /// Configured, nothing sent yet.
    Idle,
    /// Injecting at the top frame and probing the engine.
    Negotiating,
    /// Collecting partial results frame by frame.
    Traversing,
    /// Merging partial results in a blank context.
    Aggregating,
    /// Running the single-pass legacy scan.
    LegacyRunning,
    /// Results returned.
    Done,
    /// Aborted with an error.
    Failed,
}

impl ScanPhase {
    /// Returns `true` for `Done` and `Failed`.
    #[inline]
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns the phase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Negotiating => "negotiating",
            Self::Traversing => "traversing",
            Self::Aggregating => "aggregating",
            Self::LegacyRunning => "legacy-running",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================
