//! Picks the protocol generation for a scan.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tracing::{debug, warn};

use super::engine::Engine;
use super::scripts::{SAME_ORIGIN, UNSAFE_ALL_ORIGINS};

// ============================================================================
// Protocol
// ============================================================================

/// How a scan talks to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Per-frame partial scans merged by a separate finish step.
    Modern,
    /// One run at the top frame.
    Legacy(LegacyReason),
}

/// Why the legacy protocol was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyReason {
    /// The caller asked for it.
    Forced,
    /// The engine has no two-phase entry point, or probing it failed.
    EngineUnsupported,
}

impl Protocol {
    /// Returns the origin allow-list the engine must be configured with.
    ///
    /// Only an engine without the two-phase protocol gets the unsafe
    /// allow-all value; it needs cross-origin messaging to reach frames.
    #[must_use]
    pub const fn allowed_origins(&self) -> Option<&'static str> {
        match self {
            Self::Modern => None,
            Self::Legacy(LegacyReason::Forced) => Some(SAME_ORIGIN),
            Self::Legacy(LegacyReason::EngineUnsupported) => Some(UNSAFE_ALL_ORIGINS),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Modern => f.write_str("modern"),
            Self::Legacy(LegacyReason::Forced) => f.write_str("legacy (forced)"),
            Self::Legacy(LegacyReason::EngineUnsupported) => f.write_str("legacy (unsupported)"),
        }
    }
}

// ============================================================================
// negotiate
// ============================================================================

/// Decides the protocol for an engine injected into the active frame.
///
/// Never fails: a probe error counts as an engine without the two-phase
/// protocol.
pub async fn negotiate(engine: &Engine<'_>, force_legacy: bool) -> Protocol {
    if force_legacy {
        debug!("Legacy protocol forced");
        return Protocol::Legacy(LegacyReason::Forced);
    }

    match engine.probe().await {
        Ok(true) => Protocol::Modern,
        Ok(false) => Protocol::Legacy(LegacyReason::EngineUnsupported),
        Err(e) => {
            warn!(error = %e, "Engine probe failed, falling back to legacy protocol");
            Protocol::Legacy(LegacyReason::EngineUnsupported)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
