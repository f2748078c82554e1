//! Single-pass scan for engines without the two-phase protocol.
//!
//! One engine run at the top frame. Frames are reached only through the
//! engine's own cross-frame messaging, so cross-origin frames go untested
//! when the allow-list stays at same-origin.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::engine::Engine;
use super::injector::Injector;
use super::negotiator::{LegacyReason, Protocol};
use super::results::ScanResults;

// ============================================================================
// run_legacy
// ============================================================================

/// Runs the legacy protocol from the top frame.
///
/// For engines without the two-phase protocol the engine is first injected
/// into every frame the driver can enumerate, and each frame's allow-list
/// is widened along with the top's (unless `iframes` is off). A
/// script error from the run itself comes back as an errored
/// [`ScanResults`] rather than an `Err`.
///
/// # Errors
///
/// - [`Error::Injection`] if frame injection hits a script error
/// - [`Error::OriginAllowList`] if the allow-list cannot be set in the top
///   frame, or the engine throws while setting it in a frame
/// - transport errors from the run
pub async fn run_legacy(
    engine: &Engine<'_>,
    injector: &Injector,
    reason: LegacyReason,
    context: &Value,
    options: &Value,
    iframes: bool,
) -> Result<ScanResults> {
    let driver = engine.driver();

    if reason == LegacyReason::EngineUnsupported && iframes {
        injector.inject_all_frames(driver).await?;
    }

    if let Some(origin) = Protocol::Legacy(reason).allowed_origins() {
        engine
            .configure_allowed_origins(origin)
            .await
            .map_err(Error::origin_allow_list)?;
        if reason == LegacyReason::EngineUnsupported && iframes {
            injector.configure_origins_all_frames(driver, origin).await?;
        }
    }

    match engine.full_scan(context, options).await {
        Ok(value) => {
            let results = ScanResults::from_engine(value)?;
            if let Some(message) = &results.error_message {
                warn!(error = %message, "Engine reported an error");
            }
            debug!(violations = results.violations.len(), "Legacy run complete");
            Ok(results)
        }
        Err(e) if e.is_script_error() => {
            warn!(error = %e, "Engine run threw");
            Ok(ScanResults::from_error(e.to_string()))
        }
        Err(e) => Err(e),
    }
}

// ============================================================================
// Tests
// ============================================================================
