//! Merges partial results in an isolated context.
//!
//! The finish step runs in a fresh `about:blank` context so nothing the scan
//! did to the page under test can affect it. That context is closed, and
//! focus returned to the page, on every exit path.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;
use tracing::{debug, warn};

use crate::browser::HostDriver;
use crate::error::{Error, Result};
use crate::identifiers::ContextId;

use super::engine::Engine;
use super::injector::Injector;

// ============================================================================
// aggregate
// ============================================================================

/// Runs the engine's finish step over `partials` in a blank context.
///
/// # Errors
///
/// Any failure, including cleanup, is returned as [`Error::Aggregation`].
pub async fn aggregate(
    engine: &Engine<'_>,
    injector: &Injector,
    partials: &[Option<Value>],
    options: &Value,
) -> Result<Value> {
    let driver = engine.driver();

    let original = driver.current_context().await.map_err(Error::aggregation)?;
    let blank = driver
        .open_blank_context()
        .await
        .map_err(Error::aggregation)?;
    debug!(%original, %blank, slots = partials.len(), "Aggregating in blank context");

    let outcome = async {
        injector.inject(driver).await?;
        engine.finish(partials, options).await
    }
    .await;

    let cleanup = close_and_restore(driver, &blank, &original).await;

    match (outcome, cleanup) {
        (Ok(value), Ok(())) => Ok(value),
        (Err(e), _) | (Ok(_), Err(e)) => Err(Error::aggregation(e)),
    }
}

/// Closes `blank` and focuses `original`, attempting both.
async fn close_and_restore(
    driver: &dyn HostDriver,
    blank: &ContextId,
    original: &ContextId,
) -> Result<()> {
    let closed = driver.close_context(blank).await;
    if let Err(e) = &closed {
        warn!(%blank, error = %e, "Unable to close aggregation context");
    }
    driver.switch_to_context(original).await?;
    closed
}

// ============================================================================
// Tests
// ============================================================================
