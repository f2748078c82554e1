//! Scoped descent into child frames.
//!
//! The driver's active frame is shared by the whole scan. [`within_frame`]
//! is the only place that enters a child frame: it runs the body and then
//! switches back to the parent on every exit path, so siblings always start
//! from the frame they were discovered in.

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;

use tracing::{debug, error};

use crate::browser::{FrameHandle, HostDriver};
use crate::error::{Error, Result};

// ============================================================================
// within_frame
// ============================================================================

/// Enters `frame`, awaits `body`, and returns to the parent frame.
///
/// `body` is not polled until the switch succeeded.
///
/// # Errors
///
/// - [`Error::FrameResolution`] if the frame cannot be entered (the cursor
///   did not move; the body never ran)
/// - [`Error::ContextRestore`] if the switch back fails, whatever `body`
///   returned
/// - otherwise whatever `body` returned
pub async fn within_frame<T, F>(driver: &dyn HostDriver, frame: &FrameHandle, body: F) -> Result<T>
where
    F: Future<Output = Result<T>> + Send,
{
    if let Err(e) = driver.switch_to_frame(frame).await {
        if e.is_fatal_for_traversal() {
            return Err(e);
        }
        debug!(%frame, error = %e, "Unable to enter frame");
        return Err(Error::frame_resolution(frame.to_string()));
    }

    let outcome = body.await;

    match driver.switch_to_parent_frame().await {
        Ok(()) => outcome,
        Err(e) => {
            error!(%frame, error = %e, "Lost frame cursor");
            Err(Error::context_restore(e))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
