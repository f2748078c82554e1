//! Depth-first walk of the frame tree for the two-phase protocol.
//!
//! Every visited frame contributes exactly one slot, in pre-order:
//!
//! | Frame outcome | Slot |
//! |---------------|------|
//! | Scanned | `Some(partial result)` |
//! | Selector did not resolve, or frame could not be entered | `None` |
//! | Any failure below the top frame | `None` for the whole subtree |
//!
//! The finish step relies on this one-slot-per-frame layout to map results
//! back to their frames. Failures at the top frame and a lost frame cursor
//! are never absorbed.

// ============================================================================
// Imports
// ============================================================================

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::cursor::within_frame;
use super::engine::Engine;
use super::injector::Injector;

// ============================================================================
// Types
// ============================================================================

/// Ordered partial results, `None` for frames that produced nothing.
pub type Slots = Vec<Option<Value>>;

// ============================================================================
// Traverser
// ============================================================================

/// Walks the frame tree below the active frame.
pub struct Traverser<'a> {
    engine: &'a Engine<'a>,
    injector: &'a Injector,
    options: &'a Value,
    iframes: bool,
}

impl<'a> Traverser<'a> {
    /// Creates a traverser sending `options` to every frame.
    #[must_use]
    pub fn new(engine: &'a Engine<'a>, injector: &'a Injector, options: &'a Value) -> Self {
        Self {
            engine,
            injector,
            options,
            iframes: true,
        }
    }

    /// Enables or disables descending into child frames.
    #[must_use]
    pub fn with_iframes(mut self, iframes: bool) -> Self {
        self.iframes = iframes;
        self
    }

    /// Scans the active frame as the top of the tree.
    ///
    /// The engine must already be injected into the active frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PartialScan`] if the top frame fails, or
    /// [`Error::ContextRestore`] if the cursor was lost anywhere.
    pub async fn run(&self, context: &Value) -> Result<Slots> {
        let slots = self.traverse(context.clone(), true).await?;
        debug!(slots = slots.len(), "Traversal complete");
        Ok(slots)
    }

    fn traverse(&self, context: Value, is_top: bool) -> BoxFuture<'_, Result<Slots>> {
        async move {
            match self.visit(&context, is_top).await {
                Ok(slots) => Ok(slots),
                Err(e) if is_top => Err(Error::partial_scan(e)),
                Err(e) if e.is_fatal_for_traversal() => Err(e),
                Err(e) => {
                    warn!(error = %e, "Frame scan failed, recording empty slot");
                    Ok(vec![None])
                }
            }
        }
        .boxed()
    }

    async fn visit(&self, context: &Value, is_top: bool) -> Result<Slots> {
        let driver = self.engine.driver();

        if !is_top {
            self.injector.inject(driver).await?;
        }

        let descriptors = if self.iframes {
            self.engine.frame_descriptors(context).await?
        } else {
            Vec::new()
        };

        let own = self.engine.partial_scan(context, self.options).await?;
        let mut slots: Slots = vec![Some(own)];

        for descriptor in descriptors {
            let handle = match self.engine.resolve_frame(&descriptor.frame_selector).await {
                Ok(Some(handle)) => handle,
                Ok(None) => {
                    debug!(selector = %descriptor.frame_selector, "Frame selector matched nothing");
                    slots.push(None);
                    continue;
                }
                Err(e) if e.is_fatal_for_traversal() => return Err(e),
                Err(e) => {
                    warn!(selector = %descriptor.frame_selector, error = %e, "Unable to resolve frame");
                    slots.push(None);
                    continue;
                }
            };

            let child = self.traverse(descriptor.frame_context, false);
            match within_frame(driver, &handle, child).await {
                Ok(mut child_slots) => slots.append(&mut child_slots),
                Err(e) if e.is_frame_resolution() => slots.push(None),
                Err(e) => return Err(e),
            }
        }

        Ok(slots)
    }
}

// ============================================================================
// Tests
// ============================================================================
