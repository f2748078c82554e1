//! Calls into the injected engine.
//!
//! [`Engine`] turns each engine entry point into one remote script call on
//! the active frame of a [`HostDriver`]. It holds no state of its own beyond
//! the aggregation chunk size.

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::browser::{FrameHandle, HostDriver};
use crate::error::{Error, Result};

use super::scripts;

// ============================================================================
// Constants
// ============================================================================

/// Largest piece of serialized partial results sent in one call.
pub const DEFAULT_CHUNK_SIZE: usize = 20_000_000;

// ============================================================================
// FrameDescriptor
// ============================================================================

/// A child frame the engine wants scanned.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameDescriptor {
    /// Reduced scan context for the child, forwarded unchanged.
    pub frame_context: Value,
    /// Selector path resolving to the frame element.
    pub frame_selector: Value,
}

// ============================================================================
// Engine
// ============================================================================

/// Engine entry points on top of a host driver.
#[derive(Clone, Copy)]
pub struct Engine<'a> {
    driver: &'a dyn HostDriver,
    chunk_size: usize,
}

impl<'a> Engine<'a> {
    /// Creates an engine handle on `driver`.
    #[inline]
    #[must_use]
    pub fn new(driver: &'a dyn HostDriver) -> Self {
        Self {
            driver,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Sets the aggregation chunk size in bytes.
    #[inline]
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Returns the underlying driver.
    #[inline]
    #[must_use]
    pub fn driver(&self) -> &'a dyn HostDriver {
        self.driver
    }

    /// Returns `true` if the two-phase protocol is available.
    pub async fn probe(&self) -> Result<bool> {
        let value = self
            .driver
            .evaluate(scripts::HAS_RUN_PARTIAL, Vec::new())
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Sets the engine's origin allow-list.
    pub async fn configure_allowed_origins(&self, origin: &str) -> Result<()> {
        debug!(origin, "Configuring allowed origins");
        self.driver
            .evaluate(
                scripts::CONFIGURE_ALLOWED_ORIGINS,
                vec![Value::from(origin)],
            )
            .await?;
        Ok(())
    }

    /// Lists the direct child frames of `context`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the engine's answer is not a list of
    /// descriptors.
    pub async fn frame_descriptors(&self, context: &Value) -> Result<Vec<FrameDescriptor>> {
        let value = self
            .driver
            .evaluate(scripts::FRAME_CONTEXTS, vec![context.clone()])
            .await?;
        if value.is_null() {
            return Ok(Vec::new());
        }
        serde_json::from_value(value)
            .map_err(|e| Error::protocol(format!("Malformed frame contexts: {e}")))
    }

    /// Runs the partial scan in the active frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ScriptError`] if the engine rejected the run.
    pub async fn partial_scan(&self, context: &Value, options: &Value) -> Result<Value> {
        let value = self
            .driver
            .evaluate_async(scripts::RUN_PARTIAL, vec![context.clone(), options.clone()])
            .await?;
        settle(value)
    }

    /// Resolves a frame selector to a handle in the active frame.
    pub async fn resolve_frame(&self, selector: &Value) -> Result<Option<FrameHandle>> {
        self.driver
            .evaluate_handle(scripts::SHADOW_SELECT, vec![selector.clone()])
            .await
    }

    /// Merges partial results in the active frame.
    ///
    /// The slots are serialized once and streamed in chunks, then the engine
    /// parses them back and finishes the run. Must run in a context where
    /// the engine is injected.
    pub async fn finish(&self, partials: &[Option<Value>], options: &Value) -> Result<Value> {
        let payload = serde_json::to_string(partials)?;
        let chunks = split_chunks(&payload, self.chunk_size);
        debug!(
            slots = partials.len(),
            bytes = payload.len(),
            chunks = chunks.len(),
            "Storing partial results"
        );

        for chunk in chunks {
            self.driver
                .evaluate(scripts::STORE_CHUNK, vec![Value::from(chunk)])
                .await?;
        }

        let value = self
            .driver
            .evaluate_async(scripts::FINISH_RUN, vec![options.clone()])
            .await?;
        settle(value)
    }

    /// Runs the single-pass legacy scan in the active frame.
    pub async fn full_scan(&self, context: &Value, options: &Value) -> Result<Value> {
        self.driver
            .evaluate_async(scripts::RUN, vec![context.clone(), options.clone()])
            .await
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Turns an engine rejection marker into [`Error::ScriptError`].
fn settle(value: Value) -> Result<Value> {
    if let Some(message) = value.get(scripts::REJECTION_KEY).and_then(Value::as_str) {
        return Err(Error::script_error(message));
    }
    Ok(value)
}

/// Splits `s` into pieces of at most `max` bytes on char boundaries.
///
/// A char wider than `max` still gets a piece of its own.
fn split_chunks(s: &str, max: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = s;

    while !rest.is_empty() {
        let mut end = max.min(rest.len());
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            end = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }
        let (chunk, tail) = rest.split_at(end);
        chunks.push(chunk);
        rest = tail;
    }

    chunks
}

// ============================================================================
// Tests
// ============================================================================
