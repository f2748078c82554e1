//! Axe WebDriver - Cross-frame accessibility scanning.
//!
//! This library drives an injected accessibility engine (axe-core) through a
//! browser automation backend and assembles one report for a page and all
//! of its frames.
//!
//! # Architecture
//!
//! The scan runs on the local end and talks to the browser only through the
//! [`HostDriver`] trait:
//!
//! - **Local End (Rust)**: Injects the engine, walks frames, merges results
//! - **Remote End (Browser)**: Evaluates scripts in the active frame
//!
//! Key design principles:
//!
//! - One frame cursor per driver, moved only by a scoped helper that always
//!   returns to the parent frame
//! - Every visited frame contributes exactly one result slot
//! - Failures in child frames are absorbed; failures at the top are not
//! - Partial results are merged in a fresh `about:blank` context
//!
//! # Quick Start
//!
//! ```no_run
//! use std::net::{IpAddr, Ipv4Addr};
//!
//! use axe_webdriver::{EngineSource, Page, ResultType, Result, ScanBuilder, readable_report};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Wait for the remote end to connect
//!     let page = Page::connect(IpAddr::V4(Ipv4Addr::LOCALHOST), 9515).await?;
//!     page.navigate("https://example.com").await?;
//!
//!     let results = ScanBuilder::new()
//!         .source(EngineSource::url("https://cdn.jsdelivr.net/npm/axe-core/axe.min.js")?)
//!         .with_tags(["wcag2a", "wcag2aa"])
//!         .analyze(&page)
//!         .await?;
//!
//!     if let Some(report) =
//!         readable_report(ResultType::Violations, &results.url, &results.violations)
//!     {
//!         println!("{report}");
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`browser`] | [`HostDriver`] boundary and the [`Page`] driver |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | WebSocket message types (internal) |
//! | [`scan`] | Scan orchestration: [`ScanBuilder`], results, reports |
//! | [`transport`] | WebSocket transport layer (internal) |

// ============================================================================
// Modules
// ============================================================================

/// Browser automation boundary.
///
/// - [`HostDriver`] - What a scan needs from a backend
/// - [`Page`] - Backend over the WebSocket transport
pub mod browser;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for browser entities.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// WebSocket protocol message types.
///
/// Internal module defining command/response structures.
pub mod protocol;

/// Accessibility scan orchestration.
///
/// Use [`ScanBuilder::new()`] to configure and run a scan.
pub mod scan;

/// WebSocket transport layer.
///
/// Internal module handling WebSocket server and connection management.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Browser types
pub use browser::{FrameHandle, HostDriver, Page};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ContextId, ElementId, FrameId, RequestId, SessionId, TabId};

// Scan types
pub use scan::{
    ContextSelector, EngineSource, ResultType, Rule, ScanBuilder, ScanContext, ScanOptions,
    ScanPhase, ScanResults, SourceCache, readable_report,
};
