//! Browser-side collaborators of a scan.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`HostDriver`] | Automation backend a scan runs against |
//! | [`FrameHandle`] | Resolved child frame reference |
//! | [`Page`] | [`HostDriver`] over the WebSocket protocol |
//!
//! # Example
//!
//! ```no_run
//! use std::net::{IpAddr, Ipv4Addr};
//! use axe_webdriver::{HostDriver, Page, Result};
//!
//! # async fn example() -> Result<()> {
//! let page = Page::connect(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).await?;
//! page.navigate("https://example.com").await?;
//! let title = page.evaluate("return document.title", vec![]).await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Host driver trait and frame handles.
pub mod driver;

/// WebSocket-backed page.
pub mod page;

// ============================================================================
// Re-exports
// ============================================================================

pub use driver::{FrameHandle, HostDriver};
pub use page::Page;
