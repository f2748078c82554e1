//! WebSocket protocol message types.
//!
//! This module defines the message format for communication between
//! the local end (Rust) and the remote automation end.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Request` | Local → Remote | Command request |
//! | `Response` | Remote → Local | Command response |
//!
//! # Command Naming
//!
//! Commands follow `module.methodName` format:
//!
//! - `script.evaluateAsync`
//! - `browsingContext.switchToFrame`
//! - `browsingContext.newTab`
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Command definitions by domain |
//! | `request` | Request and Response types |

// ============================================================================
// Submodules
// ============================================================================

/// Command definitions organized by module.
pub mod command;

/// Request and Response message types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{BrowsingContextCommand, Command, ScriptCommand};
pub use request::{Request, Response, ResponseType};
