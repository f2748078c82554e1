//! WebSocket transport layer.
//!
//! This module handles communication between the local end (Rust) and the
//! remote automation end via WebSocket.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Page (Rust)    │                              │  Remote end     │
//! │                 │         WebSocket            │  (in browser)   │
//! │  PendingServer  │◄────────────────────────────►│                 │
//! │  → Connection   │      localhost:PORT          │  WebSocket      │
//! │                 │                              │  Client         │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | WebSocket connection and message loop |
//! | `server` | WebSocket server binding and acceptance |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and message loop.
pub mod connection;

/// WebSocket server for the remote end.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, ReadyData};
pub use server::PendingServer;
