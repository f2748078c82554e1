//! WebSocket server the remote automation end connects to.
//!
//! # Connection Flow
//!
//! 1. Rust binds the WebSocket server (port `0` picks a free one)
//! 2. The remote end is pointed at [`PendingServer::ws_url`]
//! 3. The remote end connects and sends READY with its tab/session ids
//! 4. Connection established, ready for commands

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::Connection;
use super::connection::ReadyData;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for waiting for the remote end to connect.
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// PendingServer
// ============================================================================

/// A WebSocket server that is bound but not yet connected.
///
/// # Example
///
/// ```ignore
/// use std::net::{IpAddr, Ipv4Addr};
/// use axe_webdriver::transport::PendingServer;
///
/// let server = PendingServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).await?;
/// println!("point the remote end at {}", server.ws_url());
///
/// let (connection, ready_data) = server.accept().await?;
/// ```
pub struct PendingServer {
    /// TCP listener for incoming connections.
    listener: TcpListener,
    /// Address the server is bound to.
    addr: SocketAddr,
}

impl PendingServer {
    /// Binds a WebSocket server to the specified address and port.
    ///
    /// Use port 0 to let the OS assign a random available port.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn bind(ip: IpAddr, port: u16) -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::new(ip, port)).await?;
        let addr = listener.local_addr()?;

        debug!(%addr, "WebSocket server bound");

        Ok(Self { listener, addr })
    }

    /// Returns the port the server is bound to.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Returns the WebSocket URL for this server.
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Returns the local socket address.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Accepts the remote end's connection and completes the handshake.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if nothing connects within 30s
    /// - [`Error::Connection`] if WebSocket upgrade fails
    /// - [`Error::ConnectionTimeout`] if READY does not arrive in time
    pub async fn accept(self) -> Result<(Connection, ReadyData)> {
        let (stream, peer) = timeout(CONNECTION_TIMEOUT, self.listener.accept())
            .await
            .map_err(|_| Error::connection_timeout(CONNECTION_TIMEOUT.as_millis() as u64))??;

        debug!(%peer, "TCP connection accepted");

        let ws_stream = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(|e| Error::connection(format!("WebSocket upgrade failed: {e}")))?;

        info!(port = self.addr.port(), "WebSocket connection established");

        let connection = Connection::new(ws_stream);
        let ready_data = connection.wait_ready().await?;

        Ok((connection, ready_data))
    }
}

// ============================================================================
// Tests
// ============================================================================
