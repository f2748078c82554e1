//! Remote page driven over the WebSocket protocol.
//!
//! [`Page`] implements [`HostDriver`] on top of [`Connection`]. It keeps the
//! focused tab and an explicit stack of entered frames; every request is
//! addressed to the frame on top of that stack.
//!
//! # Example
//!
//! ```ignore
//! use std::net::{IpAddr, Ipv4Addr};
//! use axe_webdriver::Page;
//!
//! let page = Page::connect(IpAddr::V4(Ipv4Addr::LOCALHOST), 9222).await?;
//! page.navigate("https://example.com").await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::identifiers::{ContextId, ElementId, FrameId, SessionId, TabId};
use crate::protocol::{BrowsingContextCommand, Command, Request, Response, ScriptCommand};
use crate::transport::{Connection, PendingServer, ReadyData};

use super::driver::{FrameHandle, HostDriver};

// ============================================================================
// Constants
// ============================================================================

/// Default bound for async scripts.
const DEFAULT_SCRIPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Extra time the local end waits beyond the remote script timeout, so the
/// remote end reports the timeout itself when it can.
const RESPONSE_GRACE: Duration = Duration::from_secs(5);

/// Page a fresh context is pointed at.
const BLANK_URL: &str = "about:blank";

// ============================================================================
// Types
// ============================================================================

/// Mutable cursor state.
#[derive(Debug)]
struct Cursor {
    /// Focused tab.
    tab_id: TabId,
    /// Entered frames; the first entry is always the main frame.
    frames: Vec<FrameId>,
    /// Bound for async scripts.
    script_timeout: Duration,
}

impl Cursor {
    fn new(tab_id: TabId) -> Self {
        Self {
            tab_id,
            frames: vec![FrameId::main()],
            script_timeout: DEFAULT_SCRIPT_TIMEOUT,
        }
    }

    fn frame_id(&self) -> FrameId {
        self.frames.last().copied().unwrap_or_else(FrameId::main)
    }

    fn focus(&mut self, tab_id: TabId) {
        self.tab_id = tab_id;
        self.frames.truncate(1);
    }
}

/// Shared state of a page.
struct PageInner {
    connection: Connection,
    session_id: SessionId,
    cursor: Mutex<Cursor>,
}

// ============================================================================
// Page
// ============================================================================

/// A remote page reachable through a WebSocket connection.
///
/// Clones share the connection and the frame cursor.
#[derive(Clone)]
pub struct Page {
    inner: Arc<PageInner>,
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cursor = self.inner.cursor.lock();
        f.debug_struct("Page")
            .field("session_id", &self.inner.session_id)
            .field("tab_id", &cursor.tab_id)
            .field("frame_id", &cursor.frame_id())
            .finish_non_exhaustive()
    }
}

impl Page {
    /// Binds a server, waits for the remote end and completes the handshake.
    ///
    /// # Errors
    ///
    /// Propagates bind, accept and READY failures from [`PendingServer`].
    pub async fn connect(ip: IpAddr, port: u16) -> Result<Self> {
        let server = PendingServer::bind(ip, port).await?;
        info!(url = %server.ws_url(), "Waiting for remote end");

        let (connection, ready) = server.accept().await?;
        Self::from_connection(connection, ready)
    }

    /// Wraps an established connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the READY data carries zero ids.
    pub fn from_connection(connection: Connection, ready: ReadyData) -> Result<Self> {
        let tab_id = TabId::new(ready.tab_id)
            .ok_or_else(|| Error::protocol("READY carried tab id 0"))?;
        let session_id = SessionId::new(ready.session_id)
            .ok_or_else(|| Error::protocol("READY carried session id 0"))?;

        debug!(%tab_id, %session_id, "Page attached");

        Ok(Self {
            inner: Arc::new(PageInner {
                connection,
                session_id,
                cursor: Mutex::new(Cursor::new(tab_id)),
            }),
        })
    }
}

// ============================================================================
// Page - Accessors
// ============================================================================

impl Page {
    /// Returns the focused tab.
    #[inline]
    #[must_use]
    pub fn tab_id(&self) -> TabId {
        self.inner.cursor.lock().tab_id
    }

    /// Returns the active frame.
    #[inline]
    #[must_use]
    pub fn frame_id(&self) -> FrameId {
        self.inner.cursor.lock().frame_id()
    }

    /// Returns how many frames deep the cursor is (0 = main frame).
    #[inline]
    #[must_use]
    pub fn frame_depth(&self) -> usize {
        self.inner.cursor.lock().frames.len().saturating_sub(1)
    }

    /// Returns the session ID.
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.inner.session_id
    }

    /// Closes the underlying connection.
    pub fn shutdown(&self) {
        self.inner.connection.shutdown();
    }
}

// ============================================================================
// Page - Navigation
// ============================================================================

impl Page {
    /// Navigates the focused tab and resets the cursor to its main frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote end rejects the navigation.
    pub async fn navigate(&self, url: &str) -> Result<()> {
        debug!(tab_id = %self.tab_id(), url, "Navigating");

        self.inner.cursor.lock().frames.truncate(1);
        let command = Command::BrowsingContext(BrowsingContextCommand::Navigate {
            url: url.to_string(),
        });
        self.send_command(command).await?.into_result()?;
        Ok(())
    }

    /// Returns the URL of the focused tab.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote end does not report a URL.
    pub async fn url(&self) -> Result<String> {
        let command = Command::BrowsingContext(BrowsingContextCommand::GetUrl);
        let result = self.send_command(command).await?.into_result()?;
        result
            .get("url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::protocol("No url in response"))
    }
}

// ============================================================================
// Page - Internal
// ============================================================================

impl Page {
    /// Sends a command to the active frame.
    async fn send_command(&self, command: Command) -> Result<Response> {
        let (tab_id, frame_id) = {
            let cursor = self.inner.cursor.lock();
            (cursor.tab_id, cursor.frame_id())
        };
        self.inner
            .connection
            .send(Request::new(tab_id, frame_id, command))
            .await
    }

    /// Sends a command to the main frame of a specific tab.
    async fn send_to_tab(&self, tab_id: TabId, command: Command) -> Result<Response> {
        self.inner
            .connection
            .send(Request::new(tab_id, FrameId::main(), command))
            .await
    }

    /// Sends a frame switch and pushes the entered frame on the cursor.
    async fn enter_frame(&self, command: BrowsingContextCommand) -> Result<()> {
        let response = self.send_command(Command::BrowsingContext(command)).await?;
        let result = response.into_result()?;
        let frame_id = result
            .get("frameId")
            .and_then(Value::as_u64)
            .ok_or_else(|| Error::protocol("No frameId in response"))?;

        self.inner.cursor.lock().frames.push(FrameId::new(frame_id));
        Ok(())
    }
}

// ============================================================================
// HostDriver Implementation
// ============================================================================

#[async_trait]
impl HostDriver for Page {
    async fn evaluate(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        debug!(frame_id = %self.frame_id(), script_len = script.len(), "Evaluating script");

        let command = Command::Script(ScriptCommand::Evaluate {
            script: script.to_string(),
            args,
        });
        self.send_command(command).await?.into_value()
    }

    async fn evaluate_async(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        let (tab_id, frame_id, script_timeout) = {
            let cursor = self.inner.cursor.lock();
            (cursor.tab_id, cursor.frame_id(), cursor.script_timeout)
        };
        debug!(%frame_id, script_len = script.len(), "Evaluating async script");

        let command = Command::Script(ScriptCommand::EvaluateAsync {
            script: script.to_string(),
            args,
            timeout_ms: script_timeout.as_millis() as u64,
        });
        let request = Request::new(tab_id, frame_id, command);

        let response = self
            .inner
            .connection
            .send_with_timeout(request, script_timeout + RESPONSE_GRACE)
            .await?;

        // remote script timeouts carry no duration of their own
        response.into_value().map_err(|e| match e {
            Error::Timeout { operation, .. } => {
                Error::timeout(operation, script_timeout.as_millis() as u64)
            }
            other => other,
        })
    }

    async fn evaluate_handle(
        &self,
        script: &str,
        args: Vec<Value>,
    ) -> Result<Option<FrameHandle>> {
        let command = Command::Script(ScriptCommand::EvaluateHandle {
            script: script.to_string(),
            args,
        });
        let result = self.send_command(command).await?.into_result()?;

        if let Some(id) = result.get("elementId").and_then(Value::as_str) {
            return Ok(Some(FrameHandle::Element(ElementId::new(id))));
        }
        Ok(result.get("value").and_then(FrameHandle::from_value))
    }

    async fn child_frames(&self) -> Result<Vec<FrameHandle>> {
        let command = Command::BrowsingContext(BrowsingContextCommand::GetChildFrames);
        let result = self.send_command(command).await?.into_result()?;

        let frames: Vec<FrameHandle> = result
            .get("frames")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(Value::as_str)
                    .map(|id| FrameHandle::Element(ElementId::new(id)))
                    .collect()
            })
            .unwrap_or_default();

        debug!(frame_id = %self.frame_id(), count = frames.len(), "Got child frames");
        Ok(frames)
    }

    async fn switch_to_frame(&self, frame: &FrameHandle) -> Result<()> {
        debug!(tab_id = %self.tab_id(), %frame, "Switching to frame");

        let command = match frame {
            FrameHandle::Element(element_id) => BrowsingContextCommand::SwitchToFrame {
                element_id: element_id.clone(),
            },
            FrameHandle::Index(index) => {
                BrowsingContextCommand::SwitchToFrameByIndex { index: *index }
            }
            FrameHandle::Name(name) => {
                BrowsingContextCommand::SwitchToFrameByName { name: name.clone() }
            }
        };
        self.enter_frame(command).await
    }

    async fn switch_to_parent_frame(&self) -> Result<()> {
        debug!(tab_id = %self.tab_id(), "Switching to parent frame");

        if self.frame_depth() == 0 {
            return Ok(());
        }

        let command = Command::BrowsingContext(BrowsingContextCommand::SwitchToParentFrame);
        self.send_command(command).await?.into_result()?;

        self.inner.cursor.lock().frames.pop();
        Ok(())
    }

    async fn switch_to_default_content(&self) -> Result<()> {
        debug!(tab_id = %self.tab_id(), "Switching to main frame");
        self.inner.cursor.lock().frames.truncate(1);
        Ok(())
    }

    async fn current_context(&self) -> Result<ContextId> {
        Ok(ContextId::from(self.tab_id()))
    }

    async fn open_blank_context(&self) -> Result<ContextId> {
        let command = Command::BrowsingContext(BrowsingContextCommand::NewTab);
        let result = self.send_command(command).await?.into_result()?;
        let tab_id = result
            .get("tabId")
            .and_then(Value::as_u64)
            .and_then(|id| u32::try_from(id).ok())
            .and_then(TabId::new)
            .ok_or_else(|| Error::protocol("No tabId in response"))?;

        let navigate = Command::BrowsingContext(BrowsingContextCommand::Navigate {
            url: BLANK_URL.to_string(),
        });
        if let Err(e) = self
            .send_to_tab(tab_id, navigate)
            .await
            .and_then(Response::into_result)
        {
            warn!(%tab_id, error = %e, "Blank context did not load, closing it");
            let close = Command::BrowsingContext(BrowsingContextCommand::CloseTab);
            if let Err(close_err) = self
                .send_to_tab(tab_id, close)
                .await
                .and_then(Response::into_result)
            {
                warn!(%tab_id, error = %close_err, "Unable to close blank context");
            }
            return Err(e);
        }

        self.inner.cursor.lock().focus(tab_id);
        debug!(%tab_id, "Opened blank context");
        Ok(ContextId::from(tab_id))
    }

    async fn switch_to_context(&self, context: &ContextId) -> Result<()> {
        let tab_id = parse_tab_id(context)?;
        debug!(%tab_id, "Switching context");
        self.inner.cursor.lock().focus(tab_id);
        Ok(())
    }

    async fn close_context(&self, context: &ContextId) -> Result<()> {
        let tab_id = parse_tab_id(context)?;
        debug!(%tab_id, "Closing context");

        let command = Command::BrowsingContext(BrowsingContextCommand::CloseTab);
        self.send_to_tab(tab_id, command).await?.into_result()?;
        Ok(())
    }

    async fn set_script_timeout(&self, timeout: Duration) -> Result<()> {
        self.inner.cursor.lock().script_timeout = timeout;
        Ok(())
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Reads a tab id back out of a context id.
fn parse_tab_id(context: &ContextId) -> Result<TabId> {
    context
        .as_str()
        .parse::<u32>()
        .ok()
        .and_then(TabId::new)
        .ok_or_else(|| Error::invalid_argument(format!("Not a tab context: {context}")))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use futures_util::{SinkExt, StreamExt};
    use serde_json::json;
    use tokio::net::TcpListener;
    use tokio_test::{assert_err, assert_ok};
    use tokio_tungstenite::tungstenite::Message;

    type Requests = Arc<Mutex<Vec<Value>>>;

    /// Page over a loopback socket whose remote end answers with `reply`.
    async fn scripted_page(reply: fn(&Value) -> Value) -> (Page, Requests) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let url = format!("ws://{}", listener.local_addr().expect("local addr"));
        let requests = Requests::default();

        let log = Arc::clone(&requests);
        tokio::spawn(async move {
            let (mut ws, _) = tokio_tungstenite::connect_async(url)
                .await
                .expect("connect");
            while let Some(Ok(Message::Text(text))) = ws.next().await {
                let request: Value = serde_json::from_str(&text).expect("request json");
                let mut response = reply(&request);
                response["id"] = request["id"].clone();
                log.lock().push(request);
                if ws.send(Message::Text(response.to_string().into())).await.is_err() {
                    break;
                }
            }
        });

        let (stream, _) = listener.accept().await.expect("accept");
        let ws = tokio_tungstenite::accept_async(stream).await.expect("upgrade");
        let ready = ReadyData {
            tab_id: 1,
            session_id: 1,
        };
        let page = Page::from_connection(Connection::new(ws), ready).expect("page");
        (page, requests)
    }

    fn success(result: Value) -> Value {
        json!({ "type": "success", "result": result })
    }

    fn failure(code: &str, message: &str) -> Value {
        json!({ "type": "error", "error": code, "message": message })
    }

    fn methods(requests: &Requests) -> Vec<String> {
        requests
            .lock()
            .iter()
            .map(|r| r["method"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_frame_stack_follows_switches() {
        let (page, requests) = scripted_page(|request| match request["method"].as_str() {
            Some("browsingContext.switchToFrameByIndex") => success(json!({ "frameId": 11 })),
            Some("browsingContext.switchToFrameByName") => failure("no such frame", "gone"),
            Some("script.evaluate") => success(json!({ "value": 1 })),
            _ => success(json!({})),
        })
        .await;

        page.switch_to_frame(&FrameHandle::Index(0))
            .await
            .expect("enter");
        assert_eq!(page.frame_depth(), 1);
        assert_eq!(page.frame_id(), FrameId::new(11));

        page.switch_to_frame(&FrameHandle::Name("gone".to_string()))
            .await
            .expect_err("no such frame");
        assert_eq!(page.frame_depth(), 1);

        let value = page.evaluate("return 1", Vec::new()).await.expect("evaluate");
        assert_eq!(value, json!(1));
        assert_eq!(requests.lock()[2]["frameId"], 11);

        page.switch_to_parent_frame().await.expect("leave");
        assert_eq!(page.frame_depth(), 0);
        assert!(page.frame_id().is_main());

        page.switch_to_parent_frame().await.expect("no-op at top");
        assert_eq!(
            methods(&requests),
            vec![
                "browsingContext.switchToFrameByIndex",
                "browsingContext.switchToFrameByName",
                "script.evaluate",
                "browsingContext.switchToParentFrame",
            ]
        );
    }

    #[tokio::test]
    async fn test_open_blank_context_focuses_new_tab() {
        let (page, requests) = scripted_page(|request| match request["method"].as_str() {
            Some("browsingContext.newTab") => success(json!({ "tabId": 7 })),
            _ => success(json!({})),
        })
        .await;

        let context = assert_ok!(page.open_blank_context().await);

        assert_eq!(context.as_str(), "7");
        assert_eq!(page.tab_id().as_u32(), 7);
        assert_eq!(assert_ok!(page.current_context().await), context);
        let requests = requests.lock();
        assert_eq!(requests[1]["method"], "browsingContext.navigate");
        assert_eq!(requests[1]["tabId"], 7);
        assert_eq!(requests[1]["params"]["url"], BLANK_URL);
    }

    #[tokio::test]
    async fn test_blank_context_closed_when_it_cannot_load() {
        let (page, requests) = scripted_page(|request| match request["method"].as_str() {
            Some("browsingContext.newTab") => success(json!({ "tabId": 7 })),
            Some("browsingContext.navigate") => failure("unknown error", "navigation blocked"),
            _ => success(json!({})),
        })
        .await;

        let err = assert_err!(page.open_blank_context().await);

        assert!(err.to_string().contains("navigation blocked"));
        assert_eq!(
            methods(&requests),
            vec![
                "browsingContext.newTab",
                "browsingContext.navigate",
                "browsingContext.closeTab",
            ]
        );
        assert_eq!(requests.lock()[2]["tabId"], 7);
        assert_eq!(page.tab_id().as_u32(), 1);
    }

    #[tokio::test]
    async fn test_out_of_range_tab_id_is_rejected() {
        let (page, requests) = scripted_page(|request| match request["method"].as_str() {
            Some("browsingContext.newTab") => success(json!({ "tabId": u64::from(u32::MAX) + 2 })),
            _ => success(json!({})),
        })
        .await;

        let err = assert_err!(page.open_blank_context().await);

        assert!(matches!(err, Error::Protocol { .. }));
        assert_eq!(methods(&requests), vec!["browsingContext.newTab"]);
        assert_eq!(page.tab_id().as_u32(), 1);
    }

    #[tokio::test]
    async fn test_remote_script_timeout_reports_bound() {
        let (page, requests) = scripted_page(|_| failure("script timeout", "script.evaluateAsync")).await;
        page.set_script_timeout(Duration::from_millis(1500))
            .await
            .expect("set timeout");

        let err = page
            .evaluate_async("done()", Vec::new())
            .await
            .expect_err("remote timeout");

        assert!(matches!(err, Error::Timeout { timeout_ms: 1500, .. }));
        assert_eq!(requests.lock()[0]["params"]["timeoutMs"], 1500);
    }

    #[test]
    fn test_page_is_clone_and_debug() {
        fn assert_traits<T: Clone + fmt::Debug + Send + Sync>() {}
        assert_traits::<Page>();
    }

    #[test]
    fn test_cursor_focus_resets_frames() {
        let tab = TabId::new(1).expect("valid tab id");
        let mut cursor = Cursor::new(tab);
        cursor.frames.push(FrameId::new(5));
        assert_eq!(cursor.frame_id(), FrameId::new(5));

        let other = TabId::new(2).expect("valid tab id");
        cursor.focus(other);
        assert_eq!(cursor.tab_id, other);
        assert!(cursor.frame_id().is_main());
    }

    #[test]
    fn test_parse_tab_id() {
        let tab = TabId::new(12).expect("valid tab id");
        assert_eq!(parse_tab_id(&ContextId::from(tab)).expect("parse"), tab);
        assert!(parse_tab_id(&ContextId::new("window-1")).is_err());
        assert!(parse_tab_id(&ContextId::new("0")).is_err());
    }
}
