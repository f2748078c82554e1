//! In-memory [`HostDriver`] for tests.
//!
//! Simulates a frame tree with an engine that answers the scripts in
//! [`super::scripts`]. Every remote step is appended to a log:
//!
//! | Entry | Step |
//! |-------|------|
//! | `inject:<loc>` | engine source evaluated |
//! | `sandbox:<frame>` | sandbox bypass |
//! | `probe` | protocol probe |
//! | `descriptors:<frame>` | frame descriptors requested |
//! | `partial:<frame>` | partial scan |
//! | `resolve:<name>` | frame selector resolved |
//! | `switch:<name>` / `parent` | cursor moves |
//! | `origins:<loc>:<value>` | allow-list configured |
//! | `chunk` / `finish` | aggregation |
//! | `run:<frame>` | legacy run |
//! | `open` / `close` | blank contexts |
//!
//! `<loc>` is the frame name in the page, or the context name elsewhere.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::{Value, json};

use crate::browser::{FrameHandle, HostDriver};
use crate::error::{Error, Result};
use crate::identifiers::ContextId;

use super::scripts;

// ============================================================================
// Constants
// ============================================================================

/// Engine source understood by [`FakeDriver`].
pub const FAKE_SOURCE: &str = "window.axe = { fake: true };";

const PAGE: &str = "page";

// ============================================================================
// FakeFrame
// ============================================================================

#[derive(Debug, Clone)]
enum Child {
    Frame(FakeFrame),
    Unresolvable(String),
}

/// A document in the simulated frame tree.
#[derive(Debug, Clone)]
pub struct FakeFrame {
    name: String,
    children: Vec<Child>,
    fail_inject: bool,
    fail_partial: bool,
    reject_partial: Option<String>,
    unenterable: bool,
    stuck: bool,
}

impl FakeFrame {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            children: Vec::new(),
            fail_inject: false,
            fail_partial: false,
            reject_partial: None,
            unenterable: false,
            stuck: false,
        }
    }

    pub fn child(mut self, frame: FakeFrame) -> Self {
        self.children.push(Child::Frame(frame));
        self
    }

    /// Adds a descriptor whose selector resolves to nothing.
    pub fn unresolvable(mut self, name: &str) -> Self {
        self.children.push(Child::Unresolvable(name.to_string()));
        self
    }

    /// Engine source throws here.
    pub fn fail_inject(mut self) -> Self {
        self.fail_inject = true;
        self
    }

    /// Partial scan times out here.
    pub fn fail_partial(mut self) -> Self {
        self.fail_partial = true;
        self
    }

    /// Engine rejects the partial scan here.
    pub fn reject_partial(mut self, message: &str) -> Self {
        self.reject_partial = Some(message.to_string());
        self
    }

    /// Switching into this frame fails.
    pub fn unenterable(mut self) -> Self {
        self.unenterable = true;
        self
    }

    /// Switching out of this frame fails.
    pub fn stuck(mut self) -> Self {
        self.stuck = true;
        self
    }

    fn frames(&self) -> impl Iterator<Item = &FakeFrame> {
        self.children.iter().filter_map(|c| match c {
            Child::Frame(f) => Some(f),
            Child::Unresolvable(_) => None,
        })
    }

    fn find(&self, name: &str) -> Option<&FakeFrame> {
        self.frames().find(|f| f.name == name)
    }
}

// ============================================================================
// FakeDriver
// ============================================================================

#[derive(Default)]
struct State {
    path: Vec<String>,
    context: String,
    open: Vec<String>,
    blanks: u32,
    injected_at: FxHashSet<String>,
    injected: Vec<String>,
    chunks: FxHashMap<String, String>,
    log: Vec<String>,
    finish_args: Option<Value>,
    finish_context: Option<String>,
    partial_options: Option<Value>,
    allowed_origins: Vec<String>,
    run_count: usize,
    script_timeout: Option<Duration>,
}

/// Scriptable [`HostDriver`] over a [`FakeFrame`] tree.
pub struct FakeDriver {
    root: FakeFrame,
    legacy_engine: bool,
    fail_finish: bool,
    block_new_contexts: bool,
    run_rejects: Option<String>,
    run_throws: Option<String>,
    state: Mutex<State>,
}

impl FakeDriver {
    pub fn new(root: FakeFrame) -> Self {
        Self {
            root,
            legacy_engine: false,
            fail_finish: false,
            block_new_contexts: false,
            run_rejects: None,
            run_throws: None,
            state: Mutex::new(State {
                context: PAGE.to_string(),
                open: vec![PAGE.to_string()],
                ..State::default()
            }),
        }
    }

    /// Engine without the two-phase protocol.
    pub fn legacy_engine(mut self) -> Self {
        self.legacy_engine = true;
        self
    }

    pub fn fail_finish(mut self) -> Self {
        self.fail_finish = true;
        self
    }

    /// Opening a new context fails, as with a popup blocker.
    pub fn block_new_contexts(mut self) -> Self {
        self.block_new_contexts = true;
        self
    }

    /// Legacy run resolves with `{ errorMessage }`.
    pub fn run_rejects(mut self, message: &str) -> Self {
        self.run_rejects = Some(message.to_string());
        self
    }

    /// Legacy run throws a script error.
    pub fn run_throws(mut self, message: &str) -> Self {
        self.run_throws = Some(message.to_string());
        self
    }

    /// Marks the top frame as already carrying the engine. Not logged.
    pub fn inject_top(&self) {
        let mut state = self.state.lock();
        state.injected_at.insert(self.root.name.clone());
        state.injected.push(self.root.name.clone());
    }

    pub fn log(&self) -> Vec<String> {
        self.state.lock().log.clone()
    }

    /// Locations injected successfully, in order.
    pub fn injected(&self) -> Vec<String> {
        self.state.lock().injected.clone()
    }

    /// Name of the page frame the cursor is on.
    pub fn current_frame(&self) -> String {
        let state = self.state.lock();
        self.frame(&state.path).name.clone()
    }

    /// Focused context.
    pub fn context(&self) -> String {
        self.state.lock().context.clone()
    }

    pub fn open_contexts(&self) -> Vec<String> {
        self.state.lock().open.clone()
    }

    /// Partial results the finish step parsed.
    pub fn finish_args(&self) -> Option<Value> {
        self.state.lock().finish_args.clone()
    }

    pub fn finish_context(&self) -> Option<String> {
        self.state.lock().finish_context.clone()
    }

    /// Options of the last partial scan.
    pub fn partial_options(&self) -> Option<Value> {
        self.state.lock().partial_options.clone()
    }

    pub fn allowed_origins(&self) -> Vec<String> {
        self.state.lock().allowed_origins.clone()
    }

    pub fn run_count(&self) -> usize {
        self.state.lock().run_count
    }

    pub fn script_timeout(&self) -> Option<Duration> {
        self.state.lock().script_timeout
    }

    fn frame(&self, path: &[String]) -> &FakeFrame {
        let mut frame = &self.root;
        for name in path {
            match frame.find(name) {
                Some(child) => frame = child,
                None => break,
            }
        }
        frame
    }

    fn in_page(state: &State) -> bool {
        state.context == PAGE
    }

    fn location(&self, state: &State) -> String {
        if Self::in_page(state) {
            self.frame(&state.path).name.clone()
        } else {
            state.context.clone()
        }
    }

    fn require_engine(&self, state: &State) -> Result<()> {
        if state.injected_at.contains(&self.location(state)) {
            Ok(())
        } else {
            Err(Error::script_error("axe is not defined"))
        }
    }

    fn results(&self) -> Value {
        json!({
            "testEngine": { "name": "axe-core", "version": "4.8.2" },
            "testRunner": { "name": "axe" },
            "testEnvironment": { "userAgent": "FakeBrowser/1.0", "windowWidth": 1280, "windowHeight": 720 },
            "url": "https://fake.test/",
            "timestamp": "2024-01-01T00:00:00.000Z",
            "passes": [],
            "violations": [],
            "incomplete": [],
            "inapplicable": []
        })
    }

    fn inject(&self, state: &mut State) -> Result<Value> {
        let location = self.location(state);
        state.log.push(format!("inject:{location}"));
        if Self::in_page(state) && self.frame(&state.path).fail_inject {
            return Err(Error::script_error("SyntaxError: unexpected token"));
        }
        if state.injected_at.insert(location.clone()) {
            state.injected.push(location);
        }
        Ok(Value::Null)
    }

    fn descriptors(&self, state: &mut State) -> Result<Value> {
        let frame = self.frame(&state.path);
        state.log.push(format!("descriptors:{}", frame.name));
        self.require_engine(state)?;

        let descriptors: Vec<Value> = frame
            .children
            .iter()
            .map(|c| match c {
                Child::Frame(f) => f.name.as_str(),
                Child::Unresolvable(name) => name.as_str(),
            })
            .map(|name| {
                json!({
                    "frameContext": { "include": [[name]], "exclude": [] },
                    "frameSelector": [name],
                })
            })
            .collect();
        Ok(Value::Array(descriptors))
    }

    fn finish(&self, state: &mut State) -> Result<Value> {
        state.log.push("finish".to_string());
        self.require_engine(state)?;
        if self.fail_finish {
            return Err(Error::script_error("axe.finishRun failed"));
        }

        let location = self.location(state);
        let buffer = state.chunks.remove(&location).unwrap_or_default();
        let partials: Value = serde_json::from_str(&buffer)?;
        state.finish_args = Some(partials);
        state.finish_context = Some(location);
        Ok(self.results())
    }

    fn run(&self, state: &mut State) -> Result<Value> {
        let frame = self.location(state);
        state.log.push(format!("run:{frame}"));
        self.require_engine(state)?;
        state.run_count += 1;

        if let Some(message) = &self.run_throws {
            return Err(Error::script_error(message.clone()));
        }
        if let Some(message) = &self.run_rejects {
            return Ok(json!({ "errorMessage": message }));
        }
        Ok(self.results())
    }
}

// ============================================================================
// HostDriver Implementation
// ============================================================================

#[async_trait]
impl HostDriver for FakeDriver {
    async fn evaluate(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        let mut state = self.state.lock();

        match script {
            FAKE_SOURCE => self.inject(&mut state),
            scripts::HAS_RUN_PARTIAL => {
                state.log.push("probe".to_string());
                self.require_engine(&state)?;
                Ok(Value::Bool(!self.legacy_engine))
            }
            scripts::CONFIGURE_ALLOWED_ORIGINS => {
                let origin = args.first().and_then(Value::as_str).unwrap_or_default();
                let location = self.location(&state);
                state.log.push(format!("origins:{location}:{origin}"));
                self.require_engine(&state)?;
                state.allowed_origins.push(origin.to_string());
                Ok(Value::Null)
            }
            scripts::FRAME_CONTEXTS => self.descriptors(&mut state),
            scripts::STORE_CHUNK => {
                state.log.push("chunk".to_string());
                let chunk = args.first().and_then(Value::as_str).unwrap_or_default();
                let location = self.location(&state);
                state.chunks.entry(location).or_default().push_str(chunk);
                Ok(Value::Null)
            }
            _ => Err(Error::script_error(format!("unexpected script: {script}"))),
        }
    }

    async fn evaluate_async(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        let mut state = self.state.lock();

        match script {
            scripts::SANDBOX_BUSTER => {
                let frame = self.location(&state);
                state.log.push(format!("sandbox:{frame}"));
                Ok(Value::Null)
            }
            scripts::RUN_PARTIAL => {
                let frame = self.frame(&state.path);
                state.log.push(format!("partial:{}", frame.name));
                self.require_engine(&state)?;
                state.partial_options = args.get(1).cloned();
                if frame.fail_partial {
                    return Err(Error::timeout("script.evaluateAsync", 30_000));
                }
                if let Some(message) = &frame.reject_partial {
                    let mut rejection = serde_json::Map::new();
                    rejection.insert(scripts::REJECTION_KEY.to_string(), json!(message));
                    return Ok(Value::Object(rejection));
                }
                Ok(json!({ "frame": frame.name }))
            }
            scripts::FINISH_RUN => self.finish(&mut state),
            scripts::RUN => self.run(&mut state),
            _ => Err(Error::script_error(format!("unexpected script: {script}"))),
        }
    }

    async fn evaluate_handle(
        &self,
        script: &str,
        args: Vec<Value>,
    ) -> Result<Option<FrameHandle>> {
        if script != scripts::SHADOW_SELECT {
            return Err(Error::script_error(format!("unexpected script: {script}")));
        }

        let mut state = self.state.lock();
        let name = args
            .first()
            .and_then(|selector| selector.get(0))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        state.log.push(format!("resolve:{name}"));

        let frame = self.frame(&state.path);
        Ok(frame.find(&name).map(|_| FrameHandle::Name(name)))
    }

    async fn child_frames(&self) -> Result<Vec<FrameHandle>> {
        let state = self.state.lock();
        Ok(self
            .frame(&state.path)
            .frames()
            .map(|f| FrameHandle::Name(f.name.clone()))
            .collect())
    }

    async fn switch_to_frame(&self, frame: &FrameHandle) -> Result<()> {
        let mut state = self.state.lock();
        let FrameHandle::Name(name) = frame else {
            return Err(Error::protocol(format!("unsupported handle {frame}")));
        };
        state.log.push(format!("switch:{name}"));

        match self.frame(&state.path).find(name) {
            Some(child) if !child.unenterable => {
                state.path.push(name.clone());
                Ok(())
            }
            _ => Err(Error::protocol(format!("no such frame: {name}"))),
        }
    }

    async fn switch_to_parent_frame(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.log.push("parent".to_string());
        if self.frame(&state.path).stuck {
            return Err(Error::protocol("frame detached"));
        }
        state.path.pop();
        Ok(())
    }

    async fn switch_to_default_content(&self) -> Result<()> {
        self.state.lock().path.clear();
        Ok(())
    }

    async fn current_context(&self) -> Result<ContextId> {
        Ok(ContextId::new(&self.state.lock().context))
    }

    async fn open_blank_context(&self) -> Result<ContextId> {
        let mut state = self.state.lock();
        state.log.push("open".to_string());
        if self.block_new_contexts {
            return Err(Error::protocol("window.open blocked"));
        }
        state.blanks += 1;
        let name = format!("blank-{}", state.blanks);
        state.open.push(name.clone());
        state.context = name.clone();
        Ok(ContextId::new(name))
    }

    async fn switch_to_context(&self, context: &ContextId) -> Result<()> {
        let mut state = self.state.lock();
        if !state.open.iter().any(|c| c == context.as_str()) {
            return Err(Error::protocol(format!("no such context: {context}")));
        }
        state.context = context.as_str().to_string();
        if Self::in_page(&state) {
            state.path.clear();
        }
        Ok(())
    }

    async fn close_context(&self, context: &ContextId) -> Result<()> {
        let mut state = self.state.lock();
        state.log.push("close".to_string());
        let before = state.open.len();
        state.open.retain(|c| c != context.as_str());
        if state.open.len() == before {
            return Err(Error::protocol(format!("no such context: {context}")));
        }
        Ok(())
    }

    async fn set_script_timeout(&self, timeout: Duration) -> Result<()> {
        self.state.lock().script_timeout = Some(timeout);
        Ok(())
    }
}
