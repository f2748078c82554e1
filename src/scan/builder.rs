//! Scan configuration and the top-level entry point.
//!
//! # Example
//!
//! ```no_run
//! use axe_webdriver::{EngineSource, Page, ScanBuilder};
//!
//! # async fn example(page: &Page) -> axe_webdriver::Result<()> {
//! let results = ScanBuilder::new()
//!     .source(EngineSource::file("node_modules/axe-core/axe.min.js"))
//!     .include("main")
//!     .exclude(".ads")
//!     .with_tags(["wcag2a", "wcag2aa"])
//!     .analyze(page)
//!     .await?;
//!
//! println!("{} violations", results.violations.len());
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::browser::HostDriver;
use crate::error::{Error, Result};

use super::ScanPhase;
use super::aggregator::aggregate;
use super::context::{ContextSelector, ScanContext};
use super::engine::{DEFAULT_CHUNK_SIZE, Engine};
use super::injector::Injector;
use super::legacy::run_legacy;
use super::negotiator::{Protocol, negotiate};
use super::options::{RunOnly, RunOnlyKind, ScanOptions};
use super::report::write_json;
use super::results::ScanResults;
use super::source::{EngineSource, SourceCache};
use super::traversal::Traverser;

// ============================================================================
// Constants
// ============================================================================

/// Default bound on each async engine call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// ScanBuilder
// ============================================================================

/// Configures and runs an accessibility scan.
///
/// Setters never fail; the configuration is validated by
/// [`ScanBuilder::analyze`]. A builder can be reused for several scans.
#[derive(Debug, Clone)]
pub struct ScanBuilder {
    context: ScanContext,
    options: ScanOptions,
    legacy: bool,
    timeout: Duration,
    bypass_sandbox: bool,
    iframes: bool,
    source: Option<EngineSource>,
    skip_injection: bool,
    cache: SourceCache,
    output_file: Option<PathBuf>,
    chunk_size: usize,
}

impl Default for ScanBuilder {
    fn default() -> Self {
        Self {
            context: ScanContext::default(),
            options: ScanOptions::default(),
            legacy: false,
            timeout: DEFAULT_TIMEOUT,
            bypass_sandbox: false,
            iframes: true,
            source: None,
            skip_injection: false,
            cache: SourceCache::new(),
            output_file: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

// ============================================================================
// ScanBuilder - Setters
// ============================================================================

impl ScanBuilder {
    /// Creates a builder scanning the whole document with engine defaults.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a selector to test.
    #[must_use]
    pub fn include(mut self, selector: impl Into<ContextSelector>) -> Self {
        self.context.include.push(selector.into());
        self
    }

    /// Adds a selector to leave out.
    #[must_use]
    pub fn exclude(mut self, selector: impl Into<ContextSelector>) -> Self {
        self.context.exclude.push(selector.into());
        self
    }

    /// Runs only rules carrying one of `tags`.
    ///
    /// An empty list leaves the options unchanged.
    #[must_use]
    pub fn with_tags<I, S>(self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.run_only(RunOnlyKind::Tag, tags)
    }

    /// Runs only the rules named in `rules`.
    ///
    /// An empty list leaves the options unchanged.
    #[must_use]
    pub fn with_only_rules<I, S>(self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.run_only(RunOnlyKind::Rule, rules)
    }

    /// Enables `rules` in addition to those already configured.
    #[must_use]
    pub fn with_rules<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rules: Vec<String> = rules.into_iter().map(Into::into).collect();
        if !rules.is_empty() {
            self.options.toggle_rules(rules, true);
        }
        self
    }

    /// Disables `rules`.
    #[must_use]
    pub fn disable_rules<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rules: Vec<String> = rules.into_iter().map(Into::into).collect();
        if !rules.is_empty() {
            self.options.toggle_rules(rules, false);
        }
        self
    }

    /// Replaces every option set so far with `options`.
    #[must_use]
    pub fn with_options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }

    /// Forces the single-pass legacy protocol.
    ///
    /// The origin allow-list stays at same-origin, so cross-origin frames
    /// are not tested.
    #[must_use]
    pub fn legacy_mode(mut self, legacy: bool) -> Self {
        self.legacy = legacy;
        self
    }

    /// Sets the bound on each async engine call.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Strips `sandbox` from iframes before scanning.
    #[must_use]
    pub fn without_iframe_sandboxes(mut self) -> Self {
        self.bypass_sandbox = true;
        self
    }

    /// Scans the top document only.
    #[must_use]
    pub fn disable_iframe_testing(mut self) -> Self {
        self.iframes = false;
        self
    }

    /// Sets where the engine script comes from.
    #[must_use]
    pub fn source(mut self, source: EngineSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Assumes the page already ships the engine.
    ///
    /// Frames of the page are never injected. The finish step still runs in
    /// a blank context, so the modern protocol needs a [`source`] anyway.
    ///
    /// [`source`]: ScanBuilder::source
    #[must_use]
    pub fn skip_injection(mut self) -> Self {
        self.skip_injection = true;
        self
    }

    /// Shares a download cache with other builders.
    #[must_use]
    pub fn cache(mut self, cache: SourceCache) -> Self {
        self.cache = cache;
        self
    }

    /// Writes the JSON results to `path` after a successful scan.
    #[must_use]
    pub fn output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = Some(path.into());
        self
    }

    /// Sets the largest piece of partial results sent to the finish step.
    #[must_use]
    pub fn aggregation_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes;
        self
    }

    /// Returns the configured options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Returns the configured context.
    #[inline]
    #[must_use]
    pub fn context(&self) -> &ScanContext {
        &self.context
    }

    fn run_only<I, S>(mut self, kind: RunOnlyKind, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        if !values.is_empty() {
            self.options.run_only = Some(RunOnly { kind, values });
        }
        self
    }
}

// ============================================================================
// ScanBuilder - Analyze
// ============================================================================

impl ScanBuilder {
    /// Scans the page behind `driver`.
    ///
    /// The driver is moved to the top document first and is left there.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] for invalid options or selectors
    /// - [`Error::Config`] if no engine source is set
    /// - [`Error::SourceFetch`] if the source cannot be loaded
    /// - [`Error::Injection`] or [`Error::SandboxBypass`] at the top frame
    /// - [`Error::PartialScan`] if the top frame cannot be scanned
    /// - [`Error::Aggregation`] if the finish step fails
    /// - [`Error::ContextRestore`] if the frame cursor was lost
    pub async fn analyze(&self, driver: &dyn HostDriver) -> Result<ScanResults> {
        let mut phase = ScanPhase::Idle;

        match self.run(driver, &mut phase).await {
            Ok(results) => {
                if let Some(path) = &self.output_file {
                    write_json(path, &results).await?;
                    debug!(path = %path.display(), "Wrote scan results");
                }
                transition(&mut phase, ScanPhase::Done);
                info!(
                    url = %results.url,
                    violations = results.violations.len(),
                    incomplete = results.incomplete.len(),
                    errored = results.is_errored(),
                    "Scan complete"
                );
                Ok(results)
            }
            Err(e) => {
                let failed_in = e.phase().unwrap_or(phase);
                error!(phase = %failed_in, error = %e, "Scan failed");
                transition(&mut phase, ScanPhase::Failed);
                Err(e)
            }
        }
    }

    async fn run(&self, driver: &dyn HostDriver, phase: &mut ScanPhase) -> Result<ScanResults> {
        self.options.validate()?;
        self.context.validate()?;
        let context = serde_json::to_value(&self.context)?;
        let options = serde_json::to_value(&self.options)?;
        let source = self.load_source().await?;
        let page_injector = match (&source, self.skip_injection) {
            (Some(source), false) => Injector::new(Arc::clone(source)),
            _ => Injector::skipping(),
        };

        driver.set_script_timeout(self.timeout).await?;
        driver.switch_to_default_content().await?;

        transition(phase, ScanPhase::Negotiating);
        if self.bypass_sandbox {
            page_injector.remove_sandboxes(driver, self.iframes).await?;
        }
        page_injector.inject(driver).await?;

        let engine = Engine::new(driver).with_chunk_size(self.chunk_size);
        let protocol = negotiate(&engine, self.legacy).await;
        info!(%protocol, iframes = self.iframes, "Protocol selected");

        match protocol {
            Protocol::Modern => {
                transition(phase, ScanPhase::Traversing);
                let slots = Traverser::new(&engine, &page_injector, &options)
                    .with_iframes(self.iframes)
                    .run(&context)
                    .await?;

                // the blank context never has the engine, even when the page does
                transition(phase, ScanPhase::Aggregating);
                let blank_injector = source.map_or_else(Injector::skipping, Injector::new);
                let value = aggregate(&engine, &blank_injector, &slots, &options).await?;
                ScanResults::from_engine(value).map_err(Error::aggregation)
            }
            Protocol::Legacy(reason) => {
                transition(phase, ScanPhase::LegacyRunning);
                run_legacy(&engine, &page_injector, reason, &context, &options, self.iframes)
                    .await
            }
        }
    }

    /// Loads the engine source. Optional only when injection is skipped.
    async fn load_source(&self) -> Result<Option<Arc<str>>> {
        match &self.source {
            Some(source) => Ok(Some(source.load(&self.cache).await?)),
            None if self.skip_injection => Ok(None),
            None => Err(Error::config(
                "No engine source set; call source() or skip_injection()",
            )),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn transition(phase: &mut ScanPhase, next: ScanPhase) {
    debug!(from = %phase, to = %next, "Scan phase");
    *phase = next;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{Value, json};

    use crate::scan::fake::{FAKE_SOURCE, FakeDriver, FakeFrame};

    fn options_value(builder: &ScanBuilder) -> Value {
        serde_json::to_value(builder.options()).expect("serialize options")
    }

    fn builder() -> ScanBuilder {
        ScanBuilder::new().source(EngineSource::inline(FAKE_SOURCE))
    }

    fn nested() -> FakeFrame {
        FakeFrame::new("top").child(
            FakeFrame::new("a")
                .child(FakeFrame::new("b"))
                .unresolvable("c"),
        )
    }

    #[tokio::test]
    async fn test_modern_scan_collects_one_slot_per_frame() {
        let driver = FakeDriver::new(nested());

        let results = builder().analyze(&driver).await.expect("scan");

        assert_eq!(results.url, "https://fake.test/");
        assert!(!results.is_errored());
        assert_eq!(
            driver.finish_args(),
            Some(json!([{ "frame": "top" }, { "frame": "a" }, { "frame": "b" }, null]))
        );
        assert_eq!(driver.current_frame(), "top");
        assert_eq!(driver.context(), "page");
        assert_eq!(driver.open_contexts(), vec!["page"]);
        assert_eq!(driver.script_timeout(), Some(DEFAULT_TIMEOUT));
    }

    #[tokio::test]
    async fn test_unsupported_engine_runs_legacy_once() {
        let driver = FakeDriver::new(nested()).legacy_engine();

        let results = builder().analyze(&driver).await.expect("scan");

        assert!(!results.is_errored());
        assert_eq!(driver.run_count(), 1);
        assert_eq!(
            driver.allowed_origins(),
            vec!["<unsafe_all_origins>"; driver.injected().len()]
        );
        assert!(driver.log().iter().all(|e| !e.starts_with("partial")));
        assert_eq!(driver.finish_args(), None);
    }

    #[tokio::test]
    async fn test_forced_legacy_discovers_no_frames() {
        let driver = FakeDriver::new(nested());

        builder().legacy_mode(true).analyze(&driver).await.expect("scan");

        let log = driver.log();
        assert!(log.iter().all(|e| !e.starts_with("descriptors")));
        assert!(log.iter().all(|e| !e.starts_with("switch")));
        assert!(!log.contains(&"probe".to_string()));
        assert_eq!(driver.run_count(), 1);
        assert_eq!(driver.allowed_origins(), vec!["<same_origin>"]);
    }

    #[tokio::test]
    async fn test_top_injection_failure_is_fatal() {
        let driver = FakeDriver::new(FakeFrame::new("top").fail_inject());

        let err = builder().analyze(&driver).await.expect_err("inject fails");

        assert!(matches!(err, Error::Injection { .. }));
        assert_eq!(err.phase(), Some(ScanPhase::Negotiating));
        assert!(!driver.log().contains(&"probe".to_string()));
    }

    #[tokio::test]
    async fn test_aggregation_failure_is_fatal() {
        let driver = FakeDriver::new(nested()).fail_finish();

        let err = builder().analyze(&driver).await.expect_err("finish fails");

        assert!(matches!(err, Error::Aggregation { .. }));
        assert_eq!(err.phase(), Some(ScanPhase::Aggregating));
        assert_eq!(driver.open_contexts(), vec!["page"]);
    }

    #[tokio::test]
    async fn test_failing_grandchild_keeps_scan_alive() {
        let driver = FakeDriver::new(
            FakeFrame::new("top")
                .child(FakeFrame::new("a").child(FakeFrame::new("a1").fail_partial()))
                .child(FakeFrame::new("b")),
        );

        builder().analyze(&driver).await.expect("scan");

        assert_eq!(
            driver.finish_args(),
            Some(json!([{ "frame": "top" }, { "frame": "a" }, null, { "frame": "b" }]))
        );
    }

    #[tokio::test]
    async fn test_with_options_replaces_tags() {
        let custom = ScanOptions {
            xpath: Some(true),
            ..ScanOptions::default()
        };
        let builder = builder().with_tags(["t1"]).with_options(custom.clone());
        assert_eq!(options_value(&builder), json!({ "xpath": true }));

        let driver = FakeDriver::new(FakeFrame::new("top"));
        builder.analyze(&driver).await.expect("scan");
        assert_eq!(driver.partial_options(), Some(json!({ "xpath": true })));
    }

    #[test]
    fn test_empty_lists_are_ignored() {
        let builder = ScanBuilder::new()
            .with_tags(Vec::<String>::new())
            .with_only_rules(Vec::<String>::new())
            .with_rules(Vec::<String>::new())
            .disable_rules(Vec::<&str>::new());
        assert_eq!(builder.options(), &ScanOptions::default());
    }

    #[test]
    fn test_rule_setters_merge() {
        let builder = ScanBuilder::new()
            .with_rules(["region"])
            .disable_rules(["color-contrast"])
            .with_tags(["wcag2a"]);
        assert_eq!(
            options_value(&builder),
            json!({
                "runOnly": { "type": "tag", "values": ["wcag2a"] },
                "rules": {
                    "color-contrast": { "enabled": false },
                    "region": { "enabled": true }
                }
            })
        );
    }

    #[tokio::test]
    async fn test_invalid_options_rejected_before_driver_use() {
        let driver = FakeDriver::new(FakeFrame::new("top"));
        let err = builder()
            .with_tags(["wcag2a", " "])
            .analyze(&driver)
            .await
            .expect_err("empty tag");
        assert!(matches!(err, Error::InvalidArgument { .. }));
        assert!(driver.log().is_empty());
    }

    #[tokio::test]
    async fn test_missing_source_is_config_error() {
        let driver = FakeDriver::new(FakeFrame::new("top"));
        let err = ScanBuilder::new()
            .analyze(&driver)
            .await
            .expect_err("no source");
        assert!(matches!(err, Error::Config { .. }));
    }

    #[tokio::test]
    async fn test_skip_injection_only_injects_blank_context() {
        let driver = FakeDriver::new(FakeFrame::new("top"));
        driver.inject_top();

        builder().skip_injection().analyze(&driver).await.expect("scan");

        let injections: Vec<String> = driver
            .log()
            .into_iter()
            .filter(|e| e.starts_with("inject"))
            .collect();
        assert_eq!(injections, vec!["inject:blank-1"]);
    }

    #[tokio::test]
    async fn test_skip_injection_without_source() {
        let driver = FakeDriver::new(FakeFrame::new("top"));
        driver.inject_top();

        ScanBuilder::new()
            .skip_injection()
            .legacy_mode(true)
            .analyze(&driver)
            .await
            .expect("scan");
        assert_eq!(driver.run_count(), 1);
    }

    #[tokio::test]
    async fn test_sandbox_bypass_runs_before_injection() {
        let driver = FakeDriver::new(FakeFrame::new("top").child(FakeFrame::new("a")));

        builder()
            .without_iframe_sandboxes()
            .analyze(&driver)
            .await
            .expect("scan");

        let log = driver.log();
        let sandbox = log.iter().position(|e| e == "sandbox:a");
        let inject = log.iter().position(|e| e == "inject:top");
        assert!(sandbox.is_some());
        assert!(sandbox < inject);
    }

    #[tokio::test]
    async fn test_disable_iframe_testing_sends_one_slot() {
        let driver = FakeDriver::new(nested());

        builder()
            .disable_iframe_testing()
            .analyze(&driver)
            .await
            .expect("scan");

        assert_eq!(driver.finish_args(), Some(json!([{ "frame": "top" }])));
    }

    #[tokio::test]
    async fn test_engine_reported_error_is_returned() {
        let driver = FakeDriver::new(nested()).legacy_engine().run_rejects("boom");

        let results = builder().analyze(&driver).await.expect("errored result");
        assert_eq!(results.error_message.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_output_file_written() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("results.json");
        let driver = FakeDriver::new(FakeFrame::new("top"));

        builder()
            .output_file(&path)
            .analyze(&driver)
            .await
            .expect("scan");

        let written = std::fs::read_to_string(&path).expect("read");
        let value: Value = serde_json::from_str(&written).expect("json");
        assert_eq!(value["url"], "https://fake.test/");
    }

    #[tokio::test]
    async fn test_custom_timeout_reaches_driver() {
        let driver = FakeDriver::new(FakeFrame::new("top"));
        builder()
            .timeout(Duration::from_secs(5))
            .analyze(&driver)
            .await
            .expect("scan");
        assert_eq!(driver.script_timeout(), Some(Duration::from_secs(5)));
    }
}
