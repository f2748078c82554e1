//! Loads the engine into browsing contexts.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde_json::Value;
use tracing::debug;

use crate::browser::HostDriver;
use crate::error::{Error, Result};

use super::cursor::within_frame;
use super::scripts;

// ============================================================================
// Injector
// ============================================================================

/// Evaluates the engine source in the active frame.
///
/// An injector built with [`Injector::skipping`] never evaluates anything,
/// for pages that already ship the engine.
#[derive(Debug, Clone)]
pub struct Injector {
    source: Option<Arc<str>>,
}

impl Injector {
    /// Creates an injector for `source`.
    #[inline]
    #[must_use]
    pub fn new(source: Arc<str>) -> Self {
        Self {
            source: Some(source),
        }
    }

    /// Creates an injector that assumes the engine is already present.
    #[inline]
    #[must_use]
    pub fn skipping() -> Self {
        Self { source: None }
    }

    /// Returns `true` if injection is skipped.
    #[inline]
    #[must_use]
    pub fn is_skipping(&self) -> bool {
        self.source.is_none()
    }

    /// Injects the engine into the active frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Injection`] wrapping the driver error.
    pub async fn inject(&self, driver: &dyn HostDriver) -> Result<()> {
        let Some(source) = &self.source else {
            return Ok(());
        };
        driver
            .evaluate(source, Vec::new())
            .await
            .map_err(Error::injection)?;
        Ok(())
    }

    /// Replaces sandboxed iframes with unsandboxed clones and waits for
    /// them to load.
    ///
    /// Runs in the active document, then in every descendant frame the
    /// driver can enumerate unless `iframes` is off.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SandboxBypass`] wrapping the driver error.
    pub async fn remove_sandboxes(&self, driver: &dyn HostDriver, iframes: bool) -> Result<()> {
        debug!(iframes, "Removing iframe sandboxes");
        Step::RemoveSandboxes.apply(self, driver).await?;
        if iframes {
            self.in_all_frames(driver, Step::RemoveSandboxes).await?;
        }
        Ok(())
    }

    /// Injects into every descendant frame the driver can enumerate.
    ///
    /// Used by the legacy path, where the engine cannot reach frames on its
    /// own.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Injection`] if the engine source throws in a frame.
    pub async fn inject_all_frames(&self, driver: &dyn HostDriver) -> Result<()> {
        if self.is_skipping() {
            return Ok(());
        }
        self.in_all_frames(driver, Step::Inject).await
    }

    /// Sets the engine's origin allow-list in every descendant frame.
    ///
    /// Frames only answer the top frame's messages if their own engine
    /// accepts its origin. Runs even when injection is skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OriginAllowList`] if the engine throws in a frame.
    pub async fn configure_origins_all_frames(
        &self,
        driver: &dyn HostDriver,
        origin: &'static str,
    ) -> Result<()> {
        self.in_all_frames(driver, Step::ConfigureOrigins(origin))
            .await
    }

    /// Applies `step` in each descendant frame, depth first.
    ///
    /// Frames that cannot be entered or fail for transport reasons are
    /// skipped. A script error or a lost cursor aborts.
    fn in_all_frames<'a>(
        &'a self,
        driver: &'a dyn HostDriver,
        step: Step,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            for frame in driver.child_frames().await? {
                let descend = async {
                    step.apply(self, driver).await?;
                    self.in_all_frames(driver, step).await
                };

                match within_frame(driver, &frame, descend).await {
                    Ok(()) => debug!(%frame, ?step, "Frame done"),
                    Err(e) if is_script_failure(&e) || e.is_fatal_for_traversal() => {
                        return Err(e);
                    }
                    Err(e) => debug!(%frame, ?step, error = %e, "Skipping frame"),
                }
            }
            Ok(())
        }
        .boxed()
    }
}

// ============================================================================
// Step
// ============================================================================

/// Work done per frame by [`Injector::in_all_frames`].
#[derive(Debug, Clone, Copy)]
enum Step {
    Inject,
    RemoveSandboxes,
    ConfigureOrigins(&'static str),
}

impl Step {
    async fn apply(self, injector: &Injector, driver: &dyn HostDriver) -> Result<()> {
        match self {
            Self::Inject => injector.inject(driver).await,
            Self::RemoveSandboxes => {
                driver
                    .evaluate_async(scripts::SANDBOX_BUSTER, Vec::new())
                    .await
                    .map_err(Error::sandbox_bypass)?;
                Ok(())
            }
            Self::ConfigureOrigins(origin) => {
                driver
                    .evaluate(
                        scripts::CONFIGURE_ALLOWED_ORIGINS,
                        vec![Value::from(origin)],
                    )
                    .await
                    .map_err(Error::origin_allow_list)?;
                Ok(())
            }
        }
    }
}

/// Returns `true` if a script we evaluated threw.
fn is_script_failure(e: &Error) -> bool {
    match e {
        Error::Injection { source }
        | Error::SandboxBypass { source }
        | Error::OriginAllowList { source } => source.is_script_error(),
        _ => false,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::scan::fake::{FAKE_SOURCE, FakeDriver, FakeFrame};

    fn injector() -> Injector {
        Injector::new(Arc::from(FAKE_SOURCE))
    }

    #[tokio::test]
    async fn test_inject_failure_is_wrapped() {
        let driver = FakeDriver::new(FakeFrame::new("top").fail_inject());
        let err = injector().inject(&driver).await.expect_err("inject fails");
        assert!(matches!(err, Error::Injection { .. }));
        assert!(err.to_string().contains("Unable to inject"));
    }

    #[tokio::test]
    async fn test_skipping_never_evaluates() {
        let driver = FakeDriver::new(FakeFrame::new("top").fail_inject());
        let skipping = Injector::skipping();
        skipping.inject(&driver).await.expect("no-op");
        skipping.inject_all_frames(&driver).await.expect("no-op");
        assert!(driver.log().is_empty());
    }

    #[tokio::test]
    async fn test_inject_all_frames_depth_first() {
        let driver = FakeDriver::new(
            FakeFrame::new("top")
                .child(FakeFrame::new("a").child(FakeFrame::new("a1")))
                .child(FakeFrame::new("b").unenterable()),
        );

        injector().inject_all_frames(&driver).await.expect("inject");

        assert_eq!(driver.injected(), vec!["a", "a1"]);
        assert_eq!(driver.current_frame(), "top");
    }

    #[tokio::test]
    async fn test_inject_all_frames_script_error_aborts() {
        let driver = FakeDriver::new(
            FakeFrame::new("top")
                .child(FakeFrame::new("a").fail_inject())
                .child(FakeFrame::new("b")),
        );

        let err = injector()
            .inject_all_frames(&driver)
            .await
            .expect_err("source threw");
        assert!(matches!(err, Error::Injection { .. }));
        assert_eq!(driver.current_frame(), "top");
    }

    #[tokio::test]
    async fn test_remove_sandboxes_in_all_frames() {
        let driver = FakeDriver::new(
            FakeFrame::new("top").child(FakeFrame::new("a").child(FakeFrame::new("a1"))),
        );
        injector().remove_sandboxes(&driver, true).await.expect("bypass");

        let sandbox: Vec<String> = driver
            .log()
            .into_iter()
            .filter(|e| e.starts_with("sandbox"))
            .collect();
        assert_eq!(sandbox, vec!["sandbox:top", "sandbox:a", "sandbox:a1"]);
        assert_eq!(driver.current_frame(), "top");
    }

    #[tokio::test]
    async fn test_configure_origins_reaches_every_frame() {
        let driver = FakeDriver::new(
            FakeFrame::new("top")
                .child(FakeFrame::new("a").child(FakeFrame::new("a1")))
                .child(FakeFrame::new("b")),
        );
        let injector = injector();
        injector.inject_all_frames(&driver).await.expect("inject");

        injector
            .configure_origins_all_frames(&driver, scripts::UNSAFE_ALL_ORIGINS)
            .await
            .expect("configure");

        let origins: Vec<String> = driver
            .log()
            .into_iter()
            .filter(|e| e.starts_with("origins"))
            .collect();
        assert_eq!(
            origins,
            vec![
                "origins:a:<unsafe_all_origins>",
                "origins:a1:<unsafe_all_origins>",
                "origins:b:<unsafe_all_origins>",
            ]
        );
        assert_eq!(driver.current_frame(), "top");
    }

    #[tokio::test]
    async fn test_configure_origins_without_engine_aborts() {
        let driver = FakeDriver::new(FakeFrame::new("top").child(FakeFrame::new("a")));

        let err = injector()
            .configure_origins_all_frames(&driver, scripts::UNSAFE_ALL_ORIGINS)
            .await
            .expect_err("engine missing in frame");
        assert!(matches!(err, Error::OriginAllowList { .. }));
        assert_eq!(driver.current_frame(), "top");
    }

    #[tokio::test]
    async fn test_remove_sandboxes_top_only() {
        let driver = FakeDriver::new(FakeFrame::new("top").child(FakeFrame::new("a")));
        injector().remove_sandboxes(&driver, false).await.expect("bypass");
        assert_eq!(driver.log(), vec!["sandbox:top"]);
    }
}
