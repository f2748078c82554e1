//! Where the engine's script comes from.
//!
//! | Variant | Loaded with |
//! |---------|-------------|
//! | [`EngineSource::Inline`] | nothing, already in memory |
//! | [`EngineSource::File`] | `tokio::fs` |
//! | [`EngineSource::Url`] | `reqwest`, memoised in a [`SourceCache`] |

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, info};
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Timeout for downloading an engine build.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// EngineSource
// ============================================================================

/// Location of the engine script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineSource {
    /// Script text.
    Inline(Arc<str>),
    /// Local file.
    File(PathBuf),
    /// Remote script, downloaded once per cache.
    Url(Url),
}

impl EngineSource {
    /// Creates an inline source.
    #[inline]
    #[must_use]
    pub fn inline(script: impl AsRef<str>) -> Self {
        Self::Inline(Arc::from(script.as_ref()))
    }

    /// Creates a file source.
    #[inline]
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    /// Parses a URL source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `url` does not parse.
    pub fn url(url: &str) -> Result<Self> {
        Url::parse(url)
            .map(Self::Url)
            .map_err(|e| Error::invalid_argument(format!("Invalid engine URL {url}: {e}")))
    }

    /// Loads the script text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceFetch`] if the file or URL cannot be read or
    /// yields an empty script.
    pub async fn load(&self, cache: &SourceCache) -> Result<Arc<str>> {
        match self {
            Self::Inline(script) => Ok(Arc::clone(script)),
            Self::File(path) => {
                let location = path.display().to_string();
                let text = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| Error::source_fetch(&location, e.to_string()))?;
                if text.trim().is_empty() {
                    return Err(Error::source_fetch(location, "file is empty"));
                }
                debug!(path = %location, bytes = text.len(), "Loaded engine source");
                Ok(Arc::from(text))
            }
            Self::Url(url) => cache.fetch(url).await,
        }
    }
}

// ============================================================================
// SourceCache
// ============================================================================

/// Memo of downloaded engine scripts, keyed by URL.
///
/// Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct SourceCache {
    entries: Arc<RwLock<FxHashMap<Url, Arc<str>>>>,
}

impl SourceCache {
    /// Creates an empty cache.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a cached script without downloading.
    #[must_use]
    pub fn get(&self, url: &Url) -> Option<Arc<str>> {
        self.entries.read().get(url).cloned()
    }

    /// Stores a script. Empty scripts are ignored.
    pub fn insert(&self, url: Url, script: Arc<str>) {
        if script.trim().is_empty() {
            return;
        }
        self.entries.write().insert(url, script);
    }

    /// Returns the number of cached scripts.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if nothing is cached.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns the cached script or downloads it.
    async fn fetch(&self, url: &Url) -> Result<Arc<str>> {
        if let Some(script) = self.get(url) {
            debug!(%url, "Engine source cache hit");
            return Ok(script);
        }

        let client = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()?;
        let response = client
            .get(url.clone())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| Error::source_fetch(url.as_str(), e.to_string()))?;
        let text = response
            .text()
            .await
            .map_err(|e| Error::source_fetch(url.as_str(), e.to_string()))?;

        if text.trim().is_empty() {
            return Err(Error::source_fetch(url.as_str(), "downloaded script is empty"));
        }

        info!(%url, bytes = text.len(), "Downloaded engine source");
        let script: Arc<str> = Arc::from(text);
        self.insert(url.clone(), Arc::clone(&script));
        Ok(script)
    }
}

// ============================================================================
// Tests
// ============================================================================
