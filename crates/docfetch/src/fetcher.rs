use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::cache;
use crate::descriptor::SourceDescriptor;
use crate::flight;

/// Errors that can occur while resolving a source into the cache.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid source `{uri}`: {reason}")]
    InvalidSource { uri: String, reason: String },

    #[error("could not create cache directory {}: {source}", .path.display())]
    CacheDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("source not found: {}", .path.display())]
    SourceNotFound { path: PathBuf },

    #[error("fetching {uri} failed: {message}")]
    RemoteFetch {
        uri: String,
        status: Option<u16>,
        message: String,
    },

    #[error("no cached copy of {uri} at {} and cache-only mode forbids fetching", .path.display())]
    CacheOnlyMiss { uri: String, path: PathBuf },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Discriminant of [`FetchError`], for callers that branch on the kind only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    InvalidSource,
    CacheDirectory,
    SourceNotFound,
    RemoteFetch,
    CacheOnlyMiss,
    Io,
}

impl FetchError {
    pub fn invalid(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSource {
            uri: uri.into(),
            reason: reason.into(),
        }
    }

    pub fn remote(uri: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteFetch {
            uri: uri.into(),
            status: None,
            message: message.into(),
        }
    }

    pub fn status(uri: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::RemoteFetch {
            uri: uri.into(),
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> FetchErrorKind {
        match self {
            Self::InvalidSource { .. } => FetchErrorKind::InvalidSource,
            Self::CacheDirectory { .. } => FetchErrorKind::CacheDirectory,
            Self::SourceNotFound { .. } => FetchErrorKind::SourceNotFound,
            Self::RemoteFetch { .. } => FetchErrorKind::RemoteFetch,
            Self::CacheOnlyMiss { .. } => FetchErrorKind::CacheOnlyMiss,
            Self::Io { .. } => FetchErrorKind::Io,
        }
    }

    /// HTTP status carried by a remote failure, if the server answered at all.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::RemoteFetch { status, .. } => *status,
            _ => None,
        }
    }
}

/// Per-call settings handed to a fetcher when it is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherConfig {
    /// Anchors the cache directory and relative local paths.
    pub root: PathBuf,
    pub uri: String,
    /// Retrieve again even when a cached copy exists.
    pub refresh: bool,
    /// Serve only from the cache; never touch the source.
    pub cache_only: bool,
}

impl FetcherConfig {
    pub fn new(root: impl Into<PathBuf>, uri: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            uri: uri.into(),
            refresh: false,
            cache_only: false,
        }
    }

    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn with_cache_only(mut self, cache_only: bool) -> Self {
        self.cache_only = cache_only;
        self
    }

    /// The process-wide cache directory under the root.
    pub fn cache_dir(&self) -> PathBuf {
        cache::cache_dir(&self.root)
    }
}

/// A transport-specific strategy that brings a source into the local cache.
///
/// Implementors supply the descriptor, config, cache path and the raw
/// [`retrieve`](Fetcher::retrieve) step. The caching policy in
/// [`obtain`](Fetcher::obtain) is shared by every transport.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    fn descriptor(&self) -> &SourceDescriptor;

    fn config(&self) -> &FetcherConfig;

    /// Final location of this source's cache entry.
    fn cache_path(&self) -> &Path;

    /// Write the full source content to `staging`.
    ///
    /// Only called when a retrieval is actually needed. The staging file is
    /// discarded on error and renamed onto the cache path on success.
    async fn retrieve(&self, staging: &Path) -> Result<(), FetchError>;

    /// Create the cache directory and this entry's directory.
    fn ensure_cache_dir(&self) -> Result<(), FetchError> {
        cache::ensure_dir(&self.config().cache_dir())?;
        match self.cache_path().parent() {
            Some(entry_dir) => cache::ensure_dir(entry_dir),
            None => Ok(()),
        }
    }

    fn is_cached(&self) -> bool {
        self.cache_path().is_file()
    }

    /// Return the path of an up-to-date cache entry, retrieving it if needed.
    async fn obtain(&self) -> Result<PathBuf, FetchError> {
        let config = self.config();
        let path = self.cache_path();

        if config.cache_only {
            if self.is_cached() {
                debug!(source = %self.descriptor(), "cache-only hit");
                return Ok(path.to_path_buf());
            }
            return Err(FetchError::CacheOnlyMiss {
                uri: self.descriptor().to_string(),
                path: path.to_path_buf(),
            });
        }

        if !config.refresh && self.is_cached() {
            debug!(source = %self.descriptor(), "cache hit");
            return Ok(path.to_path_buf());
        }

        let _flight = flight::acquire(path).await;

        // Another caller may have filled the entry while we waited.
        if !config.refresh && self.is_cached() {
            debug!(source = %self.descriptor(), "cache filled by concurrent fetch");
            return Ok(path.to_path_buf());
        }

        self.ensure_cache_dir()?;
        let staging = cache::stage(path)?;

        info!(source = %self.descriptor(), refresh = config.refresh, "retrieving");
        self.retrieve(&staging).await?;
        cache::promote(staging, path)?;
        info!(path = %path.display(), "cache entry updated");

        Ok(path.to_path_buf())
    }

    /// Obtain the entry and read its bytes. The content is not interpreted.
    async fn get_raw(&self) -> Result<Vec<u8>, FetchError> {
        let path = self.obtain().await?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| FetchError::io(&path, e))
    }
}

#[async_trait::async_trait]
impl<T: Fetcher + ?Sized> Fetcher for Box<T> {
    fn descriptor(&self) -> &SourceDescriptor {
        (**self).descriptor()
    }

    fn config(&self) -> &FetcherConfig {
        (**self).config()
    }

    fn cache_path(&self) -> &Path {
        (**self).cache_path()
    }

    async fn retrieve(&self, staging: &Path) -> Result<(), FetchError> {
        (**self).retrieve(staging).await
    }

    fn ensure_cache_dir(&self) -> Result<(), FetchError> {
        (**self).ensure_cache_dir()
    }

    async fn obtain(&self) -> Result<PathBuf, FetchError> {
        (**self).obtain().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::test_support::ScriptedFetcher;

    use super::*;

    const URI: &str = "https://example.com/docs/catalog.json";

    fn config(root: &Path) -> FetcherConfig {
        FetcherConfig::new(root, URI)
    }

    #[tokio::test]
    async fn obtain_retrieves_on_first_call() {
        let root = tempfile::tempdir().unwrap();
        let fetcher = ScriptedFetcher::new(config(root.path()), "v1").unwrap();

        let path = fetcher.obtain().await.unwrap();

        assert_eq!(path, fetcher.cache_path());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "v1");
        assert_eq!(fetcher.retrievals(), 1);
    }

    #[tokio::test]
    async fn obtain_serves_existing_entry_without_refresh() {
        let root = tempfile::tempdir().unwrap();
        let fetcher = ScriptedFetcher::new(config(root.path()), "v1").unwrap();
        fetcher.obtain().await.unwrap();

        fetcher.set_content("v2");
        let path = fetcher.obtain().await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "v1");
        assert_eq!(fetcher.retrievals(), 1);
    }

    #[tokio::test]
    async fn refresh_always_retrieves() {
        let root = tempfile::tempdir().unwrap();
        let first = ScriptedFetcher::new(config(root.path()), "v1").unwrap();
        first.obtain().await.unwrap();

        let second =
            ScriptedFetcher::new(config(root.path()).with_refresh(true), "v2").unwrap();
        let path = second.obtain().await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "v2");
        assert_eq!(second.retrievals(), 1);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_entry() {
        let root = tempfile::tempdir().unwrap();
        let first = ScriptedFetcher::new(config(root.path()), "good").unwrap();
        let path = first.obtain().await.unwrap();

        let second = ScriptedFetcher::new(config(root.path()).with_refresh(true), "bad")
            .unwrap()
            .failing("connection reset");
        let err = second.obtain().await.unwrap_err();

        assert_eq!(err.kind(), FetchErrorKind::RemoteFetch);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "good");
    }

    #[tokio::test]
    async fn failed_fetch_leaves_no_entry_or_staging_file() {
        let root = tempfile::tempdir().unwrap();
        let fetcher = ScriptedFetcher::new(config(root.path()), "x")
            .unwrap()
            .failing("boom");

        assert!(fetcher.obtain().await.is_err());
        assert!(!fetcher.is_cached());

        let entry_dir = fetcher.cache_path().parent().unwrap();
        let leftovers: Vec<_> = std::fs::read_dir(entry_dir).unwrap().collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn cache_only_miss_performs_no_retrieval() {
        let root = tempfile::tempdir().unwrap();
        let fetcher =
            ScriptedFetcher::new(config(root.path()).with_cache_only(true), "x").unwrap();

        let err = fetcher.obtain().await.unwrap_err();

        assert_eq!(err.kind(), FetchErrorKind::CacheOnlyMiss);
        assert_eq!(fetcher.retrievals(), 0);
    }

    #[tokio::test]
    async fn cache_only_hit_ignores_refresh() {
        let root = tempfile::tempdir().unwrap();
        ScriptedFetcher::new(config(root.path()), "cached")
            .unwrap()
            .obtain()
            .await
            .unwrap();

        let fetcher = ScriptedFetcher::new(
            config(root.path()).with_cache_only(true).with_refresh(true),
            "new",
        )
        .unwrap();
        let path = fetcher.obtain().await.unwrap();

        assert_eq!(std::fs::read_to_string(path).unwrap(), "cached");
        assert_eq!(fetcher.retrievals(), 0);
    }

    #[tokio::test]
    async fn concurrent_obtains_share_one_retrieval() {
        let root = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(
            ScriptedFetcher::new(config(root.path()), "shared")
                .unwrap()
                .with_delay(Duration::from_millis(50)),
        );

        let a = tokio::spawn({
            let fetcher = Arc::clone(&fetcher);
            async move { fetcher.obtain().await }
        });
        let b = tokio::spawn({
            let fetcher = Arc::clone(&fetcher);
            async move { fetcher.obtain().await }
        });

        let (a, b) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());
        assert_eq!(a, b);
        assert_eq!(fetcher.retrievals(), 1);
    }

    #[tokio::test]
    async fn get_raw_returns_cached_bytes() {
        let root = tempfile::tempdir().unwrap();
        let fetcher = ScriptedFetcher::new(config(root.path()), "{\"a\":1}").unwrap();

        let bytes = fetcher.get_raw().await.unwrap();

        assert_eq!(bytes, b"{\"a\":1}");
    }

    #[tokio::test]
    async fn long_signed_query_is_cached() {
        let root = tempfile::tempdir().unwrap();
        let uri = format!(
            "https://host.com/doc.json?X-Amz-Signature={}&k={}",
            "a".repeat(200),
            "v".repeat(40)
        );
        let fetcher = ScriptedFetcher::new(FetcherConfig::new(root.path(), uri), "signed").unwrap();

        let path = fetcher.obtain().await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "signed");
        assert_eq!(fetcher.obtain().await.unwrap(), path);
        assert_eq!(fetcher.retrievals(), 1);
    }

    #[test]
    fn remote_error_exposes_status() {
        let err = FetchError::status("https://h/p", 404, "not found");
        assert_eq!(err.http_status(), Some(404));
        assert_eq!(err.kind(), FetchErrorKind::RemoteFetch);
        assert!(FetchError::remote("u", "dns").http_status().is_none());
    }
}
