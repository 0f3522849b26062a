use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::{FetchError, Fetcher, FetcherConfig, SourceDescriptor, cache, uri};

/// In-memory fetcher for testing. Serves fixed content and counts retrievals.
pub struct ScriptedFetcher {
    descriptor: SourceDescriptor,
    config: FetcherConfig,
    cache_path: PathBuf,
    content: Mutex<Vec<u8>>,
    failure: Option<String>,
    delay: Option<Duration>,
    retrievals: AtomicUsize,
}

impl ScriptedFetcher {
    /// Classify `config.uri` and prepare its cache directories.
    pub fn new(config: FetcherConfig, content: impl Into<Vec<u8>>) -> Result<Self, FetchError> {
        let descriptor = uri::classify(&config.uri)?;
        let cache_path = cache::entry_path(&config.root, &descriptor)?;

        let fetcher = Self {
            descriptor,
            config,
            cache_path,
            content: Mutex::new(content.into()),
            failure: None,
            delay: None,
            retrievals: AtomicUsize::new(0),
        };
        fetcher.ensure_cache_dir()?;
        Ok(fetcher)
    }

    /// Make every retrieval write a partial body and then fail.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_content(&self, content: impl Into<Vec<u8>>) {
        *self.content.lock().unwrap_or_else(PoisonError::into_inner) = content.into();
    }

    /// Number of times `retrieve` has run.
    pub fn retrievals(&self) -> usize {
        self.retrievals.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Fetcher for ScriptedFetcher {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    fn config(&self) -> &FetcherConfig {
        &self.config
    }

    fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    async fn retrieve(&self, staging: &Path) -> Result<(), FetchError> {
        self.retrievals.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let content = self
            .content
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        if let Some(message) = &self.failure {
            let partial = &content[..content.len() / 2];
            tokio::fs::write(staging, partial)
                .await
                .map_err(|e| FetchError::io(staging, e))?;
            return Err(FetchError::remote(self.descriptor.to_string(), message.clone()));
        }

        tokio::fs::write(staging, content)
            .await
            .map_err(|e| FetchError::io(staging, e))
    }
}
