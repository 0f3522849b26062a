use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::cache;
use crate::descriptor::{Scheme, SourceDescriptor};
use crate::fetcher::{FetchError, Fetcher, FetcherConfig};

/// Copies a file from the local filesystem into the cache.
///
/// The source is only ever read; it is never moved or modified.
#[derive(Debug)]
pub struct LocalFetcher {
    descriptor: SourceDescriptor,
    config: FetcherConfig,
    source: PathBuf,
    cache_path: PathBuf,
}

impl LocalFetcher {
    /// Build the fetcher and create its cache directories.
    pub fn new(descriptor: SourceDescriptor, config: FetcherConfig) -> Result<Self, FetchError> {
        if descriptor.scheme() != Scheme::Local {
            return Err(FetchError::invalid(
                descriptor.raw(),
                format!("{} source given to the local fetcher", descriptor.scheme()),
            ));
        }

        let source = cache::resolve_local(&config.root, descriptor.path())?;
        let cache_path = cache::entry_path(&config.root, &descriptor)?;

        let fetcher = Self {
            descriptor,
            config,
            source,
            cache_path,
        };
        fetcher.ensure_cache_dir()?;
        Ok(fetcher)
    }

    /// Absolute location of the file being cached.
    pub fn source_path(&self) -> &Path {
        &self.source
    }

    fn not_found(&self) -> FetchError {
        FetchError::SourceNotFound {
            path: self.source.clone(),
        }
    }
}

#[async_trait::async_trait]
impl Fetcher for LocalFetcher {
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
        match tokio::fs::metadata(&self.source).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(self.not_found()),
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(self.not_found()),
            Err(e) => return Err(FetchError::io(&self.source, e)),
        }

        tokio::fs::copy(&self.source, staging)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => self.not_found(),
                _ => FetchError::io(&self.source, e),
            })?;

        Ok(())
    }
}
