use std::path::Path;

use docfetch::{FetchError, FetcherConfig, LocalFetcher, Scheme, classify};
use docfetch_https::{GithubFetcher, HttpsFetcher};
use docfetch_sftp::{SftpFetcher, SftpOptions};
use tracing::debug;

use crate::AnyFetcher;

/// Builds the fetcher for a URI.
///
/// Holds the transport settings that do not come from the URI itself.
#[derive(Debug, Clone, Default)]
pub struct FetcherFactory {
    sftp: SftpOptions,
}

impl FetcherFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sftp_options(mut self, options: SftpOptions) -> Self {
        self.sftp = options;
        self
    }

    /// Classify `uri` and construct the fetcher for its scheme.
    ///
    /// Malformed URIs fail before anything touches the filesystem. A fetcher
    /// that cannot create its cache directories fails here too.
    pub fn resolve(
        &self,
        root: impl AsRef<Path>,
        uri: &str,
        refresh: bool,
        cache_only: bool,
    ) -> Result<AnyFetcher, FetchError> {
        let descriptor = classify(uri)?;
        let config = FetcherConfig::new(root.as_ref(), uri)
            .with_refresh(refresh)
            .with_cache_only(cache_only);

        debug!(source = %descriptor, scheme = %descriptor.scheme(), "resolved fetcher");

        Ok(match descriptor.scheme() {
            Scheme::Local => AnyFetcher::Local(LocalFetcher::new(descriptor, config)?),
            Scheme::Https => AnyFetcher::Https(HttpsFetcher::new(descriptor, config)?),
            Scheme::Github => AnyFetcher::Github(GithubFetcher::new(descriptor, config)?),
            Scheme::Sftp => AnyFetcher::Sftp(SftpFetcher::with_options(
                descriptor,
                config,
                self.sftp.clone(),
            )?),
        })
    }
}

/// [`FetcherFactory::resolve`] with default transport settings.
pub fn resolve(
    root: impl AsRef<Path>,
    uri: &str,
    refresh: bool,
    cache_only: bool,
) -> Result<AnyFetcher, FetchError> {
    FetcherFactory::default().resolve(root, uri, refresh, cache_only)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_carries_flags() {
        let root = tempfile::tempdir().unwrap();
        let fetcher = resolve(root.path(), "https://host.com/a.json", true, true).unwrap();
        let config = docfetch::Fetcher::config(&fetcher);
        assert!(config.refresh);
        assert!(config.cache_only);
        assert_eq!(config.root, root.path());
        assert_eq!(config.uri, "https://host.com/a.json");
    }

    #[test]
    fn sftp_options_are_passed_through() {
        let options = SftpOptions {
            known_hosts: Some("/tmp/known_hosts".into()),
            identity: None,
        };
        let factory = FetcherFactory::new().with_sftp_options(options.clone());
        assert_eq!(factory.sftp, options);
    }
}
