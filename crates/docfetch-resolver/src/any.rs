use std::path::Path;

use docfetch::{FetchError, Fetcher, FetcherConfig, LocalFetcher, Scheme, SourceDescriptor};
use docfetch_https::{GithubFetcher, HttpsFetcher};
use docfetch_sftp::SftpFetcher;

/// One fetcher per supported scheme.
pub enum AnyFetcher {
    Local(LocalFetcher),
    Https(HttpsFetcher),
    Github(GithubFetcher),
    Sftp(SftpFetcher),
}

impl AnyFetcher {
    pub fn scheme(&self) -> Scheme {
        match self {
            Self::Local(_) => Scheme::Local,
            Self::Https(_) => Scheme::Https,
            Self::Github(_) => Scheme::Github,
            Self::Sftp(_) => Scheme::Sftp,
        }
    }

    fn inner(&self) -> &dyn Fetcher {
        match self {
            Self::Local(f) => f,
            Self::Https(f) => f,
            Self::Github(f) => f,
            Self::Sftp(f) => f,
        }
    }
}

impl std::fmt::Debug for AnyFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnyFetcher")
            .field("scheme", &self.scheme())
            .field("source", &self.descriptor().to_string())
            .field("cache_path", &self.cache_path())
            .finish()
    }
}

#[async_trait::async_trait]
impl Fetcher for AnyFetcher {
    fn descriptor(&self) -> &SourceDescriptor {
        self.inner().descriptor()
    }

    fn config(&self) -> &FetcherConfig {
        self.inner().config()
    }

    fn cache_path(&self) -> &Path {
        self.inner().cache_path()
    }

    async fn retrieve(&self, staging: &Path) -> Result<(), FetchError> {
        self.inner().retrieve(staging).await
    }
}
