use std::path::{Path, PathBuf};

use docfetch::{FetchError, Fetcher, FetcherConfig, Scheme, SourceDescriptor, cache};

use crate::client::{self, Auth};

/// Fetches a document over HTTPS with a single GET.
///
/// Credentials embedded in the URI are sent as HTTP basic auth.
pub struct HttpsFetcher {
    descriptor: SourceDescriptor,
    config: FetcherConfig,
    cache_path: PathBuf,
    client: reqwest::Client,
    endpoint: Option<String>,
}

impl HttpsFetcher {
    /// Build the fetcher and create its cache directories.
    pub fn new(descriptor: SourceDescriptor, config: FetcherConfig) -> Result<Self, FetchError> {
        if descriptor.scheme() != Scheme::Https {
            return Err(FetchError::invalid(
                descriptor.raw(),
                format!("{} source given to the HTTPS fetcher", descriptor.scheme()),
            ));
        }

        let cache_path = cache::entry_path(&config.root, &descriptor)?;
        let fetcher = Self {
            descriptor,
            config,
            cache_path,
            client: reqwest::Client::new(),
            endpoint: None,
        };
        fetcher.ensure_cache_dir()?;
        Ok(fetcher)
    }

    /// Send requests to `endpoint` (scheme and authority, e.g. a mirror)
    /// instead of the host named in the URI. The cache entry is unchanged.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// The URL the request is sent to.
    pub fn request_url(&self) -> String {
        let base = match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_owned(),
            None => format!(
                "https://{}",
                self.descriptor.authority().unwrap_or_default()
            ),
        };
        format!("{base}{}", self.descriptor.resource())
    }

    fn auth(&self) -> Auth {
        match self.descriptor.credentials() {
            Some(creds) => Auth::Basic {
                username: creds.username.clone(),
                password: creds.password.clone(),
            },
            None => Auth::Anonymous,
        }
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpsFetcher {
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
        client::download(
            &self.client,
            &self.request_url(),
            &self.auth(),
            &self.descriptor.to_string(),
            staging,
        )
        .await
    }
}
