use std::path::{Path, PathBuf};

use docfetch::{FetchError, Fetcher, FetcherConfig, Scheme, SourceDescriptor, cache};

use crate::client::{self, Auth};

/// Where raw file contents are served from.
pub const RAW_CONTENT_BASE: &str = "https://raw.githubusercontent.com";

const RAW_CONTENT_HOST: &str = "raw.githubusercontent.com";

/// Fetches files hosted on GitHub.
///
/// Browser URLs of the form `github.com/<owner>/<repo>/blob/<ref>/<path>`
/// are rewritten to the raw-content host before the request is made. The
/// cache entry stays keyed on the URI as given.
pub struct GithubFetcher {
    descriptor: SourceDescriptor,
    config: FetcherConfig,
    cache_path: PathBuf,
    client: reqwest::Client,
    raw_base: Option<String>,
}

impl GithubFetcher {
    /// Build the fetcher and create its cache directories.
    pub fn new(descriptor: SourceDescriptor, config: FetcherConfig) -> Result<Self, FetchError> {
        if descriptor.scheme() != Scheme::Github {
            return Err(FetchError::invalid(
                descriptor.raw(),
                format!("{} source given to the GitHub fetcher", descriptor.scheme()),
            ));
        }

        let cache_path = cache::entry_path(&config.root, &descriptor)?;
        let fetcher = Self {
            descriptor,
            config,
            cache_path,
            client: reqwest::Client::new(),
            raw_base: None,
        };
        fetcher.ensure_cache_dir()?;
        Ok(fetcher)
    }

    /// Serve raw content from `base` instead of [`RAW_CONTENT_BASE`]
    /// (GitHub Enterprise, mirrors).
    pub fn with_raw_base(mut self, base: impl Into<String>) -> Self {
        self.raw_base = Some(base.into());
        self
    }

    fn raw_base(&self) -> &str {
        self.raw_base
            .as_deref()
            .unwrap_or(RAW_CONTENT_BASE)
            .trim_end_matches('/')
    }

    /// The URL the request is sent to, after raw-content rewriting.
    pub fn request_url(&self) -> String {
        let query = self
            .descriptor
            .query()
            .map(|q| format!("?{q}"))
            .unwrap_or_default();

        match raw_content_path(&self.descriptor) {
            Some(path) => format!("{}{path}{query}", self.raw_base()),
            None => format!(
                "https://{}{}",
                self.descriptor.authority().unwrap_or_default(),
                self.descriptor.resource()
            ),
        }
    }

    /// Credentials go out as a bearer token: the password if given, else the username.
    fn auth(&self) -> Auth {
        match self.descriptor.credentials() {
            Some(creds) => Auth::Bearer(
                creds
                    .password
                    .clone()
                    .unwrap_or_else(|| creds.username.clone()),
            ),
            None => Auth::Anonymous,
        }
    }
}

/// Path on the raw-content host for a descriptor, if it has one.
///
/// `github.com/<owner>/<repo>/(blob|raw)/<ref>/<path>` becomes
/// `/<owner>/<repo>/<ref>/<path>`; raw-content URIs keep their path.
fn raw_content_path(descriptor: &SourceDescriptor) -> Option<String> {
    if descriptor.host() == Some(RAW_CONTENT_HOST) {
        return Some(descriptor.path().to_owned());
    }

    let segments: Vec<&str> = descriptor.path().trim_start_matches('/').split('/').collect();
    match segments.as_slice() {
        [owner, repo, "blob" | "raw", git_ref, rest @ ..] if !rest.is_empty() => {
            Some(format!("/{owner}/{repo}/{git_ref}/{}", rest.join("/")))
        }
        _ => None,
    }
}

#[async_trait::async_trait]
impl Fetcher for GithubFetcher {
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
