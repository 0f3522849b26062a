pub mod cache;
pub mod descriptor;
pub mod fetcher;
pub mod flight;
pub mod local;
pub mod uri;

pub use descriptor::{Credentials, Scheme, SourceDescriptor};
pub use fetcher::{FetchError, FetchErrorKind, Fetcher, FetcherConfig};
pub use local::LocalFetcher;
pub use uri::classify;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
