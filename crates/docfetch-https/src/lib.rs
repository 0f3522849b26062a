pub mod client;
pub mod github;
pub mod https;

pub use client::Auth;
pub use github::{GithubFetcher, RAW_CONTENT_BASE};
pub use https::HttpsFetcher;
