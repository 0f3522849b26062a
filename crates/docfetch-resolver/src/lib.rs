pub mod any;
pub mod factory;

pub use any::AnyFetcher;
pub use factory::{FetcherFactory, resolve};
