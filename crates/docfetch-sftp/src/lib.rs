pub mod fetcher;
pub mod russh_transport;
pub mod transport;

pub use fetcher::SftpFetcher;
pub use russh_transport::{RusshTransport, SftpOptions};
pub use transport::{SftpTarget, SshTransport, TransportError};
