use std::fmt;
use std::path::Path;

/// Failure of a single SSH or SFTP step, rendered as text.
///
/// Transport libraries' own error types stop here.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(String);

impl TransportError {
    pub fn new(message: impl fmt::Display) -> Self {
        Self(message.to_string())
    }
}

/// Where and as whom to connect.
#[derive(Clone, PartialEq, Eq)]
pub struct SftpTarget {
    /// Host name or address, without IPv6 brackets.
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for SftpTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SftpTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// The four steps of an SFTP download.
///
/// [`SftpFetcher`](crate::SftpFetcher) drives them in order and stops at the
/// first failure. Each step is its own method so a failure can be attributed
/// to the step that caused it.
#[async_trait::async_trait]
pub trait SshTransport: Send + Sync {
    type HostKeys: Send;
    type Session: Send;
    type Channel: Send;

    /// Load the host keys the server's key is checked against.
    async fn load_host_keys(&self) -> Result<Self::HostKeys, TransportError>;

    /// Open and authenticate a connection.
    async fn connect(
        &self,
        target: &SftpTarget,
        host_keys: Self::HostKeys,
    ) -> Result<Self::Session, TransportError>;

    /// Start the SFTP subsystem on an open connection.
    async fn open_sftp(&self, session: &mut Self::Session)
    -> Result<Self::Channel, TransportError>;

    /// Copy `remote_path` into the local file `local`. Returns bytes copied.
    async fn download(
        &self,
        channel: &mut Self::Channel,
        remote_path: &str,
        local: &Path,
    ) -> Result<u64, TransportError>;

    /// Best-effort shutdown once the transfer is over.
    async fn disconnect(&self, _session: Self::Session, _channel: Self::Channel) {}
}
