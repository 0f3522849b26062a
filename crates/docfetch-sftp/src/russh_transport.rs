use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use russh::client::{self, Handle};
use russh_keys::key::PublicKey;
use russh_sftp::client::SftpSession;
use tracing::{debug, warn};

use crate::transport::{SftpTarget, SshTransport, TransportError};

/// Environment variable naming a private key used when the URI carries no password.
pub const SSH_KEY_ENV: &str = "SSH_KEY";

/// Settings for the russh-backed transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SftpOptions {
    /// known_hosts file; defaults to `~/.ssh/known_hosts`.
    pub known_hosts: Option<PathBuf>,
    /// Private key for public-key auth; defaults to `$SSH_KEY`.
    pub identity: Option<PathBuf>,
}

impl SftpOptions {
    fn known_hosts_path(&self) -> Option<PathBuf> {
        self.known_hosts
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(".ssh").join("known_hosts")))
    }

    fn identity_path(&self) -> Option<PathBuf> {
        self.identity
            .clone()
            .or_else(|| std::env::var_os(SSH_KEY_ENV).map(PathBuf::from))
    }
}

/// Host keys loaded in step one. `None` when no known_hosts file exists,
/// in which case every server key is rejected.
#[derive(Debug, Clone)]
pub struct KnownHosts {
    path: Option<PathBuf>,
}

/// Verifies server keys against known_hosts during the handshake.
pub struct HostKeyCheck {
    host: String,
    port: u16,
    known_hosts: Option<PathBuf>,
}

#[async_trait::async_trait]
impl client::Handler for HostKeyCheck {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        let Some(path) = &self.known_hosts else {
            warn!(host = %self.host, "no known_hosts file, rejecting server key");
            return Ok(false);
        };

        match russh_keys::check_known_hosts_path(&self.host, self.port, server_public_key, path)
        {
            Ok(true) => Ok(true),
            Ok(false) => {
                warn!(host = %self.host, port = self.port, "server key not in known_hosts");
                Ok(false)
            }
            Err(e) => {
                warn!(host = %self.host, port = self.port, error = %e, "server key rejected");
                Ok(false)
            }
        }
    }
}

/// SFTP over russh.
#[derive(Debug, Clone, Default)]
pub struct RusshTransport {
    options: SftpOptions,
}

impl RusshTransport {
    pub fn new(options: SftpOptions) -> Self {
        Self { options }
    }
}

#[async_trait::async_trait]
impl SshTransport for RusshTransport {
    type HostKeys = KnownHosts;
    type Session = Handle<HostKeyCheck>;
    type Channel = SftpSession;

    async fn load_host_keys(&self) -> Result<KnownHosts, TransportError> {
        let Some(path) = self.options.known_hosts_path() else {
            return Ok(KnownHosts { path: None });
        };

        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => {
                let entries = contents
                    .lines()
                    .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
                    .count();
                debug!(path = %path.display(), entries, "loaded known_hosts");
                Ok(KnownHosts { path: Some(path) })
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no known_hosts file");
                Ok(KnownHosts { path: None })
            }
            Err(e) => Err(TransportError::new(format!(
                "cannot read {}: {e}",
                path.display()
            ))),
        }
    }

    async fn connect(
        &self,
        target: &SftpTarget,
        host_keys: KnownHosts,
    ) -> Result<Self::Session, TransportError> {
        let username = target
            .username
            .clone()
            .ok_or_else(|| TransportError::new("no username in URI and $USER is not set"))?;

        let handler = HostKeyCheck {
            host: target.host.clone(),
            port: target.port,
            known_hosts: host_keys.path,
        };
        let config = Arc::new(client::Config::default());

        let mut session = client::connect(config, (target.host.as_str(), target.port), handler)
            .await
            .map_err(|e| {
                TransportError::new(format!("{}:{}: {e}", target.host, target.port))
            })?;

        let authenticated = match (&target.password, self.options.identity_path()) {
            (Some(password), _) => session
                .authenticate_password(username.as_str(), password.as_str())
                .await
                .map_err(TransportError::new)?,
            (None, Some(identity)) => {
                let key = russh_keys::load_secret_key(&identity, None).map_err(|e| {
                    TransportError::new(format!("loading key {}: {e}", identity.display()))
                })?;
                session
                    .authenticate_publickey(username.as_str(), Arc::new(key))
                    .await
                    .map_err(TransportError::new)?
            }
            (None, None) => {
                return Err(TransportError::new(format!(
                    "no password in URI and no identity file (set {SSH_KEY_ENV})"
                )));
            }
        };

        if !authenticated {
            return Err(TransportError::new(format!(
                "authentication rejected for {username}"
            )));
        }

        Ok(session)
    }

    async fn open_sftp(&self, session: &mut Self::Session) -> Result<SftpSession, TransportError> {
        let channel = session
            .channel_open_session()
            .await
            .map_err(TransportError::new)?;
        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(TransportError::new)?;

        SftpSession::new(channel.into_stream())
            .await
            .map_err(TransportError::new)
    }

    async fn download(
        &self,
        channel: &mut SftpSession,
        remote_path: &str,
        local: &Path,
    ) -> Result<u64, TransportError> {
        let mut remote = channel
            .open(remote_path)
            .await
            .map_err(|e| TransportError::new(format!("{remote_path}: {e}")))?;
        let mut file = tokio::fs::File::create(local)
            .await
            .map_err(|e| TransportError::new(format!("{}: {e}", local.display())))?;

        let copied = tokio::io::copy(&mut remote, &mut file)
            .await
            .map_err(|e| TransportError::new(format!("{remote_path}: {e}")))?;
        file.sync_all()
            .await
            .map_err(|e| TransportError::new(format!("{}: {e}", local.display())))?;

        Ok(copied)
    }

    async fn disconnect(&self, session: Self::Session, channel: SftpSession) {
        if let Err(e) = channel.close().await {
            debug!(error = %e, "closing SFTP channel");
        }
        if let Err(e) = session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
        {
            debug!(error = %e, "disconnecting");
        }
    }
}
