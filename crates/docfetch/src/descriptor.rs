use std::fmt;

/// Transport family a source belongs to. Decides which fetcher may handle it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Local,
    Https,
    Github,
    Sftp,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Https => "https",
            Self::Github => "github",
            Self::Sftp => "sftp",
        }
    }

    /// Port used when the URI does not name one.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Self::Local => None,
            Self::Https | Self::Github => Some(443),
            Self::Sftp => Some(22),
        }
    }

    /// True for schemes that reach over the network.
    pub fn is_remote(&self) -> bool {
        !matches!(self, Self::Local)
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credentials embedded in a URI as `user[:password]@`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: Option<String>) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// The parsed, typed form of a source URI.
///
/// Built only by [`crate::uri::classify`], so every descriptor that exists has
/// already passed validation: remote schemes always carry a host and a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub(crate) scheme: Scheme,
    pub(crate) host: Option<String>,
    pub(crate) port: Option<u16>,
    pub(crate) credentials: Option<Credentials>,
    pub(crate) path: String,
    pub(crate) query: Option<String>,
    pub(crate) raw: String,
}

impl SourceDescriptor {
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Explicit port, if one other than the scheme default was given.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Port to connect to: the explicit one or the scheme default.
    pub fn effective_port(&self) -> Option<u16> {
        self.port.or_else(|| self.scheme.default_port())
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// The URI exactly as the caller supplied it (trimmed).
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// `host` or `host:port`, the part of the cache key that names the server.
    pub fn authority(&self) -> Option<String> {
        let host = self.host.as_deref()?;
        Some(match self.port {
            Some(port) => format!("{host}:{port}"),
            None => host.to_owned(),
        })
    }

    /// Path plus `?query`, the part of the cache key that names the resource.
    pub fn resource(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        }
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.authority() {
            Some(authority) => write!(f, "{}://{}{}", self.scheme, authority, self.resource()),
            None => write!(f, "{}:{}", self.scheme, self.path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(scheme: Scheme, host: Option<&str>, port: Option<u16>) -> SourceDescriptor {
        SourceDescriptor {
            scheme,
            host: host.map(str::to_owned),
            port,
            credentials: Some(Credentials::new("user", Some("hunter2".into()))),
            path: "/path/to/file.json".into(),
            query: None,
            raw: String::new(),
        }
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let creds = Credentials::new("alice", Some("s3cret".into()));
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("s3cret"));
    }

    #[test]
    fn display_never_includes_credentials() {
        let d = descriptor(Scheme::Sftp, Some("host"), Some(2000));
        let rendered = d.to_string();
        assert_eq!(rendered, "sftp://host:2000/path/to/file.json");
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn effective_port_falls_back_to_scheme_default() {
        assert_eq!(descriptor(Scheme::Sftp, Some("h"), None).effective_port(), Some(22));
        assert_eq!(descriptor(Scheme::Https, Some("h"), None).effective_port(), Some(443));
        assert_eq!(
            descriptor(Scheme::Sftp, Some("h"), Some(2000)).effective_port(),
            Some(2000)
        );
    }

    #[test]
    fn resource_appends_query() {
        let mut d = descriptor(Scheme::Https, Some("h"), None);
        d.query = Some("ref=main".into());
        assert_eq!(d.resource(), "/path/to/file.json?ref=main");
    }

    #[test]
    fn only_local_is_not_remote() {
        assert!(!Scheme::Local.is_remote());
        assert!(Scheme::Https.is_remote());
        assert!(Scheme::Github.is_remote());
        assert!(Scheme::Sftp.is_remote());
    }
}
