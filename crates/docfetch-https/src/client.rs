use std::path::Path;

use docfetch::FetchError;
use tracing::debug;

const USER_AGENT: &str = "docfetch";

/// How a request authenticates.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    Anonymous,
    Basic {
        username: String,
        password: Option<String>,
    },
    Bearer(String),
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::Basic { username, .. } => write!(f, "Basic({username}, <redacted>)"),
            Self::Bearer(_) => f.write_str("Bearer(<redacted>)"),
        }
    }
}

/// Issue a single GET for `url` and write the body to `staging`.
///
/// `label` names the source in errors; it must not contain credentials.
pub async fn download(
    client: &reqwest::Client,
    url: &str,
    auth: &Auth,
    label: &str,
    staging: &Path,
) -> Result<(), FetchError> {
    let mut req = client.get(url).header("User-Agent", USER_AGENT);

    req = match auth {
        Auth::Anonymous => req,
        Auth::Basic { username, password } => req.basic_auth(username, password.as_ref()),
        Auth::Bearer(token) => req.bearer_auth(token),
    };

    debug!(source = label, auth = ?auth, "sending GET");

    let response = req
        .send()
        .await
        .map_err(|e| FetchError::remote(label, format!("request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::status(
            label,
            status.as_u16(),
            format!("HTTP {status}"),
        ));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| FetchError::remote(label, format!("failed to read response body: {e}")))?;

    tokio::fs::write(staging, &bytes)
        .await
        .map_err(|e| FetchError::io(staging, e))
}
