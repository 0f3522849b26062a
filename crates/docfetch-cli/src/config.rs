use std::path::{Path, PathBuf};

use docfetch_sftp::SftpOptions;
use serde::{Deserialize, Serialize};

/// Top-level application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AppConfig {
    /// Cache root used when `--root` is not given.
    pub root: Option<PathBuf>,
    #[serde(default)]
    pub sftp: SftpSection,
}

/// `[sftp]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SftpSection {
    pub known_hosts: Option<PathBuf>,
    pub identity: Option<PathBuf>,
}

impl AppConfig {
    pub fn sftp_options(&self) -> SftpOptions {
        SftpOptions {
            known_hosts: self.sftp.known_hosts.clone(),
            identity: self.sftp.identity.clone(),
        }
    }
}

/// Config file path: `~/.config/docfetch/config.toml`
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("docfetch").join("config.toml"))
}

/// Load config from file, falling back to defaults if missing.
pub fn load_config() -> AppConfig {
    match config_path() {
        Some(path) => load_from(&path),
        None => AppConfig::default(),
    }
}

fn load_from(path: &Path) -> AppConfig {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return AppConfig::default();
    };

    match toml::from_str::<AppConfig>(&contents) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to parse config, using defaults"
            );
            AppConfig::default()
        }
    }
}
