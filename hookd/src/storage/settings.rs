//! Settings file management

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::HookError;
use crate::filesys::file::File;
use crate::logs::LogLevel;

/// Daemon settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Root directory the hosted projects live under
    #[serde(default = "default_hosting_dir")]
    pub hosting_dir: PathBuf,

    /// Deployment lock location
    #[serde(default = "default_lock_dir")]
    pub lock_dir: PathBuf,

    /// Directory for the persistent log file; absent disables it
    #[serde(default = "default_log_dir")]
    pub log_dir: Option<PathBuf>,

    /// Project config documents directory; defaults to `projects/` under
    /// the storage base
    #[serde(default)]
    pub config_dir: Option<PathBuf>,

    /// Deploy script; defaults to `deploy.sh` under the storage base
    #[serde(default)]
    pub deploy_script: Option<PathBuf>,

    /// Wall-clock bound on a single deploy run, in seconds
    #[serde(default = "default_deploy_timeout")]
    pub deploy_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9000
}

fn default_hosting_dir() -> PathBuf {
    PathBuf::from("/srv/hosting")
}

fn default_lock_dir() -> PathBuf {
    PathBuf::from("/tmp/hookd_deploy.lock")
}

fn default_log_dir() -> Option<PathBuf> {
    Some(PathBuf::from("/var/log/hookd"))
}

fn default_deploy_timeout() -> u64 {
    600
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            host: default_host(),
            port: default_port(),
            hosting_dir: default_hosting_dir(),
            lock_dir: default_lock_dir(),
            log_dir: default_log_dir(),
            config_dir: None,
            deploy_script: None,
            deploy_timeout_secs: default_deploy_timeout(),
        }
    }
}

impl Settings {
    /// Read settings from the given file, falling back to defaults when
    /// the file does not exist
    pub async fn load(file: &File) -> Result<Self, HookError> {
        if !file.exists().await {
            return Ok(Self::default());
        }
        file.read_json().await
    }
}
