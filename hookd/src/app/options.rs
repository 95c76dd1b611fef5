//! Application configuration options

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::deploy::supervisor::DeployOptions;
use crate::storage::layout::StorageLayout;

/// Insecure placeholder secret; must be overridden in production via the
/// `WEBHOOK_SECRET` environment variable.
pub const DEFAULT_WEBHOOK_SECRET: &str = "change-me-in-production";

/// Main application options
#[derive(Debug)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Server configuration
    pub server: ServerOptions,

    /// Project config documents directory
    pub config_dir: PathBuf,

    /// Deployment lock location
    pub lock_dir: PathBuf,

    /// Deploy execution options
    pub deploy: DeployOptions,

    /// Shared webhook secret
    pub secret: SecretString,
}

impl Default for AppOptions {
    fn default() -> Self {
        let layout = StorageLayout::default();
        Self {
            lifecycle: LifecycleOptions::default(),
            server: ServerOptions::default(),
            config_dir: layout.projects_dir().path().to_path_buf(),
            lock_dir: PathBuf::from("/tmp/hookd_deploy.lock"),
            deploy: DeployOptions::default(),
            secret: SecretString::from(DEFAULT_WEBHOOK_SECRET.to_string()),
        }
    }
}

/// Lifecycle options for the daemon
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9000,
        }
    }
}
