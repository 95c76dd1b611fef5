//! hookd - Entry Point
//!
//! Central deployment webhook daemon: receives repository push
//! notifications, matches them against a project registry, and runs the
//! external deploy script for at most one project at a time.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use hookd::app::options::{AppOptions, ServerOptions, DEFAULT_WEBHOOK_SECRET};
use hookd::app::run::run;
use hookd::deploy::supervisor::DeployOptions;
use hookd::logs::{init_logging, LogOptions};
use hookd::storage::layout::StorageLayout;
use hookd::storage::settings::Settings;
use hookd::utils::version_info;

use secrecy::SecretString;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(version) => println!("{}", version),
            Err(e) => eprintln!("Failed to serialize version info: {}", e),
        }
        return;
    }

    // Retrieve the settings file
    let layout = match cli_args.get("base-dir") {
        Some(dir) => StorageLayout::new(dir),
        None => StorageLayout::default(),
    };
    let settings = match Settings::load(&layout.settings_file()).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Unable to read settings file: {}", e);
            return;
        }
    };

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        log_dir: settings.log_dir.clone(),
        ..Default::default()
    };
    if let Err(e) = init_logging(log_options) {
        println!("Failed to initialize logging: {e}");
    }

    // Environment overrides
    let port = env::var("PORT")
        .ok()
        .and_then(|port| port.parse().ok())
        .unwrap_or(settings.port);
    let hosting_dir = env::var("HOSTING_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| settings.hosting_dir.clone());
    let secret = match env::var("WEBHOOK_SECRET") {
        Ok(secret) => SecretString::from(secret),
        Err(_) => {
            warn!("WEBHOOK_SECRET not set, using the insecure default; set it in production");
            SecretString::from(DEFAULT_WEBHOOK_SECRET.to_string())
        }
    };

    let options = AppOptions {
        server: ServerOptions {
            host: settings.host.clone(),
            port,
        },
        config_dir: settings
            .config_dir
            .clone()
            .unwrap_or_else(|| layout.projects_dir().path().to_path_buf()),
        lock_dir: settings.lock_dir.clone(),
        deploy: DeployOptions {
            hosting_dir,
            deploy_script: settings
                .deploy_script
                .clone()
                .unwrap_or_else(|| layout.deploy_script()),
            timeout: Duration::from_secs(settings.deploy_timeout_secs),
        },
        secret,
        ..Default::default()
    };

    info!("Starting webhook server");
    let result = run(options, await_shutdown_signal()).await;
    if let Err(e) = result {
        error!("Failed to run hookd: {e}");
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl+C received, shutting down...");
        }
    }
}
