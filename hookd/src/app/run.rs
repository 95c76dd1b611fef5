//! Main application run loop

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::app::options::{AppOptions, LifecycleOptions};
use crate::deploy::coordinator::Coordinator;
use crate::deploy::lock::DeployLock;
use crate::deploy::supervisor::Supervisor;
use crate::errors::HookError;
use crate::filesys::dir::Dir;
use crate::registry::Registry;
use crate::server::serve::serve;
use crate::server::state::ServerState;

/// Run the hookd daemon
pub async fn run(
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), HookError> {
    info!("Initializing hookd...");

    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);
    let mut shutdown_manager =
        ShutdownManager::new(shutdown_tx.clone(), options.lifecycle.clone());

    let AppOptions {
        server: server_options,
        config_dir,
        lock_dir,
        deploy,
        secret,
        ..
    } = options;

    let registry = Arc::new(Registry::load(Dir::new(&config_dir)).await?);
    let lock = Arc::new(DeployLock::new(&lock_dir));
    let supervisor = Supervisor::new(deploy.clone(), lock.clone());
    let coordinator = Coordinator::new(registry.clone(), lock.clone(), supervisor);

    info!("Hosting directory: {}", deploy.hosting_dir.display());
    info!(
        "Projects configured: {:?}",
        registry.snapshot().await.project_names()
    );

    let state = Arc::new(ServerState::new(registry, lock, coordinator, secret));

    let mut server_shutdown_rx = shutdown_tx.subscribe();
    let server_handle = serve(&server_options, state, async move {
        let _ = server_shutdown_rx.recv().await;
    })
    .await?;
    shutdown_manager.with_server_handle(server_handle)?;

    shutdown_signal.await;
    info!("Shutdown signal received, shutting down...");

    drop(shutdown_tx);
    shutdown_manager.shutdown().await
}

// ================================= SHUTDOWN ===================================== //

struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
    lifecycle_options: LifecycleOptions,
    server_handle: Option<JoinHandle<Result<(), HookError>>>,
}

impl ShutdownManager {
    pub fn new(shutdown_tx: broadcast::Sender<()>, lifecycle_options: LifecycleOptions) -> Self {
        Self {
            shutdown_tx,
            lifecycle_options,
            server_handle: None,
        }
    }

    pub fn with_server_handle(
        &mut self,
        handle: JoinHandle<Result<(), HookError>>,
    ) -> Result<(), HookError> {
        if self.server_handle.is_some() {
            return Err(HookError::ShutdownError(
                "server_handle already set".to_string(),
            ));
        }
        self.server_handle = Some(handle);
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), HookError> {
        let _ = self.shutdown_tx.send(());

        match tokio::time::timeout(
            self.lifecycle_options.max_shutdown_delay,
            self.shutdown_impl(),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                error!(
                    "Shutdown timed out after {:?}, forcing shutdown...",
                    self.lifecycle_options.max_shutdown_delay
                );
                std::process::exit(1);
            }
        }
    }

    async fn shutdown_impl(&mut self) -> Result<(), HookError> {
        info!("Shutting down hookd...");

        if let Some(handle) = self.server_handle.take() {
            handle
                .await
                .map_err(|e| HookError::ShutdownError(e.to_string()))??;
        }

        info!("Shutdown complete");
        Ok(())
    }
}
