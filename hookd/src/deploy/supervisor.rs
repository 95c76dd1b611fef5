//! Deploy process supervision
//!
//! Runs the external deploy script as a child process with a bounded
//! environment and wall-clock timeout, captures its output, and releases
//! the deployment lock when the run is over. The run is fire-and-forget
//! relative to the triggering request; outcomes surface in the logs.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::deploy::lock::DeployLock;
use crate::errors::HookError;
use crate::registry::ProjectConfig;
use crate::utils::tail_str;

/// Trailing bytes of stdout kept for failure logging
const STDOUT_TAIL_BYTES: usize = 500;

/// Trailing bytes of stderr kept for failure logging
const STDERR_TAIL_BYTES: usize = 1000;

/// Deploy execution options
#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Root directory the projects live under; working directory of the
    /// deploy script
    pub hosting_dir: PathBuf,

    /// The external deploy script
    pub deploy_script: PathBuf,

    /// Wall-clock bound on a single deploy run
    pub timeout: Duration,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            hosting_dir: PathBuf::from("/srv/hosting"),
            deploy_script: PathBuf::from("/etc/hookd/deploy.sh"),
            timeout: Duration::from_secs(600),
        }
    }
}

/// Supervises at most one deploy subprocess at a time.
///
/// Single-flight is enforced by the lock acquisition in `dispatch`; the
/// spawned task itself trusts its caller.
pub struct Supervisor {
    options: DeployOptions,
    lock: Arc<DeployLock>,
}

enum RunOutcome {
    Success {
        stdout: Vec<u8>,
    },
    Failed {
        code: Option<i32>,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
    },
    TimedOut,
}

impl Supervisor {
    pub fn new(options: DeployOptions, lock: Arc<DeployLock>) -> Self {
        Self { options, lock }
    }

    /// Acquire the lock and launch a supervised deploy run.
    ///
    /// Returns `false` without side effects when the lock is already
    /// held (the caller lost the race between its busy check and this
    /// acquire). On `true` the run continues in a background task and
    /// the lock is released when it finishes, whatever the outcome.
    pub async fn dispatch(
        &self,
        config: Arc<ProjectConfig>,
        branch: String,
    ) -> Result<bool, HookError> {
        if !self.lock.acquire(&config.name, std::process::id()).await? {
            return Ok(false);
        }

        let options = self.options.clone();
        let lock = self.lock.clone();
        tokio::spawn(async move {
            run_deployment(options, lock, config, branch).await;
        });

        Ok(true)
    }
}

async fn run_deployment(
    options: DeployOptions,
    lock: Arc<DeployLock>,
    config: Arc<ProjectConfig>,
    branch: String,
) {
    let start = Instant::now();
    info!("Starting deployment for {}", config.name);

    let outcome = supervise(&options, &lock, &config, &branch).await;
    let duration = start.elapsed();

    match outcome {
        Ok(RunOutcome::Success { stdout }) => {
            info!(
                "Deployment completed for {} in {:.1}s",
                config.name,
                duration.as_secs_f64()
            );
            if !stdout.is_empty() {
                debug!(
                    "[{}] stdout: {}",
                    config.name,
                    tail_str(&stdout, STDOUT_TAIL_BYTES)
                );
            }
        }
        Ok(RunOutcome::Failed {
            code,
            stdout,
            stderr,
        }) => {
            let code = code.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string());
            error!(
                "Deployment failed for {} (exit {}) after {:.1}s:\nSTDOUT: {}\nSTDERR: {}",
                config.name,
                code,
                duration.as_secs_f64(),
                tail_str(&stdout, STDOUT_TAIL_BYTES),
                tail_str(&stderr, STDERR_TAIL_BYTES),
            );
        }
        Ok(RunOutcome::TimedOut) => {
            error!(
                "Deployment timed out for {} after {:.1}s",
                config.name,
                duration.as_secs_f64()
            );
        }
        Err(e) => {
            error!("Deployment error for {}: {}", config.name, e);
        }
    }

    if let Err(e) = lock.release().await {
        error!("Failed to release deployment lock: {}", e);
    }
}

async fn supervise(
    options: &DeployOptions,
    lock: &DeployLock,
    config: &ProjectConfig,
    branch: &str,
) -> Result<RunOutcome, HookError> {
    let project_path = options.hosting_dir.join(&config.path);

    let mut command = Command::new("/bin/bash");
    command
        .arg(&options.deploy_script)
        .current_dir(&options.hosting_dir)
        .env("PROJECT_NAME", &config.name)
        .env("PROJECT_PATH", &project_path)
        // docker compose interprets COMPOSE_FILE itself; pass the
        // reference under a distinct name and keep any inherited value
        // away from the child
        .env("DEPLOY_COMPOSE_FILE", &config.compose_file)
        .env_remove("COMPOSE_FILE")
        .env("COMPOSE_DIR", &config.compose_dir)
        .env("REPOS", config.repos.join(","))
        .env("BRANCH", branch)
        .env("SERVICES", config.services.join(","))
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command
        .spawn()
        .map_err(|e| HookError::DeployError(format!("failed to launch deploy script: {}", e)))?;

    // The lock was created with the daemon's pid before the spawn; point
    // it at the actual deploy subprocess now that one exists.
    if let Some(pid) = child.id() {
        if let Err(e) = lock.update_pid(pid).await {
            warn!("Failed to record deploy pid in lock: {}", e);
        }
    }

    let stdout_task = tokio::spawn(drain(child.stdout.take()));
    let stderr_task = tokio::spawn(drain(child.stderr.take()));

    let status = match tokio::time::timeout(options.timeout, child.wait()).await {
        Ok(status) => status?,
        Err(_) => {
            if let Err(e) = child.kill().await {
                error!("Failed to kill timed-out deploy process: {}", e);
            }
            stdout_task.abort();
            stderr_task.abort();
            return Ok(RunOutcome::TimedOut);
        }
    };

    let stdout = stdout_task.await.unwrap_or_default();
    let stderr = stderr_task.await.unwrap_or_default();

    if status.success() {
        Ok(RunOutcome::Success { stdout })
    } else {
        Ok(RunOutcome::Failed {
            code: status.code(),
            stdout,
            stderr,
        })
    }
}

async fn drain<R: AsyncRead + Unpin>(stream: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        let _ = stream.read_to_end(&mut buf).await;
    }
    buf
}
