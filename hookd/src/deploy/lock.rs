//! Deployment lock
//!
//! A single filesystem-visible mutual-exclusion record: the existence of
//! the lock directory means a deployment is in progress. The directory
//! holds three field files (`pid`, `project`, `started`) so status
//! queries and crash recovery work across daemon restarts.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use tracing::debug;

use crate::errors::HookError;
use crate::filesys::dir::Dir;

/// Current state of the deployment lock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockStatus {
    /// No deployment in progress
    Idle,

    /// A deployment is running
    Busy {
        project: String,
        pid: i32,
        started: String,
    },

    /// A lock record exists but its process is gone.
    ///
    /// Reported as not-busy; the record is left on disk for an operator
    /// to clear.
    Stale {
        project: String,
        pid: Option<i32>,
    },
}

/// The global deployment lock
pub struct DeployLock {
    dir: Dir,
    // In-process guard in front of the filesystem record, so two
    // in-process racers are serialized before they reach the disk.
    held: AtomicBool,
}

impl DeployLock {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            dir: Dir::new(path),
            held: AtomicBool::new(false),
        }
    }

    /// Lock record location
    pub fn path(&self) -> &std::path::Path {
        self.dir.path()
    }

    /// Inspect the lock without mutating it.
    ///
    /// A record whose pid is no longer alive is reported as `Stale`, not
    /// removed; only `release` deletes the record.
    pub async fn status(&self) -> LockStatus {
        if !self.dir.exists().await {
            return LockStatus::Idle;
        }

        // A partially written or vanished record reads as idle, matching
        // a deployment that finished between the existence check and the
        // field reads.
        let (pid_raw, project, started) = match self.read_fields().await {
            Ok(fields) => fields,
            Err(_) => return LockStatus::Idle,
        };

        let pid = match pid_raw.trim().parse::<i32>() {
            Ok(pid) => pid,
            Err(_) => {
                debug!("Lock record has unparseable pid: {:?}", pid_raw);
                return LockStatus::Stale {
                    project,
                    pid: None,
                };
            }
        };

        if process_alive(pid) {
            LockStatus::Busy {
                project,
                pid,
                started,
            }
        } else {
            LockStatus::Stale {
                project,
                pid: Some(pid),
            }
        }
    }

    /// Acquire the lock for a project.
    ///
    /// Atomic with respect to concurrent acquire attempts: directory
    /// creation is the create-if-absent primitive, so of two racers
    /// exactly one observes `true`. The other gets `false` and must back
    /// off.
    pub async fn acquire(&self, project: &str, pid: u32) -> Result<bool, HookError> {
        if self
            .held
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(false);
        }

        match self.dir.create_new().await {
            Ok(true) => {}
            Ok(false) => {
                self.held.store(false, Ordering::SeqCst);
                return Ok(false);
            }
            Err(e) => {
                self.held.store(false, Ordering::SeqCst);
                return Err(e);
            }
        }

        if let Err(e) = self.write_fields(project, pid).await {
            let _ = self.dir.delete().await;
            self.held.store(false, Ordering::SeqCst);
            return Err(e);
        }

        Ok(true)
    }

    /// Overwrite the recorded pid once the deploy subprocess is running
    pub async fn update_pid(&self, pid: u32) -> Result<(), HookError> {
        self.dir.file("pid").write_string(&pid.to_string()).await
    }

    /// Remove the lock record unconditionally
    pub async fn release(&self) -> Result<(), HookError> {
        let result = self.dir.delete().await;
        self.held.store(false, Ordering::SeqCst);
        result
    }

    async fn read_fields(&self) -> Result<(String, String, String), HookError> {
        let pid = self.dir.file("pid").read_string().await?;
        let project = self.dir.file("project").read_string().await?;
        let started = self.dir.file("started").read_string().await?;
        Ok((pid, project.trim().to_string(), started.trim().to_string()))
    }

    async fn write_fields(&self, project: &str, pid: u32) -> Result<(), HookError> {
        self.dir.file("pid").write_string(&pid.to_string()).await?;
        self.dir.file("project").write_string(project).await?;
        self.dir
            .file("started")
            .write_string(&Utc::now().to_rfc3339())
            .await
    }
}

/// Zero-cost liveness probe: signal 0 delivers nothing but reports
/// whether the pid exists.
fn process_alive(pid: i32) -> bool {
    kill(Pid::from_raw(pid), None).is_ok()
}
