//! Deployment coordinator
//!
//! Resolves an inbound push event to a project, filters on branch,
//! checks the global deployment lock, and hands off to the supervisor.
//! The caller gets an answer immediately; the deploy itself runs in the
//! background.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use crate::deploy::lock::{DeployLock, LockStatus};
use crate::deploy::supervisor::Supervisor;
use crate::errors::HookError;
use crate::registry::Registry;

const REF_PREFIX: &str = "refs/heads/";

/// Push notification payload, parsed leniently: missing fields fall back
/// to placeholders and a malformed body reads as an empty event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushEvent {
    #[serde(default, rename = "ref")]
    pub git_ref: String,

    #[serde(default)]
    pub repository: RepositoryInfo,

    #[serde(default)]
    pub pusher: PusherInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryInfo {
    #[serde(default = "unknown")]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PusherInfo {
    #[serde(default = "unknown")]
    pub name: String,
}

fn unknown() -> String {
    "unknown".to_string()
}

impl Default for RepositoryInfo {
    fn default() -> Self {
        Self { name: unknown() }
    }
}

impl Default for PusherInfo {
    fn default() -> Self {
        Self { name: unknown() }
    }
}

impl PushEvent {
    /// Parse a raw request body; any parse failure yields an empty event
    pub fn from_body(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    /// Branch name derived from the ref.
    ///
    /// A ref without the branch prefix yields an empty branch, which
    /// matches no configured branch.
    pub fn branch(&self) -> &str {
        self.git_ref.strip_prefix(REF_PREFIX).unwrap_or("")
    }
}

/// Outcome of a deploy trigger
#[derive(Debug)]
pub enum TriggerOutcome {
    /// The repository maps to no project; an expected, harmless event
    NotConfigured { repo: String },

    /// The pushed branch is outside the project's allowed set
    BranchNotConfigured { branch: String },

    /// A deployment is already in progress
    Busy { status: LockStatus },

    /// A supervised run was started; this says nothing about its success
    Accepted {
        project: String,
        repo: String,
        branch: String,
        triggered_by: String,
    },
}

/// Deployment coordinator
pub struct Coordinator {
    registry: Arc<Registry>,
    lock: Arc<DeployLock>,
    supervisor: Supervisor,
}

impl Coordinator {
    pub fn new(registry: Arc<Registry>, lock: Arc<DeployLock>, supervisor: Supervisor) -> Self {
        Self {
            registry,
            lock,
            supervisor,
        }
    }

    /// Handle a push event: resolve, filter, check the lock, dispatch.
    pub async fn trigger(&self, event: &PushEvent) -> Result<TriggerOutcome, HookError> {
        let repo = event.repository.name.as_str();
        let branch = event.branch();

        info!(
            "Webhook received: {} on {} by {}",
            repo, branch, event.pusher.name
        );

        let snapshot = self.registry.snapshot().await;
        let Some(config) = snapshot.lookup(repo) else {
            info!("Repository {} not configured for deployment", repo);
            return Ok(TriggerOutcome::NotConfigured {
                repo: repo.to_string(),
            });
        };

        if !config.branch.contains(branch) {
            info!(
                "Ignoring push to {} (allowed: {:?})",
                branch,
                config.branch.names()
            );
            return Ok(TriggerOutcome::BranchNotConfigured {
                branch: branch.to_string(),
            });
        }

        // The lock is global: one deployment system-wide, whichever
        // project it is for.
        let status = self.lock.status().await;
        if let LockStatus::Busy { .. } = status {
            warn!("Deployment already in progress");
            return Ok(TriggerOutcome::Busy { status });
        }

        let project = config.name.clone();
        if !self
            .supervisor
            .dispatch(config, branch.to_string())
            .await?
        {
            // Lost the window between the busy check and the atomic
            // acquire; answer as busy with whatever holds the lock now.
            warn!("Deployment already in progress");
            return Ok(TriggerOutcome::Busy {
                status: self.lock.status().await,
            });
        }

        Ok(TriggerOutcome::Accepted {
            project,
            repo: repo.to_string(),
            branch: branch.to_string(),
            triggered_by: event.pusher.name.clone(),
        })
    }
}
