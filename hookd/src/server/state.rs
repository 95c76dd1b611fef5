//! Server state

use std::sync::Arc;

use secrecy::SecretString;

use crate::deploy::coordinator::Coordinator;
use crate::deploy::lock::DeployLock;
use crate::registry::Registry;

/// Server state shared across handlers
pub struct ServerState {
    pub registry: Arc<Registry>,
    pub lock: Arc<DeployLock>,
    pub coordinator: Coordinator,
    pub secret: SecretString,
}

impl ServerState {
    pub fn new(
        registry: Arc<Registry>,
        lock: Arc<DeployLock>,
        coordinator: Coordinator,
        secret: SecretString,
    ) -> Self {
        Self {
            registry,
            lock,
            coordinator,
            secret,
        }
    }
}
