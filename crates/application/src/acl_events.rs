use std::sync::Arc;

use async_trait::async_trait;
use schemabridge_core::AppResult;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error};

use crate::AccessSyncService;

/// Change announced by the ACL store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AclChangeEvent {
    /// Permission grants were saved.
    PermissionsSaved,
    /// A user was added to a role.
    UserAdded {
        /// User email.
        email: String,
        /// Role the user joined.
        role: String,
    },
    /// A user was removed.
    UserDeleted {
        /// User email.
        email: String,
    },
    /// A user moved to another role.
    RoleChanged {
        /// User email.
        email: String,
        /// Role the user moved to.
        new_role: String,
    },
}

/// Subscriber notified after the ACL store changed.
#[async_trait]
pub trait AclChangeListener: Send + Sync {
    /// Listener name used in logs.
    fn name(&self) -> &str;

    /// Handles one change.
    async fn on_change(&self, event: &AclChangeEvent) -> AppResult<()>;
}

/// Explicit registry of ACL change subscribers.
///
/// A failing listener is logged and reported but never fails the publisher.
#[derive(Clone, Default)]
pub struct AclEventHub {
    listeners: Arc<RwLock<Vec<Arc<dyn AclChangeListener>>>>,
}

impl AclEventHub {
    /// Registers a listener.
    pub async fn subscribe(&self, listener: Arc<dyn AclChangeListener>) {
        self.listeners.write().await.push(listener);
    }

    /// Notifies every listener in subscription order and returns the failures.
    pub async fn publish(&self, event: &AclChangeEvent) -> Vec<String> {
        let listeners = self.listeners.read().await.clone();
        let mut failures = Vec::new();

        for listener in listeners {
            debug!(listener = %listener.name(), ?event, "dispatching acl change");
            if let Err(failure) = listener.on_change(event).await {
                error!(listener = %listener.name(), error = %failure, "acl change listener failed");
                failures.push(format!("{}: {failure}", listener.name()));
            }
        }

        failures
    }
}

/// Re-runs the access sync whenever the ACL store changes.
#[derive(Clone)]
pub struct AccessSyncListener {
    service: AccessSyncService,
}

impl AccessSyncListener {
    /// Creates a listener around an access sync service.
    #[must_use]
    pub fn new(service: AccessSyncService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl AclChangeListener for AccessSyncListener {
    fn name(&self) -> &str {
        "access-sync"
    }

    async fn on_change(&self, _event: &AclChangeEvent) -> AppResult<()> {
        self.service.sync().await.map(|_| ())
    }
}
