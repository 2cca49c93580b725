//! ACL change notifications delivered through PostgreSQL `LISTEN`/`NOTIFY`.

use schemabridge_application::{AclChangeEvent, AclEventHub};
use schemabridge_core::{AppError, AppResult};
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use tracing::{info, warn};

/// Forwards JSON notifications on one channel to an [`AclEventHub`].
#[derive(Clone)]
pub struct PostgresAclChangeFeed {
    pool: PgPool,
    channel: String,
}

impl PostgresAclChangeFeed {
    /// Creates a feed listening on `channel`.
    #[must_use]
    pub fn new(pool: PgPool, channel: impl Into<String>) -> Self {
        Self {
            pool,
            channel: channel.into(),
        }
    }

    /// Listens until the connection fails; undecodable payloads are skipped.
    pub async fn run(&self, hub: &AclEventHub) -> AppResult<()> {
        let mut listener = PgListener::connect_with(&self.pool)
            .await
            .map_err(|error| AppError::Transport(format!("failed to open acl listener: {error}")))?;
        listener.listen(&self.channel).await.map_err(|error| {
            AppError::Transport(format!(
                "failed to listen on channel '{}': {error}",
                self.channel
            ))
        })?;
        info!(channel = %self.channel, "listening for acl changes");

        loop {
            let notification = listener.recv().await.map_err(|error| {
                AppError::Transport(format!("acl listener connection lost: {error}"))
            })?;

            let Some(event) = decode_notification(notification.payload()) else {
                continue;
            };
            let failures = hub.publish(&event).await;
            if !failures.is_empty() {
                warn!(failed = failures.len(), "acl change handled with failures");
            }
        }
    }
}

fn decode_notification(payload: &str) -> Option<AclChangeEvent> {
    match serde_json::from_str(payload) {
        Ok(event) => Some(event),
        Err(error) => {
            warn!(payload, error = %error, "skipping undecodable acl notification");
            None
        }
    }
}
