use std::sync::Arc;

use schemabridge_core::{AppError, AppResult};
use schemabridge_domain::{ADMINISTRATORS_GROUP, ALL_USERS_GROUP, DatabaseConnection};
use tracing::info;
use uuid::Uuid;

use crate::{AdminUserRecord, DatabaseRecord, MetabaseMetadataStore, PasswordHasher};

#[cfg(test)]
mod tests;

/// Administrator and connections to seed into a fresh target installation.
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapInput {
    /// Administrator login.
    pub admin_email: String,
    /// Administrator given name.
    pub admin_first_name: String,
    /// Administrator family name.
    pub admin_last_name: String,
    /// Administrator plain-text password.
    pub admin_password: String,
    /// Named database connections in id order.
    pub databases: Vec<(String, DatabaseConnection)>,
    /// Settings written by key.
    pub settings: Vec<(String, String)>,
}

/// Settings that skip the target's first-run wizard.
#[must_use]
pub fn default_settings(admin_email: &str, report_timezone: &str) -> Vec<(String, String)> {
    [
        ("anon-tracking-enabled", "false"),
        ("admin-email", admin_email),
        ("enable-nested-queries", "false"),
        ("enable-public-sharing", "false"),
        ("enable-query-caching", "false"),
        ("enable-xrays", "false"),
        ("report-timezone", report_timezone),
        ("humanization-strategy", "none"),
        ("show-homepage-data", "false"),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_owned(), value.to_owned()))
    .collect()
}

/// Seeds the target's metadata database directly before first start.
#[derive(Clone)]
pub struct BootstrapService {
    store: Arc<dyn MetabaseMetadataStore>,
    password_hasher: Arc<dyn PasswordHasher>,
}

impl BootstrapService {
    /// Creates a new bootstrap service.
    #[must_use]
    pub fn new(
        store: Arc<dyn MetabaseMetadataStore>,
        password_hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            store,
            password_hasher,
        }
    }

    /// Upserts the administrator, the database connections and the settings.
    pub async fn setup(&self, input: &BootstrapInput) -> AppResult<()> {
        if input.admin_password.is_empty() {
            return Err(AppError::Validation(
                "administrator password must not be empty".to_owned(),
            ));
        }

        self.upsert_admin(input).await?;
        self.write_databases(&input.databases).await?;

        info!(count = input.settings.len(), "writing settings");
        self.store.upsert_settings(&input.settings).await?;
        self.store.delete_setup_token().await?;
        Ok(())
    }

    async fn upsert_admin(&self, input: &BootstrapInput) -> AppResult<()> {
        let password_salt = Uuid::new_v4().to_string();
        let password_hash = self
            .password_hasher
            .hash_password(&format!("{password_salt}{}", input.admin_password))?;

        info!(email = %input.admin_email, "upserting administrator");
        self.store
            .upsert_user(&AdminUserRecord {
                email: input.admin_email.clone(),
                first_name: input.admin_first_name.clone(),
                last_name: input.admin_last_name.clone(),
                password_hash,
                password_salt,
                is_superuser: true,
            })
            .await?;
        self.store
            .add_group_memberships(
                &input.admin_email,
                &[ADMINISTRATORS_GROUP.to_owned(), ALL_USERS_GROUP.to_owned()],
            )
            .await
    }

    /// Rewrites rows in place when the count is unchanged so ids stay stable;
    /// otherwise truncates and reinserts.
    async fn write_databases(&self, databases: &[(String, DatabaseConnection)]) -> AppResult<()> {
        let records: Vec<DatabaseRecord> = databases
            .iter()
            .map(|(name, connection)| DatabaseRecord {
                name: name.clone(),
                engine: connection.engine().to_owned(),
                details: connection.details(),
            })
            .collect();
        let existing = self.store.list_databases().await?;

        if existing.len() != records.len() {
            info!(
                existing = existing.len(),
                configured = records.len(),
                "replacing database connections"
            );
            return self.store.replace_databases(&records).await;
        }

        for (current, record) in existing.iter().zip(&records) {
            info!(id = current.id, name = %record.name, "updating database connection");
            self.store.update_database(current.id, record).await?;
        }
        Ok(())
    }
}
