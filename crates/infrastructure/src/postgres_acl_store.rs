//! PostgreSQL-backed ACL store.

use async_trait::async_trait;
use schemabridge_application::AclStore;
use schemabridge_core::{AppError, AppResult};
use schemabridge_domain::{PermissionGrant, Role};
use sqlx::PgPool;

/// Reads roles and permission grants from the ACL tables.
#[derive(Clone)]
pub struct PostgresAclStore {
    pool: PgPool,
}

impl PostgresAclStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RoleRow {
    role: String,
    emails: Vec<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct GrantRow {
    user_key: String,
    resource_key: String,
}

#[async_trait]
impl AclStore for PostgresAclStore {
    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT role::TEXT AS role, array_agg(email::TEXT ORDER BY email) AS emails
            FROM acl_user
            GROUP BY role
            ORDER BY role
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list acl roles: {error}")))?;

        rows.into_iter()
            .map(|row| Role::new(row.role, row.emails))
            .collect()
    }

    async fn list_permission_grants(&self) -> AppResult<Vec<PermissionGrant>> {
        let rows = sqlx::query_as::<_, GrantRow>(
            r#"
            SELECT user_key::TEXT AS user_key, resource_key::TEXT AS resource_key
            FROM acl_permission
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list acl permissions: {error}"))
        })?;

        Ok(rows
            .into_iter()
            .map(|row| PermissionGrant {
                subject_key: row.user_key,
                resource_key: row.resource_key,
            })
            .collect())
    }
}
