//! Direct writes into the target system's PostgreSQL metadata database.

use async_trait::async_trait;
use schemabridge_application::{
    AdminUserRecord, DatabaseRecord, ExistingDatabase, MetabaseMetadataStore,
};
use schemabridge_core::{AppError, AppResult};
use sqlx::PgPool;

/// PostgreSQL implementation of the metadata store port.
///
/// Each statement runs in its own implicit transaction.
#[derive(Clone)]
pub struct PostgresMetabaseMetadataStore {
    pool: PgPool,
}

impl PostgresMetabaseMetadataStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_database(&self, database: &DatabaseRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO metabase_database (created_at, updated_at, name, details, engine, is_sample)
            VALUES (current_timestamp, current_timestamp, $1, $2, $3, false)
            "#,
        )
        .bind(database.name.as_str())
        .bind(database.details.to_string())
        .bind(database.engine.as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to insert database '{}': {error}",
                database.name
            ))
        })?;

        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DatabaseRow {
    id: i64,
    name: String,
}

#[async_trait]
impl MetabaseMetadataStore for PostgresMetabaseMetadataStore {
    async fn upsert_user(&self, user: &AdminUserRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO core_user (email, first_name, last_name, password, password_salt,
                                   date_joined, is_superuser, is_active)
            VALUES ($1, $2, $3, $4, $5, current_timestamp, $6, TRUE)
            ON CONFLICT (email) DO UPDATE
               SET first_name = EXCLUDED.first_name,
                   last_name = EXCLUDED.last_name,
                   password = EXCLUDED.password,
                   password_salt = EXCLUDED.password_salt,
                   is_superuser = EXCLUDED.is_superuser,
                   is_active = EXCLUDED.is_active
            "#,
        )
        .bind(user.email.as_str())
        .bind(user.first_name.as_str())
        .bind(user.last_name.as_str())
        .bind(user.password_hash.as_str())
        .bind(user.password_salt.as_str())
        .bind(user.is_superuser)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to upsert user '{}': {error}", user.email)))?;

        Ok(())
    }

    async fn add_group_memberships(&self, email: &str, group_names: &[String]) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO permissions_group_membership (user_id, group_id)
            SELECT core_user.id, permissions_group.id
            FROM core_user, permissions_group
            WHERE core_user.email = $1 AND permissions_group.name::TEXT = ANY($2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(email)
        .bind(group_names)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to add group memberships of '{email}': {error}"))
        })?;

        Ok(())
    }

    async fn list_databases(&self) -> AppResult<Vec<ExistingDatabase>> {
        let rows = sqlx::query_as::<_, DatabaseRow>(
            r#"
            SELECT id::BIGINT AS id, name::TEXT AS name
            FROM metabase_database
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list databases: {error}")))?;

        Ok(rows
            .into_iter()
            .map(|row| ExistingDatabase {
                id: row.id,
                name: row.name,
            })
            .collect())
    }

    async fn replace_databases(&self, databases: &[DatabaseRecord]) -> AppResult<()> {
        sqlx::query("TRUNCATE metabase_database CASCADE")
            .execute(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to truncate databases: {error}")))?;

        for database in databases {
            self.insert_database(database).await?;
        }

        Ok(())
    }

    async fn update_database(&self, id: i64, database: &DatabaseRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE metabase_database
            SET details = $1, engine = $2, name = $3, is_sample = false
            WHERE id = $4
            "#,
        )
        .bind(database.details.to_string())
        .bind(database.engine.as_str())
        .bind(database.name.as_str())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update database {id}: {error}")))?;

        Ok(())
    }

    async fn upsert_settings(&self, settings: &[(String, String)]) -> AppResult<()> {
        for (key, value) in settings {
            sqlx::query(
                r#"
                INSERT INTO setting (key, value)
                VALUES ($1, $2)
                ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value
                "#,
            )
            .bind(key.as_str())
            .bind(value.as_str())
            .execute(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to write setting '{key}': {error}")))?;
        }

        Ok(())
    }

    async fn delete_setup_token(&self) -> AppResult<()> {
        sqlx::query("DELETE FROM setting WHERE key = 'setup-token'")
            .execute(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to delete setup token: {error}")))?;

        Ok(())
    }
}
